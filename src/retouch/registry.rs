use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::retouch::artifact::{ArtifactRetouch, ArtifactSpec};
use crate::retouch::recolor::{RecolorRetouch, RecolorSpec};
use crate::retouch::surface::{SurfaceCleanup, SurfaceSpec};
use crate::retouch::traits::Retouch;

/// Configuration for one named retouch, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetouchSpec {
    Artifact(ArtifactSpec),
    SurfaceCleanup(SurfaceSpec),
    Recolor(RecolorSpec),
}

impl RetouchSpec {
    pub fn build(&self, name: &str) -> Result<Box<dyn Retouch>> {
        Ok(match self {
            RetouchSpec::Artifact(spec) => Box::new(ArtifactRetouch::new(name, spec.clone())?),
            RetouchSpec::SurfaceCleanup(spec) => Box::new(SurfaceCleanup::new(name, spec.clone())?),
            RetouchSpec::Recolor(spec) => Box::new(RecolorRetouch::new(name, spec.clone())?),
        })
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        match self {
            RetouchSpec::Artifact(spec) => spec.validate(key),
            RetouchSpec::SurfaceCleanup(spec) => spec.validate(key),
            RetouchSpec::Recolor(spec) => spec.validate(key),
        }
    }
}

/// The presets tuned for the original footage: cursor, paper text, title
pub fn builtin_specs() -> BTreeMap<String, RetouchSpec> {
    let mut specs = BTreeMap::new();
    specs.insert("cursor".to_string(), RetouchSpec::Artifact(ArtifactSpec::default()));
    specs.insert(
        "paper_text".to_string(),
        RetouchSpec::SurfaceCleanup(SurfaceSpec::default()),
    );
    specs.insert("title".to_string(), RetouchSpec::Recolor(RecolorSpec::default()));
    specs
}

/// Registry of ready-to-run retouches, looked up by name
///
/// Retouches are stateless, so one instance is shared by every worker thread.
pub struct RetouchRegistry {
    retouches: HashMap<String, Box<dyn Retouch>>,
}

impl RetouchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            retouches: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in presets
    pub fn with_builtins() -> Result<Self> {
        Self::from_specs(&builtin_specs())
    }

    /// Build every configured retouch, failing on the first invalid one
    pub fn from_specs(specs: &BTreeMap<String, RetouchSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, spec) in specs {
            registry.register(spec.build(name)?);
        }
        Ok(registry)
    }

    /// Register a retouch under its own name, replacing any previous one
    pub fn register(&mut self, retouch: Box<dyn Retouch>) {
        self.retouches.insert(retouch.name().to_string(), retouch);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Retouch> {
        self.retouches.get(name).map(|r| r.as_ref())
    }

    /// Like [`get`](Self::get), but an unknown name is a configuration error
    pub fn require(&self, name: &str) -> Result<&dyn Retouch> {
        self.get(name).ok_or_else(|| {
            ConfigError::UnknownRetouch {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Registered names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.retouches.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.retouches.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.retouches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retouches.is_empty()
    }
}

impl Default for RetouchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
