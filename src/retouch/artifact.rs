use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{ColorClassifier, ColorRule, ReferenceSpec, RuleSet};
use crate::error::{CompositorError, Result};
use crate::frame::{Frame, Mask, RegionSpec};
use crate::retouch::inpaint::InpaintEngine;
use crate::retouch::traits::{Retouch, RetouchOutcome, SizeGate};

/// Thresholds for removing a small, high-contrast artifact such as a cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    #[serde(default = "ArtifactSpec::default_region")]
    pub region: RegionSpec,
    #[serde(default)]
    pub reference: ReferenceSpec,
    #[serde(default = "ArtifactSpec::default_detect")]
    pub detect: RuleSet,
    #[serde(default = "ArtifactSpec::default_gate")]
    pub gate: SizeGate,
    #[serde(default = "ArtifactSpec::default_blur_radius")]
    pub blur_radius: f32,
    #[serde(default = "ArtifactSpec::default_dilation_iterations")]
    pub dilation_iterations: u32,
}

impl Default for ArtifactSpec {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            reference: ReferenceSpec::default(),
            detect: Self::default_detect(),
            gate: Self::default_gate(),
            blur_radius: Self::default_blur_radius(),
            dilation_iterations: Self::default_dilation_iterations(),
        }
    }
}

impl ArtifactSpec {
    /// Middle third vertically, middle half horizontally
    fn default_region() -> RegionSpec {
        RegionSpec {
            top: 1.0 / 3.0,
            bottom: 2.0 / 3.0,
            left: 0.25,
            right: 0.75,
            ..RegionSpec::FULL
        }
    }

    /// Bright body or dark border of a mouse pointer
    fn default_detect() -> RuleSet {
        RuleSet::new(vec![
            ColorRule::channels_above([200.0, 200.0, 200.0]),
            ColorRule::channels_below([80.0, 60.0, 60.0]),
        ])
    }

    fn default_gate() -> SizeGate {
        SizeGate::new(5, Some(800))
    }

    fn default_blur_radius() -> f32 {
        8.0
    }

    fn default_dilation_iterations() -> u32 {
        2
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        self.region.validate(key)?;
        self.reference.validate(key)?;
        self.detect.validate(&format!("{}.detect", key))?;
        self.gate.validate(key)?;
        if !self.blur_radius.is_finite() || self.blur_radius <= 0.0 {
            return Err(CompositorError::invalid_value(format!("{}.blur_radius", key), self.blur_radius));
        }
        Ok(())
    }
}

/// Detects an artifact inside a region and blurs it away when its size is plausible
pub struct ArtifactRetouch {
    name: String,
    description: String,
    spec: ArtifactSpec,
    classifier: ColorClassifier,
    engine: InpaintEngine,
}

impl ArtifactRetouch {
    pub fn new(name: impl Into<String>, spec: ArtifactSpec) -> Result<Self> {
        let name = name.into();
        spec.validate(&format!("retouch.{}", name))?;

        let classifier = ColorClassifier::new(spec.detect.clone())?.within(spec.region)?;
        let engine = InpaintEngine::new(spec.blur_radius, spec.dilation_iterations)?;
        let description = format!(
            "blur out artifacts of {}..{} pixels",
            spec.gate.min,
            spec.gate.max.map_or_else(|| "any".to_string(), |m| m.to_string())
        );

        Ok(Self {
            name,
            description,
            spec,
            classifier,
            engine,
        })
    }

    pub fn spec(&self) -> &ArtifactSpec {
        &self.spec
    }

    /// Raw detection before dilation or gating
    pub fn detect(&self, frame: &Frame) -> Result<Mask> {
        let reference = self.spec.reference.sample(frame)?;
        Ok(self.classifier.classify(frame, &reference))
    }
}

impl Retouch for ArtifactRetouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, frame: &Frame) -> Result<RetouchOutcome> {
        let artifact = self.detect(frame)?;
        let count = artifact.count();

        if let Err(reason) = self.spec.gate.check(count) {
            debug!("{}: skipped ({})", self.name, reason);
            return Ok(RetouchOutcome::Skipped { reason });
        }

        let frame = self.engine.inpaint(frame, &artifact)?;
        Ok(RetouchOutcome::Applied { frame, pixels: count })
    }
}
