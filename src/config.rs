use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    frame::FrameNaming,
    pipeline::{PassSchedule, Segment, SegmentPlan},
    resample::DEFAULT_BLEND_EPSILON,
    retouch::{builtin_specs, RetouchSpec},
};

/// Main configuration for the Loop-Compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where frames are read from and written to
    pub io: IoConfig,

    /// Execution settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Output segments, in order
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Named retouches available to processed passes
    #[serde(default)]
    pub retouch: BTreeMap<String, RetouchSpec>,
}

impl Default for Config {
    /// The envelope loop: hold, slowed opening, hold on the open state
    fn default() -> Self {
        Self {
            io: IoConfig::default(),
            pipeline: PipelineConfig::default(),
            segments: vec![
                Segment::static_hold(30, 24),
                Segment::resampled_motion(43, 72, 72),
                Segment::static_hold(72, 18),
            ],
            retouch: builtin_specs(),
        }
    }
}

impl Config {
    /// Frame cleanup preset: remove the cursor early on and the paper text later
    pub fn cleanup() -> Self {
        Self {
            io: IoConfig {
                output_dir: PathBuf::from("cleaned"),
                ..IoConfig::default()
            },
            segments: vec![Segment::processed_pass(
                1,
                105,
                vec![
                    PassSchedule::new("cursor", 1, 20),
                    PassSchedule::new("paper_text", 60, 105),
                ],
            )],
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_toml(path.as_ref())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        parse_toml(content, "<inline>")
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.io.validate()?;
        self.pipeline.validate()?;

        let plan = SegmentPlan::new(self.segments.clone())?;
        validate_retouches(&self.retouch)?;
        for name in plan.retouch_names() {
            if !self.retouch.contains_key(name) {
                return Err(ConfigError::UnknownRetouch { name: name.to_string() }.into());
            }
        }

        Ok(())
    }
}

/// Just the `[retouch.*]` tables of a configuration file
///
/// Used where only retouches are needed, such as recoloring a single image;
/// any other sections in the file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetouchConfig {
    #[serde(default)]
    pub retouch: BTreeMap<String, RetouchSpec>,
}

impl RetouchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_toml(path.as_ref())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        parse_toml(content, "<inline>")
    }

    pub fn validate(&self) -> Result<()> {
        validate_retouches(&self.retouch)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;
    parse_toml(&content, &path.display().to_string())
}

fn parse_toml<T: DeserializeOwned>(content: &str, path: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| {
        ConfigError::ParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn validate_retouches(retouches: &BTreeMap<String, RetouchSpec>) -> Result<()> {
    for (name, spec) in retouches {
        spec.validate(&format!("retouch.{}", name))?;
    }
    Ok(())
}

/// Frame directories and file naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Directory holding the numbered source frames
    pub input_dir: PathBuf,

    /// Directory for the output frames; cleared before every run
    pub output_dir: PathBuf,

    /// File name prefix before the index
    #[serde(default = "IoConfig::default_prefix")]
    pub prefix: String,

    /// File extension, which also selects the image format
    #[serde(default = "IoConfig::default_extension")]
    pub extension: String,

    /// Zero-padded width of the index
    #[serde(default = "IoConfig::default_index_width")]
    pub index_width: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("processing"),
            output_dir: PathBuf::from("final_frames"),
            prefix: Self::default_prefix(),
            extension: Self::default_extension(),
            index_width: Self::default_index_width(),
        }
    }
}

impl IoConfig {
    fn default_prefix() -> String {
        FrameNaming::default().prefix
    }

    fn default_extension() -> String {
        FrameNaming::default().extension
    }

    fn default_index_width() -> usize {
        FrameNaming::default().index_width
    }

    pub fn naming(&self) -> FrameNaming {
        FrameNaming {
            prefix: self.prefix.clone(),
            extension: self.extension.clone(),
            index_width: self.index_width,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.index_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "io.index_width".to_string(),
                value: self.index_width.to_string(),
            }
            .into());
        }

        if self.extension.is_empty() || self.extension.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "io.extension".to_string(),
                value: self.extension.clone(),
            }
            .into());
        }

        // The output directory is wiped at the start of a run
        if self.input_dir == self.output_dir || self.input_dir.starts_with(&self.output_dir) {
            return Err(ConfigError::InvalidValue {
                key: "io.output_dir".to_string(),
                value: format!("{} (would delete the input frames)", self.output_dir.display()),
            }
            .into());
        }

        Ok(())
    }

    /// Fail when the output directory, as the filesystem resolves it, is the
    /// input directory or one of its parents
    ///
    /// Catches aliases that [`Config::validate`] cannot see from the text
    /// alone: `..` segments, `./`, relative against absolute, symlinks.
    /// The input directory must exist.
    pub fn check_output_location(&self) -> Result<()> {
        let input = self.input_dir.canonicalize()?;
        let output = resolve_path(&self.output_dir)?;

        if input.starts_with(&output) {
            return Err(ConfigError::InvalidValue {
                key: "io.output_dir".to_string(),
                value: format!(
                    "{} resolves to {} (would delete the input frames)",
                    self.output_dir.display(),
                    output.display()
                ),
            }
            .into());
        }
        Ok(())
    }
}

/// Resolve a path that may not exist yet: canonicalize its nearest existing
/// ancestor, then apply the remaining components lexically
fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    for ancestor in absolute.ancestors() {
        if !ancestor.exists() {
            continue;
        }
        let mut resolved = ancestor.canonicalize()?;
        let rest = absolute
            .strip_prefix(ancestor)
            .map_err(|e| crate::error::CompositorError::generic(e.to_string()))?;
        for component in rest.components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(part) => resolved.push(part),
                _ => {}
            }
        }
        return Ok(resolved);
    }

    Ok(absolute)
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for processed passes
    #[serde(default = "PipelineConfig::default_workers")]
    pub workers: usize,

    /// Resampling fractions below this reuse the earlier frame unblended
    #[serde(default = "PipelineConfig::default_blend_epsilon")]
    pub blend_epsilon: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            blend_epsilon: Self::default_blend_epsilon(),
        }
    }
}

impl PipelineConfig {
    fn default_workers() -> usize {
        num_cpus::get()
    }

    fn default_blend_epsilon() -> f64 {
        DEFAULT_BLEND_EPSILON
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.workers".to_string(),
                value: self.workers.to_string(),
            }
            .into());
        }

        if !self.blend_epsilon.is_finite() || !(0.0..0.5).contains(&self.blend_epsilon) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.blend_epsilon".to_string(),
                value: self.blend_epsilon.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
