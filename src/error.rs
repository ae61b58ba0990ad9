use thiserror::Error;

/// Main error type for the Loop-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing resource: {0}")]
    Resource(#[from] ResourceError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Configuration-specific errors
///
/// Raised before any frame is touched; a run never starts with a bad config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path} ({reason})")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Unknown retouch referenced: {name}")]
    UnknownRetouch { name: String },
}

/// Errors for frames that a run references but cannot obtain
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Source frame {index} not found at {path}")]
    MissingFrame { index: usize, path: String },

    #[error("Source frame {index} is outside the sequence (1..={len})")]
    SourceOutOfRange { index: usize, len: usize },
}

/// Grid/frame shape errors. These always indicate a defect in the caller.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Dimension mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Invalid frame buffer: {details}")]
    InvalidBuffer { details: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Shorthand for an [`ConfigError::InvalidValue`] wrapped in the top-level error
    pub fn invalid_value<K: Into<String>, V: ToString>(key: K, value: V) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            value: value.to_string(),
        }
        .into()
    }

    /// Whether this error signals a programming defect rather than bad input
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Frame(FrameError::DimensionMismatch { .. }))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Resource(ResourceError::MissingFrame { index, path }) => {
                format!("Source frame {} could not be found at '{}'. Check the input directory and naming settings.", index, path)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Config(ConfigError::UnknownRetouch { name }) => {
                format!("Retouch '{}' is referenced by a segment but not defined under [retouch].", name)
            }
            _ => self.to_string(),
        }
    }
}

/// Fail with a dimension mismatch unless both shapes agree
pub(crate) fn ensure_same_dims(expected: (u32, u32), found: (u32, u32)) -> Result<()> {
    if expected != found {
        return Err(FrameError::DimensionMismatch { expected, found }.into());
    }
    Ok(())
}
