use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, Result};
use crate::frame::Frame;

/// A per-frame cleanup or recolor rule applied during a processed pass
///
/// Implementations must be pure: the input frame is never modified and the
/// same frame always yields the same outcome, so frames can be processed in
/// any order on any thread.
pub trait Retouch: Send + Sync {
    /// Returns the unique name of this retouch
    fn name(&self) -> &str;

    /// Returns a human-readable description of this retouch
    fn description(&self) -> &str;

    /// Run detection and, if it passes its guards, produce a new frame
    fn apply(&self, frame: &Frame) -> Result<RetouchOutcome>;
}

/// Result of running a retouch over one frame
#[derive(Debug, Clone)]
pub enum RetouchOutcome {
    Applied { frame: Frame, pixels: usize },
    Skipped { reason: SkipReason },
}

impl RetouchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RetouchOutcome::Applied { .. })
    }

    /// The retouched frame, or `original` when the retouch was skipped
    pub fn into_frame(self, original: Frame) -> Frame {
        match self {
            RetouchOutcome::Applied { frame, .. } => frame,
            RetouchOutcome::Skipped { .. } => original,
        }
    }
}

/// Why a retouch left a frame alone. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Too few pixels detected to be the artifact; treated as noise
    BelowGate { count: usize, min: usize },
    /// Too many pixels detected; most likely real content was misclassified
    AboveGate { count: usize, max: usize },
    /// The surface the artifact should sit on was not found
    NoSurface { count: usize, min: usize },
    /// The configured region is empty at this frame size
    EmptyRegion,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BelowGate { count, min } => write!(f, "{} pixels detected, need more than {}", count, min),
            SkipReason::AboveGate { count, max } => write!(f, "{} pixels detected, need fewer than {}", count, max),
            SkipReason::NoSurface { count, min } => write!(f, "surface has {} pixels, need more than {}", count, min),
            SkipReason::EmptyRegion => write!(f, "region is empty"),
        }
    }
}

/// Plausible size band for a detected artifact, exclusive at both ends
///
/// This is a safety valve: a detection outside the band is skipped instead of
/// being painted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeGate {
    pub min: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl SizeGate {
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub fn check(&self, count: usize) -> std::result::Result<(), SkipReason> {
        if count <= self.min {
            return Err(SkipReason::BelowGate { count, min: self.min });
        }
        if let Some(max) = self.max {
            if count >= max {
                return Err(SkipReason::AboveGate { count, max });
            }
        }
        Ok(())
    }

    pub fn admits(&self, count: usize) -> bool {
        self.check(count).is_ok()
    }

    pub(crate) fn validate(&self, key: &str) -> Result<()> {
        if let Some(max) = self.max {
            if max <= self.min + 1 {
                return Err(CompositorError::invalid_value(
                    format!("{}.gate", key),
                    format!("min={} max={}", self.min, max),
                ));
            }
        }
        Ok(())
    }
}
