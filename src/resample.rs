//! # Temporal Resampling
//!
//! Retimes `S` source frames into `T` output frames. Output frame `t` sits at
//! source position `p = t * (S - 1) / (T - 1)`; positions close enough to a
//! whole frame (or past the last one) reuse that frame verbatim, everything
//! else is a linear cross-fade of the two neighbouring frames.

use tracing::debug;

use crate::composite::blend_uniform;
use crate::error::{CompositorError, Result};
use crate::frame::Frame;

/// Fractions below this reuse the lower source frame unchanged
pub const DEFAULT_BLEND_EPSILON: f64 = 0.01;

/// How one output frame is produced; indices are 0-based into the source slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResampleStep {
    Exact(usize),
    Blend { lower: usize, frac: f64 },
}

/// Continuous source position of output frame `t`
///
/// `position(0) == 0` and `position(T - 1) == S - 1` exactly; a single output
/// frame sits at position 0.
pub fn source_position(t: usize, source_len: usize, target_len: usize) -> f64 {
    if target_len <= 1 || source_len <= 1 {
        return 0.0;
    }
    (t * (source_len - 1)) as f64 / (target_len - 1) as f64
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalResampler {
    epsilon: f64,
}

impl Default for TemporalResampler {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_BLEND_EPSILON,
        }
    }
}

impl TemporalResampler {
    pub fn new(epsilon: f64) -> Result<Self> {
        if !epsilon.is_finite() || !(0.0..0.5).contains(&epsilon) {
            return Err(CompositorError::invalid_value("pipeline.blend_epsilon", epsilon));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Decide, without touching pixels, how every output frame is made
    pub fn plan(&self, source_len: usize, target_len: usize) -> Result<Vec<ResampleStep>> {
        if source_len == 0 {
            return Err(CompositorError::invalid_value("resample.source_len", source_len));
        }
        if target_len == 0 {
            return Err(CompositorError::invalid_value("resample.target_len", target_len));
        }

        let last = source_len - 1;
        let steps = (0..target_len)
            .map(|t| {
                let position = source_position(t, source_len, target_len);
                let lower = position.floor() as usize;
                let frac = position - lower as f64;

                if frac < self.epsilon || lower >= last {
                    ResampleStep::Exact(lower.min(last))
                } else {
                    ResampleStep::Blend { lower, frac }
                }
            })
            .collect();
        Ok(steps)
    }

    /// Produce exactly `target_len` frames from `frames`
    pub fn resample(&self, frames: &[Frame], target_len: usize) -> Result<Vec<Frame>> {
        let plan = self.plan(frames.len(), target_len)?;
        debug!(
            "Resampling {} source frames to {} ({} blended)",
            frames.len(),
            target_len,
            plan.iter().filter(|s| matches!(s, ResampleStep::Blend { .. })).count()
        );

        plan.into_iter()
            .map(|step| match step {
                ResampleStep::Exact(i) => Ok(frames[i].clone()),
                ResampleStep::Blend { lower, frac } => {
                    blend_uniform(&frames[lower], &frames[lower + 1], frac as f32)
                }
            })
            .collect()
    }
}
