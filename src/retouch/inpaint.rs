//! Blur-based artifact removal.
//!
//! A detected artifact is erased by swapping in a heavily blurred copy of the
//! whole frame, which approximates the clean background under small features.
//! The mask is grown a little first so the anti-aliased fringe the detector
//! misses is covered too. Pixels outside the grown mask are copied verbatim.

use tracing::debug;

use crate::composite::{gaussian_blur, replace_masked};
use crate::error::{ensure_same_dims, CompositorError, Result};
use crate::frame::{Frame, Mask};
use crate::morphology::dilate_iterations;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InpaintEngine {
    blur_radius: f32,
    dilation_iterations: u32,
}

impl InpaintEngine {
    pub fn new(blur_radius: f32, dilation_iterations: u32) -> Result<Self> {
        if !blur_radius.is_finite() || blur_radius <= 0.0 {
            return Err(CompositorError::invalid_value("blur_radius", blur_radius));
        }
        Ok(Self {
            blur_radius,
            dilation_iterations,
        })
    }

    pub fn blur_radius(&self) -> f32 {
        self.blur_radius
    }

    pub fn dilation_iterations(&self) -> u32 {
        self.dilation_iterations
    }

    /// The mask that will actually be painted: grown, then optionally clipped
    pub fn patch_mask(&self, artifact: &Mask, clip: Option<&Mask>) -> Result<Mask> {
        let grown = dilate_iterations(artifact, self.dilation_iterations);
        match clip {
            Some(clip) => grown.intersect(clip),
            None => Ok(grown),
        }
    }

    pub fn inpaint(&self, frame: &Frame, artifact: &Mask) -> Result<Frame> {
        self.inpaint_clipped(frame, artifact, None)
    }

    /// Inpaint, never painting outside `clip` when one is given
    pub fn inpaint_clipped(&self, frame: &Frame, artifact: &Mask, clip: Option<&Mask>) -> Result<Frame> {
        ensure_same_dims(frame.dimensions(), artifact.dimensions())?;

        let patch = self.patch_mask(artifact, clip)?;
        if patch.is_clear() {
            return Ok(frame.clone());
        }

        debug!(
            "Inpainting {} pixels ({} detected) with blur radius {}",
            patch.count(),
            artifact.count(),
            self.blur_radius
        );
        let proxy = gaussian_blur(frame, self.blur_radius)?;
        replace_masked(frame, &proxy, &patch)
    }
}

/// One-shot form of [`InpaintEngine::inpaint`]
pub fn inpaint(frame: &Frame, artifact: &Mask, blur_radius: f32, dilation_iterations: u32) -> Result<Frame> {
    InpaintEngine::new(blur_radius, dilation_iterations)?.inpaint(frame, artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Channels;

    fn speckled() -> (Frame, Mask) {
        let frame = Frame::from_fn(24, 24, Channels::Rgb, |x, y| {
            if (10..12).contains(&x) && (10..12).contains(&y) {
                [255, 255, 255, 255]
            } else {
                [180, 30, 40, 255]
            }
        });
        let mask = Mask::from_fn(24, 24, |x, y| (10..12).contains(&x) && (10..12).contains(&y));
        (frame, mask)
    }

    #[test]
    fn test_pixels_outside_grown_mask_are_untouched() {
        let (frame, mask) = speckled();
        let engine = InpaintEngine::new(4.0, 2).unwrap();
        let out = engine.inpaint(&frame, &mask).unwrap();
        let patch = engine.patch_mask(&mask, None).unwrap();

        for y in 0..24 {
            for x in 0..24 {
                if !patch.get(x, y) {
                    assert_eq!(out.pixel(x, y), frame.pixel(x, y), "({}, {})", x, y);
                }
            }
        }
        // The white speck is pulled toward the surrounding red
        assert!(out.rgb(10, 10)[1] < 150);
    }

    #[test]
    fn test_clip_limits_painting() {
        let (frame, mask) = speckled();
        let clip = Mask::from_fn(24, 24, |x, _| x < 11);
        let engine = InpaintEngine::new(4.0, 3).unwrap();

        let out = engine.inpaint_clipped(&frame, &mask, Some(&clip)).unwrap();
        assert_eq!(out.pixel(11, 11), frame.pixel(11, 11));
        assert_ne!(out.pixel(10, 10), frame.pixel(10, 10));
    }

    #[test]
    fn test_empty_mask_is_passthrough() {
        let (frame, _) = speckled();
        let out = inpaint(&frame, &Mask::empty(24, 24), 8.0, 2).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_invalid_blur_radius() {
        assert!(InpaintEngine::new(-8.0, 2).is_err());
        assert!(InpaintEngine::new(f32::NAN, 2).is_err());
    }

    #[test]
    fn test_mask_size_must_match() {
        let (frame, _) = speckled();
        let err = inpaint(&frame, &Mask::full(4, 4), 8.0, 1).unwrap_err();
        assert!(err.is_defect());
    }
}
