//! # Compositing Module
//!
//! Per-pixel linear mixing of two frames under a [`BlendField`], plus the
//! helpers that derive factors and replacement sources for it.

use image::imageops;

use crate::error::{ensure_same_dims, CompositorError, Result};
use crate::frame::{BlendField, DistanceField, Frame, Mask};

/// `a * (1 - f) + b * f` per channel, rounded back to 8 bits
///
/// The output keeps `a`'s channel layout. Factor 0 reproduces `a` and factor 1
/// reproduces `b` exactly.
pub fn blend(a: &Frame, b: &Frame, factor: &BlendField) -> Result<Frame> {
    ensure_same_dims(a.dimensions(), b.dimensions())?;
    ensure_same_dims(a.dimensions(), factor.dimensions())?;

    let (w, h) = a.dimensions();
    Ok(Frame::from_fn(w, h, a.channels(), |x, y| {
        mix(a.pixel(x, y), b.pixel(x, y), factor.get(x, y))
    }))
}

/// [`blend`] with the same factor everywhere
pub fn blend_uniform(a: &Frame, b: &Frame, factor: f32) -> Result<Frame> {
    let (w, h) = a.dimensions();
    blend(a, b, &BlendField::uniform(w, h, factor))
}

fn mix(a: [u8; 4], b: [u8; 4], f: f32) -> [u8; 4] {
    if f <= 0.0 {
        return a;
    }
    if f >= 1.0 {
        return b;
    }
    let mut out = [0u8; 4];
    for c in 0..4 {
        let v = a[c] as f32 * (1.0 - f) + b[c] as f32 * f;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Soft transition ring around a seed region
///
/// Full effect (1) at `d <= inner`, fading linearly to none (0) at
/// `d >= outer`. An unbounded field (no seed at all) gives 0 everywhere.
pub fn ring_factor(distance: &DistanceField, inner: f32, outer: f32) -> Result<BlendField> {
    if !inner.is_finite() || !outer.is_finite() || inner < 0.0 || inner >= outer {
        return Err(CompositorError::invalid_value(
            "ring",
            format!("inner={} outer={}", inner, outer),
        ));
    }

    let (w, h) = distance.dimensions();
    if distance.is_unbounded() {
        return Ok(BlendField::uniform(w, h, 0.0));
    }

    let span = outer - inner;
    Ok(BlendField::from_grid(distance.grid().map(|d| (outer - d) / span)))
}

/// Heavily smoothed copy of a frame, used as a stand-in for clean background
pub fn gaussian_blur(frame: &Frame, radius: f32) -> Result<Frame> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(CompositorError::invalid_value("blur_radius", radius));
    }

    let blurred = imageops::blur(frame.as_image(), radius);
    let (w, h) = frame.dimensions();
    Frame::from_rgba_bytes(w, h, frame.channels(), blurred.into_raw())
}

/// Take the color channels from `source` wherever `mask` is set
///
/// Alpha and every pixel outside the mask are copied from `frame` untouched.
pub fn replace_masked(frame: &Frame, source: &Frame, mask: &Mask) -> Result<Frame> {
    ensure_same_dims(frame.dimensions(), source.dimensions())?;
    ensure_same_dims(frame.dimensions(), mask.dimensions())?;

    let (w, h) = frame.dimensions();
    Ok(Frame::from_fn(w, h, frame.channels(), |x, y| {
        let own = frame.pixel(x, y);
        if mask.get(x, y) {
            let src = source.pixel(x, y);
            [src[0], src[1], src[2], own[3]]
        } else {
            own
        }
    }))
}

/// Paint a solid color wherever `mask` is set, keeping alpha
pub fn fill_masked(frame: &Frame, color: [u8; 3], mask: &Mask) -> Result<Frame> {
    ensure_same_dims(frame.dimensions(), mask.dimensions())?;

    let (w, h) = frame.dimensions();
    Ok(Frame::from_fn(w, h, frame.channels(), |x, y| {
        let own = frame.pixel(x, y);
        if mask.get(x, y) {
            [color[0], color[1], color[2], own[3]]
        } else {
            own
        }
    }))
}

/// A frame of one solid color shaped like `like`, alpha copied per pixel
pub fn solid_like(like: &Frame, color: [u8; 3]) -> Frame {
    let (w, h) = like.dimensions();
    Frame::from_fn(w, h, like.channels(), |x, y| {
        [color[0], color[1], color[2], like.pixel(x, y)[3]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Channels;
    use crate::morphology::distance_transform;

    fn gradient(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, Channels::Rgba, |x, y| [x as u8 * 13, y as u8 * 29, 77, 200])
    }

    #[test]
    fn test_blend_endpoints_are_exact() {
        let a = gradient(9, 7);
        let b = Frame::from_fn(9, 7, Channels::Rgba, |x, y| [255 - x as u8, 3, y as u8 * 31, 255]);

        assert_eq!(blend_uniform(&a, &b, 0.0).unwrap(), a);
        assert_eq!(blend_uniform(&a, &b, 1.0).unwrap(), b);
    }

    #[test]
    fn test_blend_midpoint_rounds() {
        let a = Frame::new_filled(1, 1, [0, 10, 255]);
        let b = Frame::new_filled(1, 1, [255, 11, 0]);
        let mid = blend_uniform(&a, &b, 0.5).unwrap();
        assert_eq!(mid.rgb(0, 0), [128, 11, 128]);
    }

    #[test]
    fn test_blend_rejects_mismatched_inputs() {
        let a = gradient(4, 4);
        let b = gradient(4, 3);
        assert!(blend_uniform(&a, &b, 0.5).unwrap_err().is_defect());

        let field = BlendField::uniform(3, 3, 0.5);
        assert!(blend(&a, &a, &field).unwrap_err().is_defect());
    }

    #[test]
    fn test_ring_factor_profile() {
        let seed = Mask::from_fn(40, 1, |x, _| x == 0);
        let field = ring_factor(&distance_transform(&seed), 18.0, 25.0).unwrap();

        assert_eq!(field.get(0, 0), 1.0);
        assert_eq!(field.get(18, 0), 1.0);
        assert!((field.get(20, 0) - 5.0 / 7.0).abs() < 1e-6);
        assert_eq!(field.get(25, 0), 0.0);
        assert_eq!(field.get(39, 0), 0.0);
    }

    #[test]
    fn test_blend_with_unbounded_distance_is_noop() {
        let a = gradient(6, 5);
        let b = Frame::new_filled(6, 5, [255, 255, 255]);
        let field = ring_factor(&distance_transform(&Mask::empty(6, 5)), 2.0, 4.0).unwrap();

        assert!(field.is_zero());
        assert_eq!(blend(&a, &b, &field).unwrap(), a);
    }

    #[test]
    fn test_ring_factor_rejects_bad_radii() {
        let field = distance_transform(&Mask::full(2, 2));
        assert!(ring_factor(&field, 5.0, 5.0).is_err());
        assert!(ring_factor(&field, -1.0, 5.0).is_err());
    }

    #[test]
    fn test_blur_keeps_uniform_frames() {
        let frame = Frame::new_filled(12, 9, [40, 120, 200]);
        let blurred = gaussian_blur(&frame, 3.0).unwrap();
        assert_eq!(blurred.dimensions(), frame.dimensions());
        for (x, y) in [(0, 0), (6, 4), (11, 8)] {
            let px = blurred.rgb(x, y);
            for c in 0..3 {
                assert!((px[c] as i32 - frame.rgb(x, y)[c] as i32).abs() <= 1);
            }
        }
        assert!(gaussian_blur(&frame, 0.0).is_err());
    }

    #[test]
    fn test_replace_masked_touches_only_mask() {
        let frame = gradient(5, 5);
        let source = Frame::new_filled(5, 5, [1, 2, 3]);
        let mask = Mask::from_fn(5, 5, |x, y| x == 2 && y == 2);

        let out = replace_masked(&frame, &source, &mask).unwrap();
        assert_eq!(out.pixel(2, 2), [1, 2, 3, 200]);
        for y in 0..5 {
            for x in 0..5 {
                if (x, y) != (2, 2) {
                    assert_eq!(out.pixel(x, y), frame.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_fill_masked() {
        let frame = gradient(3, 3);
        let out = fill_masked(&frame, [255, 255, 255], &Mask::from_fn(3, 3, |x, _| x == 0)).unwrap();
        assert_eq!(out.pixel(0, 1), [255, 255, 255, 200]);
        assert_eq!(out.pixel(1, 1), frame.pixel(1, 1));
    }
}
