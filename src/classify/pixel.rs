use crate::classify::sample::ColorSample;

/// Per-pixel measurements shared by every color rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    /// Channels on the 0..=255 scale
    pub rgb: [f32; 3],
    /// `(max - min) / max` over normalized channels, 0 for black
    pub saturation: f32,
    /// Largest normalized channel
    pub value: f32,
    /// Mean of the three channels, 0..=255
    pub brightness: f32,
    /// Euclidean RGB distance to the reference sample
    pub distance: f32,
}

impl PixelStats {
    pub fn measure(rgb: [f32; 3], reference: &ColorSample) -> Self {
        let (saturation, value) = saturation_value(rgb);
        Self {
            rgb,
            saturation,
            value,
            brightness: (rgb[0] + rgb[1] + rgb[2]) / 3.0,
            distance: reference.distance(rgb),
        }
    }
}

/// HSV saturation and value of an RGB triple on the 0..=255 scale
pub fn saturation_value(rgb: [f32; 3]) -> (f32, f32) {
    let r = rgb[0] / 255.0;
    let g = rgb[1] / 255.0;
    let b = rgb[2] / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    let saturation = if max > 0.0 { (max - min) / max } else { 0.0 };
    (saturation, max)
}

/// Rec. 601 luma, 0..=255
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}
