use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, Result};
use crate::frame::{Frame, Mask, PixelRect};

/// A single reference color, usually the mean of a set of sampled pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorSample {
    pub rgb: [f32; 3],
}

impl Default for ColorSample {
    fn default() -> Self {
        Self::BLACK
    }
}

impl ColorSample {
    pub const BLACK: ColorSample = ColorSample { rgb: [0.0, 0.0, 0.0] };

    pub fn new(rgb: [f32; 3]) -> Self {
        Self { rgb }
    }

    /// Mean color of square patches taken from the given corners
    ///
    /// Patch edges are clipped to the frame. Overlapping patches count
    /// their shared pixels once per patch.
    pub fn from_corners(frame: &Frame, size: u32, corners: &[Corner]) -> Result<Self> {
        let (w, h) = frame.dimensions();
        let pw = size.min(w);
        let ph = size.min(h);
        if pw == 0 || ph == 0 || corners.is_empty() {
            return Err(CompositorError::invalid_value(
                "reference.corners",
                format!("size {} with {} corners on a {}x{} frame", size, corners.len(), w, h),
            ));
        }

        let mut acc = MeanAccumulator::default();
        for corner in corners {
            let rect = corner.patch(w, h, pw, ph);
            for y in rect.y..rect.y + rect.height {
                for x in rect.x..rect.x + rect.width {
                    acc.add(frame.rgb_f32(x, y));
                }
            }
        }

        acc.mean().ok_or_else(|| CompositorError::generic("corner sample is empty"))
    }

    /// Mean color of the pixels under `mask`; `None` when the mask is clear
    pub fn mean_over(frame: &Frame, mask: &Mask) -> Result<Option<Self>> {
        crate::error::ensure_same_dims(frame.dimensions(), mask.dimensions())?;

        let mut acc = MeanAccumulator::default();
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if mask.get(x, y) {
                    acc.add(frame.rgb_f32(x, y));
                }
            }
        }
        Ok(acc.mean())
    }

    /// Euclidean RGB distance
    pub fn distance(&self, rgb: [f32; 3]) -> f32 {
        let dr = rgb[0] - self.rgb[0];
        let dg = rgb[1] - self.rgb[1];
        let db = rgb[2] - self.rgb[2];
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Mean of the three channels
    pub fn brightness(&self) -> f32 {
        (self.rgb[0] + self.rgb[1] + self.rgb[2]) / 3.0
    }
}

#[derive(Default)]
struct MeanAccumulator {
    sum: [f64; 3],
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, rgb: [f32; 3]) {
        for (s, c) in self.sum.iter_mut().zip(rgb) {
            *s += c as f64;
        }
        self.count += 1;
    }

    fn mean(&self) -> Option<ColorSample> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(ColorSample::new([
            (self.sum[0] / n) as f32,
            (self.sum[1] / n) as f32,
            (self.sum[2] / n) as f32,
        ]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn patch(self, w: u32, h: u32, pw: u32, ph: u32) -> PixelRect {
        let x = match self {
            Corner::TopLeft | Corner::BottomLeft => 0,
            Corner::TopRight | Corner::BottomRight => w - pw,
        };
        let y = match self {
            Corner::TopLeft | Corner::TopRight => 0,
            Corner::BottomLeft | Corner::BottomRight => h - ph,
        };
        PixelRect { x, y, width: pw, height: ph }
    }
}

/// Where a rule set gets its reference color from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ReferenceSpec {
    /// Mean of corner patches of the frame being classified
    Corners { size: u32, corners: Vec<Corner> },
    /// A fixed color
    Fixed { rgb: [f32; 3] },
}

impl Default for ReferenceSpec {
    fn default() -> Self {
        ReferenceSpec::Fixed { rgb: [0.0, 0.0, 0.0] }
    }
}

impl ReferenceSpec {
    pub fn sample(&self, frame: &Frame) -> Result<ColorSample> {
        match self {
            ReferenceSpec::Corners { size, corners } => ColorSample::from_corners(frame, *size, corners),
            ReferenceSpec::Fixed { rgb } => Ok(ColorSample::new(*rgb)),
        }
    }

    pub(crate) fn validate(&self, key: &str) -> Result<()> {
        match self {
            ReferenceSpec::Corners { size, corners } => {
                if *size == 0 || corners.is_empty() {
                    return Err(CompositorError::invalid_value(
                        format!("{}.reference", key),
                        format!("size={} corners={}", size, corners.len()),
                    ));
                }
            }
            ReferenceSpec::Fixed { rgb } => {
                if rgb.iter().any(|c| !c.is_finite() || !(0.0..=255.0).contains(c)) {
                    return Err(CompositorError::invalid_value(
                        format!("{}.reference.rgb", key),
                        format!("{:?}", rgb),
                    ));
                }
            }
        }
        Ok(())
    }
}
