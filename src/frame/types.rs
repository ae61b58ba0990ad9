use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Channel layout a frame was decoded with and will be encoded back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Rgb,
    Rgba,
}

/// A single decoded raster frame
///
/// Pixels are always held as RGBA8 internally; frames that arrived as RGB
/// carry an opaque alpha and are written back without it. Frames are treated
/// as immutable values: every transformation in this crate returns a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbaImage,
    channels: Channels,
}

impl Frame {
    /// Create a new frame from an RGBA image buffer
    pub fn new(buffer: RgbaImage) -> Self {
        Self {
            buffer,
            channels: Channels::Rgba,
        }
    }

    /// Wrap a decoded image, remembering whether it carried alpha
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let channels = if image.color().has_alpha() {
            Channels::Rgba
        } else {
            Channels::Rgb
        };
        Self {
            buffer: image.to_rgba8(),
            channels,
        }
    }

    /// Create a new RGB frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]));
        Self {
            buffer,
            channels: Channels::Rgb,
        }
    }

    /// Build a frame pixel by pixel
    pub fn from_fn<F>(width: u32, height: u32, channels: Channels, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| Rgba(f(x, y)));
        Self { buffer, channels }
    }

    /// Create a frame from raw RGBA bytes
    pub fn from_rgba_bytes(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Result<Self> {
        let buffer = ImageBuffer::from_raw(width, height, data).ok_or_else(|| FrameError::InvalidBuffer {
            details: format!("expected {} bytes for {}x{} RGBA", width as usize * height as usize * 4, width, height),
        })?;
        Ok(Self { buffer, channels })
    }

    /// Load a frame from an image file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path.as_ref())?;
        Ok(Self::from_dynamic(image))
    }

    /// Save the frame; the format follows the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_dynamic().save(path.as_ref())?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Get a pixel at the given coordinates (RGBA)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    /// Get the color channels of a pixel
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let p = self.buffer.get_pixel(x, y).0;
        [p[0], p[1], p[2]]
    }

    /// Color channels promoted to floating point, still on the 0..=255 scale
    pub fn rgb_f32(&self, x: u32, y: u32) -> [f32; 3] {
        let p = self.buffer.get_pixel(x, y).0;
        [p[0] as f32, p[1] as f32, p[2] as f32]
    }

    /// Copy out a rectangular patch
    pub fn crop(&self, rect: PixelRect) -> Frame {
        Frame::from_fn(rect.width, rect.height, self.channels, |x, y| {
            self.pixel(rect.x + x, rect.y + y)
        })
    }

    /// Return a copy of this frame with `patch` written at `origin`
    ///
    /// Parts of the patch that fall outside this frame are dropped.
    pub fn paste(&self, patch: &Frame, origin: (u32, u32)) -> Frame {
        let mut buffer = self.buffer.clone();
        for y in 0..patch.height() {
            for x in 0..patch.width() {
                let (tx, ty) = (origin.0 + x, origin.1 + y);
                if tx < self.width() && ty < self.height() {
                    buffer.put_pixel(tx, ty, Rgba(patch.pixel(x, y)));
                }
            }
        }
        Frame {
            buffer,
            channels: self.channels,
        }
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Convert to an image in the frame's original channel layout
    pub fn to_dynamic(&self) -> DynamicImage {
        let image = DynamicImage::ImageRgba8(self.buffer.clone());
        match self.channels {
            Channels::Rgba => image,
            Channels::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
        }
    }
}

/// A resolved pixel rectangle; `x + width` and `y + height` are exclusive ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A sub-region of a frame expressed relative to the frame size
///
/// Edges are fractions of width/height (`0.0..=1.0`), then shrunk by a pixel
/// inset on each side. Fractions are floored, matching integer-division
/// bounds such as `h / 3 .. 2 * h / 3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    #[serde(default)]
    pub top: f32,
    #[serde(default = "one")]
    pub bottom: f32,
    #[serde(default)]
    pub left: f32,
    #[serde(default = "one")]
    pub right: f32,
    #[serde(default)]
    pub inset_x: u32,
    #[serde(default)]
    pub inset_y: u32,
}

fn one() -> f32 {
    1.0
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self::FULL
    }
}

impl RegionSpec {
    pub const FULL: RegionSpec = RegionSpec {
        top: 0.0,
        bottom: 1.0,
        left: 0.0,
        right: 1.0,
        inset_x: 0,
        inset_y: 0,
    };

    /// Horizontal band covering `top..bottom` of the height
    pub fn band(top: f32, bottom: f32) -> Self {
        Self { top, bottom, ..Self::FULL }
    }

    /// Resolve against concrete frame dimensions
    pub fn resolve(&self, width: u32, height: u32) -> PixelRect {
        let edge = |fraction: f32, extent: u32| -> u32 {
            ((extent as f64 * fraction as f64).floor().max(0.0) as u32).min(extent)
        };

        let x0 = (edge(self.left, width) + self.inset_x).min(width);
        let x1 = edge(self.right, width).saturating_sub(self.inset_x).max(x0);
        let y0 = (edge(self.top, height) + self.inset_y).min(height);
        let y1 = edge(self.bottom, height).saturating_sub(self.inset_y).max(y0);

        PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub(crate) fn validate(&self, key: &str) -> Result<()> {
        let fractions = [self.top, self.bottom, self.left, self.right];
        if fractions.iter().any(|f| !f.is_finite() || !(0.0..=1.0).contains(f)) {
            return Err(crate::error::CompositorError::invalid_value(
                format!("{}.region", key),
                format!("{:?}", fractions),
            ));
        }
        if self.top >= self.bottom || self.left >= self.right {
            return Err(crate::error::CompositorError::invalid_value(
                format!("{}.region", key),
                format!("top={} bottom={} left={} right={}", self.top, self.bottom, self.left, self.right),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_matches_integer_division_bounds() {
        let region = RegionSpec {
            top: 1.0 / 3.0,
            bottom: 2.0 / 3.0,
            left: 0.25,
            right: 0.75,
            ..RegionSpec::FULL
        };
        let rect = region.resolve(640, 301);
        assert_eq!(rect, PixelRect { x: 160, y: 100, width: 320, height: 100 });
    }

    #[test]
    fn test_region_inset_clips_to_frame() {
        let region = RegionSpec {
            bottom: 0.62,
            inset_x: 10,
            ..RegionSpec::FULL
        };
        let rect = region.resolve(100, 50);
        assert_eq!(rect, PixelRect { x: 10, y: 0, width: 80, height: 31 });

        let tiny = region.resolve(15, 10);
        assert!(tiny.is_empty());
    }

    #[test]
    fn test_crop_and_paste() {
        let base = Frame::new_filled(6, 4, [10, 20, 30]);
        let patch = Frame::new_filled(2, 2, [200, 0, 0]);
        let pasted = base.paste(&patch, (5, 3));

        assert_eq!(pasted.rgb(5, 3), [200, 0, 0]);
        assert_eq!(pasted.rgb(4, 3), [10, 20, 30]);
        assert_eq!(base.rgb(5, 3), [10, 20, 30]);

        let cropped = pasted.crop(PixelRect { x: 4, y: 2, width: 2, height: 2 });
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.rgb(1, 1), [200, 0, 0]);
        assert_eq!(cropped.rgb(0, 0), [10, 20, 30]);
    }

    #[test]
    fn test_rgb_frames_encode_without_alpha() {
        let frame = Frame::new_filled(3, 3, [1, 2, 3]);
        assert_eq!(frame.channels(), Channels::Rgb);
        assert!(!frame.to_dynamic().color().has_alpha());
        assert_eq!(frame.pixel(0, 0), [1, 2, 3, 255]);
    }

    #[test]
    fn test_save_and_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_0001.png");

        let frame = Frame::from_fn(4, 3, Channels::Rgba, |x, y| [x as u8 * 40, y as u8 * 60, 7, 128]);
        frame.save(&path).unwrap();

        let loaded = Frame::open(&path).unwrap();
        assert_eq!(loaded, frame);
    }
}
