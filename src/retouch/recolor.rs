//! Recolors lettering inside a horizontal band and gives it a soft halo.
//!
//! Text is found by its distance from the band's background color, remapped
//! onto a two-shade luminance ramp so the original shading survives, and the
//! anti-aliased fringe is faded toward the same ramp. The halo is a solid ring
//! around the recolored text that fades out over a second, wider ring.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{luminance, Channel, ColorClassifier, ColorRule, ColorSample, Corner, ReferenceSpec, RuleSet};
use crate::composite::{blend, fill_masked, ring_factor, solid_like};
use crate::error::{CompositorError, Result};
use crate::frame::{BlendField, Frame, Mask, RegionSpec};
use crate::morphology::{dilate, distance_transform};
use crate::retouch::traits::{Retouch, RetouchOutcome, SkipReason};

/// Linear ramp between two colors indexed by normalized luminance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeRamp {
    pub dark: [u8; 3],
    pub light: [u8; 3],
}

impl Default for ShadeRamp {
    fn default() -> Self {
        Self {
            dark: [20, 48, 28],
            light: [55, 118, 62],
        }
    }
}

impl ShadeRamp {
    pub fn shade(&self, rgb: [f32; 3]) -> [u8; 3] {
        let t = (luminance(rgb) / 255.0).clamp(0.0, 1.0);
        let mut out = [0u8; 3];
        for c in 0..3 {
            let dark = self.dark[c] as f32;
            let light = self.light[c] as f32;
            out[c] = (dark + (light - dark) * t).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

/// Non-text pixels whose distance from the background lies in
/// `(min_distance, max_distance]` are partially recolored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeBand {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for EdgeBand {
    fn default() -> Self {
        Self {
            min_distance: 12.0,
            max_distance: 25.0,
        }
    }
}

impl EdgeBand {
    pub fn factor(&self, distance: f32) -> f32 {
        if distance > self.min_distance && distance <= self.max_distance {
            ((distance - self.min_distance) / (self.max_distance - self.min_distance)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaloSpec {
    /// Recolored pixels farther than this from the background seed the halo
    #[serde(default = "HaloSpec::default_reseed_distance")]
    pub reseed_distance: f32,
    /// Solid ring width
    #[serde(default = "HaloSpec::default_radius")]
    pub radius: u32,
    /// Outer edge of the fading ring
    #[serde(default = "HaloSpec::default_soft_radius")]
    pub soft_radius: u32,
    #[serde(default = "HaloSpec::default_color")]
    pub color: [u8; 3],
}

impl Default for HaloSpec {
    fn default() -> Self {
        Self {
            reseed_distance: Self::default_reseed_distance(),
            radius: Self::default_radius(),
            soft_radius: Self::default_soft_radius(),
            color: Self::default_color(),
        }
    }
}

impl HaloSpec {
    fn default_reseed_distance() -> f32 {
        20.0
    }

    fn default_radius() -> u32 {
        18
    }

    fn default_soft_radius() -> u32 {
        25
    }

    fn default_color() -> [u8; 3] {
        [255, 255, 255]
    }
}

/// Config file form; a missing `halo` table means no halo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecolorSpec {
    #[serde(default = "RecolorSpec::default_band")]
    pub band: RegionSpec,
    #[serde(default = "RecolorSpec::default_reference")]
    pub reference: ReferenceSpec,
    #[serde(default = "RecolorSpec::default_text")]
    pub text: RuleSet,
    #[serde(default)]
    pub shades: ShadeRamp,
    #[serde(default)]
    pub edge: EdgeBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo: Option<HaloSpec>,
}

impl Default for RecolorSpec {
    fn default() -> Self {
        Self {
            band: Self::default_band(),
            reference: Self::default_reference(),
            text: Self::default_text(),
            shades: ShadeRamp::default(),
            edge: EdgeBand::default(),
            halo: Some(HaloSpec::default()),
        }
    }
}

impl RecolorSpec {
    fn default_band() -> RegionSpec {
        RegionSpec::band(0.0, 0.12)
    }

    fn default_reference() -> ReferenceSpec {
        ReferenceSpec::Corners {
            size: 80,
            corners: vec![Corner::TopLeft, Corner::TopRight],
        }
    }

    /// Colored fill, dark outline, and any leftover red or blue tint
    fn default_text() -> RuleSet {
        let dominance = |channel| ColorRule::ChannelDominance {
            channel,
            over: Channel::Green,
            margin: 15.0,
            min_distance: Some(20.0),
        };
        RuleSet::new(vec![
            ColorRule::ColoredFill {
                min_saturation: 0.12,
                min_value: 0.25,
                min_distance: 25.0,
            },
            ColorRule::DarkOutline {
                max_value: 0.45,
                min_distance: 35.0,
            },
            dominance(Channel::Red),
            dominance(Channel::Blue),
        ])
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        self.band.validate(key)?;
        self.reference.validate(key)?;
        self.text.validate(&format!("{}.text", key))?;

        let edge = &self.edge;
        if !edge.min_distance.is_finite()
            || !edge.max_distance.is_finite()
            || edge.min_distance < 0.0
            || edge.min_distance >= edge.max_distance
        {
            return Err(CompositorError::invalid_value(
                format!("{}.edge", key),
                format!("min={} max={}", edge.min_distance, edge.max_distance),
            ));
        }

        if let Some(halo) = &self.halo {
            if !halo.reseed_distance.is_finite() || halo.reseed_distance < 0.0 {
                return Err(CompositorError::invalid_value(
                    format!("{}.halo.reseed_distance", key),
                    halo.reseed_distance,
                ));
            }
            if halo.radius >= halo.soft_radius {
                return Err(CompositorError::invalid_value(
                    format!("{}.halo", key),
                    format!("radius={} soft_radius={}", halo.radius, halo.soft_radius),
                ));
            }
        }
        Ok(())
    }
}

pub struct RecolorRetouch {
    name: String,
    spec: RecolorSpec,
    classifier: ColorClassifier,
}

impl RecolorRetouch {
    pub fn new(name: impl Into<String>, spec: RecolorSpec) -> Result<Self> {
        let name = name.into();
        spec.validate(&format!("retouch.{}", name))?;
        let classifier = ColorClassifier::new(spec.text.clone())?;
        Ok(Self { name, spec, classifier })
    }

    pub fn spec(&self) -> &RecolorSpec {
        &self.spec
    }

    /// Text mask and background reference for a band already cut out of a frame
    pub fn detect(&self, band: &Frame) -> Result<(Mask, ColorSample)> {
        let reference = self.spec.reference.sample(band)?;
        Ok((self.classifier.classify(band, &reference), reference))
    }

    fn recolor(&self, band: &Frame, text: &Mask, reference: &ColorSample) -> Result<Frame> {
        let (w, h) = band.dimensions();
        let shades = self.spec.shades;
        let shaded = Frame::from_fn(w, h, band.channels(), |x, y| {
            let [r, g, b] = shades.shade(band.rgb_f32(x, y));
            [r, g, b, band.pixel(x, y)[3]]
        });

        let edge = self.spec.edge;
        let factor = BlendField::from_fn(w, h, |x, y| {
            if text.get(x, y) {
                1.0
            } else {
                edge.factor(reference.distance(band.rgb_f32(x, y)))
            }
        });

        blend(band, &shaded, &factor)
    }

    fn add_halo(&self, band: &Frame, reference: &ColorSample, halo: &HaloSpec) -> Result<Frame> {
        let (w, h) = band.dimensions();
        let seed = Mask::from_fn(w, h, |x, y| reference.distance(band.rgb_f32(x, y)) > halo.reseed_distance);
        if seed.is_clear() {
            return Ok(band.clone());
        }

        let solid = dilate(&seed, halo.radius);
        let outline = solid.difference(&seed)?;
        let fading = dilate(&seed, halo.soft_radius).difference(&solid)?;

        let painted = fill_masked(band, halo.color, &outline)?;
        let factor = ring_factor(
            &distance_transform(&seed),
            halo.radius as f32,
            halo.soft_radius as f32,
        )?
        .restrict_to(&fading)?;

        blend(&painted, &solid_like(&painted, halo.color), &factor)
    }
}

impl Retouch for RecolorRetouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "recolor lettering onto a two-shade ramp and add a halo"
    }

    fn apply(&self, frame: &Frame) -> Result<RetouchOutcome> {
        let (w, h) = frame.dimensions();
        let rect = self.spec.band.resolve(w, h);
        if rect.is_empty() {
            return Ok(RetouchOutcome::Skipped {
                reason: SkipReason::EmptyRegion,
            });
        }

        let band = frame.crop(rect);
        let (text, reference) = self.detect(&band)?;
        debug!(
            "{}: {} text pixels, background {:?}",
            self.name,
            text.count(),
            reference.rgb
        );

        let mut finished = self.recolor(&band, &text, &reference)?;
        if let Some(halo) = &self.spec.halo {
            finished = self.add_halo(&finished, &reference, halo)?;
        }

        Ok(RetouchOutcome::Applied {
            frame: frame.paste(&finished, (rect.x, rect.y)),
            pixels: text.count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Channels;

    const BG: [u8; 4] = [235, 230, 215, 255];
    const RED: [u8; 4] = [220, 40, 60, 255];
    const TINT: [u8; 4] = [245, 240, 225, 255];

    /// 400x100 frame; the 12-row top band holds a red word and a faint tint
    fn banner() -> Frame {
        Frame::from_fn(400, 100, Channels::Rgb, |x, y| {
            if (190..210).contains(&x) && (4..8).contains(&y) {
                RED
            } else if x == 120 && y == 6 {
                TINT
            } else {
                BG
            }
        })
    }

    fn applied(outcome: RetouchOutcome) -> Frame {
        match outcome {
            RetouchOutcome::Applied { frame, .. } => frame,
            other => panic!("expected an applied recolor, got {:?}", other),
        }
    }

    #[test]
    fn test_shade_ramp_endpoints() {
        let ramp = ShadeRamp::default();
        assert_eq!(ramp.shade([0.0, 0.0, 0.0]), [20, 48, 28]);
        assert_eq!(ramp.shade([255.0, 255.0, 255.0]), [55, 118, 62]);
    }

    #[test]
    fn test_edge_band_factor() {
        let edge = EdgeBand::default();
        assert_eq!(edge.factor(12.0), 0.0);
        assert!((edge.factor(18.5) - 0.5).abs() < 1e-6);
        assert_eq!(edge.factor(25.0), 1.0);
        assert_eq!(edge.factor(25.5), 0.0);
    }

    #[test]
    fn test_text_is_recolored() {
        let retouch = RecolorRetouch::new("title", RecolorSpec::default()).unwrap();
        let frame = banner();
        let band = frame.crop(RecolorSpec::default().band.resolve(400, 100));

        let (text, reference) = retouch.detect(&band).unwrap();
        assert_eq!(text.count(), 80);
        assert_eq!(reference, ColorSample::new([235.0, 230.0, 215.0]));

        let out = applied(retouch.apply(&frame).unwrap());
        let expected = ShadeRamp::default().shade([220.0, 40.0, 60.0]);
        assert_eq!(out.rgb(200, 6), expected);
    }

    #[test]
    fn test_halo_rings() {
        let retouch = RecolorRetouch::new("title", RecolorSpec::default()).unwrap();
        let out = applied(retouch.apply(&banner()).unwrap());

        // Solid ring right next to the text
        assert_eq!(out.rgb(185, 6), [255, 255, 255]);
        // Fading ring: between background and halo color
        let fading = out.rgb(169, 6);
        assert!(fading[0] > BG[0] && fading[0] < 255, "{:?}", fading);
        // Beyond the soft radius
        assert_eq!(out.pixel(150, 6), BG);
    }

    #[test]
    fn test_only_band_is_modified() {
        let retouch = RecolorRetouch::new("title", RecolorSpec::default()).unwrap();
        let frame = banner();
        let out = applied(retouch.apply(&frame).unwrap());
        for y in 12..100 {
            for x in (0..400).step_by(7) {
                assert_eq!(out.pixel(x, y), frame.pixel(x, y), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_anti_alias_fringe_is_partially_recolored() {
        let spec = RecolorSpec {
            halo: None,
            ..RecolorSpec::default()
        };
        let retouch = RecolorRetouch::new("title", spec).unwrap();
        let out = applied(retouch.apply(&banner()).unwrap());

        let fringe = out.rgb(120, 6);
        assert!(fringe[0] < TINT[0] && fringe[0] > 55, "{:?}", fringe);
        assert_eq!(out.pixel(100, 6), BG);
    }

    #[test]
    fn test_invalid_halo_radii() {
        let spec = RecolorSpec {
            halo: Some(HaloSpec {
                radius: 25,
                soft_radius: 18,
                ..HaloSpec::default()
            }),
            ..RecolorSpec::default()
        };
        assert!(RecolorRetouch::new("title", spec).is_err());
    }

    #[test]
    fn test_halo_is_opt_in_from_config() {
        let spec: RecolorSpec = toml::from_str("").unwrap();
        assert!(spec.halo.is_none());

        let spec: RecolorSpec = toml::from_str("[halo]\nradius = 10").unwrap();
        let halo = spec.halo.unwrap();
        assert_eq!(halo.radius, 10);
        assert_eq!(halo.soft_radius, 25);
    }
}
