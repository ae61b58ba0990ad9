//! Removes marks drawn on a light surface (for example handwriting on a sheet
//! of paper) without letting the blur bleed past the surface's edge.
//!
//! The surface is found first and its mean color becomes the reference that
//! ink is measured against, so the same thresholds keep working as the
//! surface's lighting drifts from frame to frame.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{Channel, ColorClassifier, ColorRule, ColorSample, RuleSet};
use crate::error::{CompositorError, Result};
use crate::frame::{Frame, Mask, RegionSpec};
use crate::retouch::inpaint::InpaintEngine;
use crate::retouch::traits::{Retouch, RetouchOutcome, SizeGate, SkipReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    #[serde(default = "SurfaceSpec::default_region")]
    pub region: RegionSpec,
    /// What counts as the surface itself
    #[serde(default = "SurfaceSpec::default_surface")]
    pub surface: RuleSet,
    /// The surface must cover more than this many pixels
    #[serde(default = "SurfaceSpec::default_min_surface_pixels")]
    pub min_surface_pixels: usize,
    /// Marks on the surface; only surface pixels can match
    #[serde(default = "SurfaceSpec::default_ink")]
    pub ink: RuleSet,
    /// Marks that may extend off the surface, such as dark strokes
    #[serde(default = "SurfaceSpec::default_loose_ink", skip_serializing_if = "Option::is_none")]
    pub loose_ink: Option<RuleSet>,
    #[serde(default = "SurfaceSpec::default_gate")]
    pub gate: SizeGate,
    #[serde(default = "SurfaceSpec::default_blur_radius")]
    pub blur_radius: f32,
    #[serde(default = "SurfaceSpec::default_dilation_iterations")]
    pub dilation_iterations: u32,
    #[serde(default = "SurfaceSpec::default_clip_to_surface")]
    pub clip_to_surface: bool,
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self {
            region: Self::default_region(),
            surface: Self::default_surface(),
            min_surface_pixels: Self::default_min_surface_pixels(),
            ink: Self::default_ink(),
            loose_ink: Self::default_loose_ink(),
            gate: Self::default_gate(),
            blur_radius: Self::default_blur_radius(),
            dilation_iterations: Self::default_dilation_iterations(),
            clip_to_surface: Self::default_clip_to_surface(),
        }
    }
}

impl SurfaceSpec {
    fn default_region() -> RegionSpec {
        RegionSpec {
            bottom: 0.62,
            inset_x: 10,
            ..RegionSpec::FULL
        }
    }

    /// Warm off-white paper
    fn default_surface() -> RuleSet {
        RuleSet::new(vec![ColorRule::All {
            rules: vec![
                ColorRule::ChannelBounds {
                    lower: [200.0, 190.0, 180.0],
                    upper: [255.0, 256.0, 256.0],
                },
                ColorRule::ChannelGap {
                    channel: Channel::Green,
                    over: Channel::Blue,
                    below: 30.0,
                },
            ],
        }])
    }

    fn default_min_surface_pixels() -> usize {
        500
    }

    fn default_ink() -> RuleSet {
        RuleSet::new(vec![
            ColorRule::DistanceAbove { min_distance: 18.0 },
            ColorRule::DarkerThanReference { margin: 15.0 },
        ])
    }

    fn default_loose_ink() -> Option<RuleSet> {
        Some(RuleSet::new(vec![ColorRule::All {
            rules: vec![
                ColorRule::BrightnessBelow { max_brightness: 180.0 },
                ColorRule::ChannelBounds {
                    lower: [-1.0, 50.0, -1.0],
                    upper: [256.0; 3],
                },
                ColorRule::DistanceAbove { min_distance: 10.0 },
            ],
        }]))
    }

    fn default_gate() -> SizeGate {
        SizeGate::new(100, None)
    }

    fn default_blur_radius() -> f32 {
        25.0
    }

    fn default_dilation_iterations() -> u32 {
        3
    }

    fn default_clip_to_surface() -> bool {
        true
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        self.region.validate(key)?;
        self.surface.validate(&format!("{}.surface", key))?;
        self.ink.validate(&format!("{}.ink", key))?;
        if let Some(loose) = &self.loose_ink {
            loose.validate(&format!("{}.loose_ink", key))?;
        }
        self.gate.validate(key)?;
        if !self.blur_radius.is_finite() || self.blur_radius <= 0.0 {
            return Err(CompositorError::invalid_value(format!("{}.blur_radius", key), self.blur_radius));
        }
        Ok(())
    }
}

/// Masks produced while inspecting one frame
#[derive(Debug, Clone)]
pub struct SurfaceDetection {
    pub surface: Mask,
    pub reference: Option<ColorSample>,
    pub ink: Mask,
}

pub struct SurfaceCleanup {
    name: String,
    spec: SurfaceSpec,
    surface: ColorClassifier,
    ink: ColorClassifier,
    loose_ink: Option<ColorClassifier>,
    engine: InpaintEngine,
}

impl SurfaceCleanup {
    pub fn new(name: impl Into<String>, spec: SurfaceSpec) -> Result<Self> {
        let name = name.into();
        spec.validate(&format!("retouch.{}", name))?;

        let surface = ColorClassifier::new(spec.surface.clone())?.within(spec.region)?;
        let ink = ColorClassifier::new(spec.ink.clone())?.within(spec.region)?;
        let loose_ink = match &spec.loose_ink {
            Some(rules) => Some(ColorClassifier::new(rules.clone())?.within(spec.region)?),
            None => None,
        };
        let engine = InpaintEngine::new(spec.blur_radius, spec.dilation_iterations)?;

        Ok(Self {
            name,
            spec,
            surface,
            ink,
            loose_ink,
            engine,
        })
    }

    pub fn spec(&self) -> &SurfaceSpec {
        &self.spec
    }

    /// Find the surface, sample it, then find the ink measured against it
    pub fn detect(&self, frame: &Frame) -> Result<SurfaceDetection> {
        let surface = self.surface.classify(frame, &ColorSample::BLACK);
        let (w, h) = frame.dimensions();

        let reference = match ColorSample::mean_over(frame, &surface)? {
            Some(mean) if surface.count() > self.spec.min_surface_pixels => mean,
            mean => {
                return Ok(SurfaceDetection {
                    surface,
                    reference: mean,
                    ink: Mask::empty(w, h),
                })
            }
        };

        let mut ink = self.ink.classify(frame, &reference).intersect(&surface)?;
        if let Some(loose) = &self.loose_ink {
            ink = ink.union(&loose.classify(frame, &reference))?;
        }

        Ok(SurfaceDetection {
            surface,
            reference: Some(reference),
            ink,
        })
    }
}

impl Retouch for SurfaceCleanup {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "blur out marks drawn on a light surface"
    }

    fn apply(&self, frame: &Frame) -> Result<RetouchOutcome> {
        let detection = self.detect(frame)?;

        let surface_pixels = detection.surface.count();
        if detection.reference.is_none() || surface_pixels <= self.spec.min_surface_pixels {
            let reason = SkipReason::NoSurface {
                count: surface_pixels,
                min: self.spec.min_surface_pixels,
            };
            debug!("{}: skipped ({})", self.name, reason);
            return Ok(RetouchOutcome::Skipped { reason });
        }

        let count = detection.ink.count();
        if let Err(reason) = self.spec.gate.check(count) {
            debug!("{}: skipped ({})", self.name, reason);
            return Ok(RetouchOutcome::Skipped { reason });
        }

        let clip = self.spec.clip_to_surface.then_some(&detection.surface);
        let frame = self.engine.inpaint_clipped(frame, &detection.ink, clip)?;
        Ok(RetouchOutcome::Applied { frame, pixels: count })
    }
}
