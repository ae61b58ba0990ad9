//! # Retouch Module
//!
//! Per-frame cleanup and recolor passes applied during a processed pass.
//!
//! Every retouch implements the [`Retouch`] trait. The built-in kinds are:
//! - **Artifact**: blur out a small high-contrast feature such as a cursor
//! - **Surface cleanup**: blur out marks on a light surface, clipped to it
//! - **Recolor**: remap lettering onto a shade ramp and add a halo
//!
//! Detection is guarded by a [`SizeGate`]; detections outside the gate leave
//! the frame untouched and are reported as [`RetouchOutcome::Skipped`].

pub mod artifact;
pub mod inpaint;
pub mod recolor;
pub mod registry;
pub mod surface;
pub mod traits;

pub use artifact::{ArtifactRetouch, ArtifactSpec};
pub use inpaint::{inpaint, InpaintEngine};
pub use recolor::{EdgeBand, HaloSpec, RecolorRetouch, RecolorSpec, ShadeRamp};
pub use registry::{builtin_specs, RetouchRegistry, RetouchSpec};
pub use surface::{SurfaceCleanup, SurfaceDetection, SurfaceSpec};
pub use traits::{Retouch, RetouchOutcome, SizeGate, SkipReason};
