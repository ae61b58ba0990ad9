//! # Loop-Compositor
//!
//! Turn a numbered frame sequence into a short looping animation.
//!
//! The library classifies pixels with color rules, shapes the resulting masks
//! with morphology, erases or recolors the masked regions, and retimes source
//! frames into longer or shorter output segments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loop_compositor::{config::Config, pipeline};
//!
//! # fn main() -> loop_compositor::Result<()> {
//! let config = Config::from_file("configs/build_loop.toml")?;
//! let summary = pipeline::run(&config)?;
//! println!("wrote {} frames", summary.total_frames());
//! # Ok(())
//! # }
//! ```
//!
//! **Note:** a run deletes and recreates `io.output_dir` before writing.
//!
//! ## Architecture
//!
//! - [`frame`] - Frames, typed grids (masks, distance and blend fields), frame storage
//! - [`classify`] - Color rules that turn frames into masks
//! - [`morphology`] - Dilation and Euclidean distance transforms
//! - [`composite`] - Blending, blur and masked replacement
//! - [`retouch`] - Per-frame cleanup and recolor passes
//! - [`resample`] - Temporal retiming
//! - [`pipeline`] - Segment-by-segment sequence assembly
//! - [`config`] - Configuration management
//!
//! ## Custom Retouches
//!
//! Anything implementing [`Retouch`](retouch::Retouch) can be registered and
//! scheduled in a processed pass:
//!
//! ```rust
//! use loop_compositor::frame::Frame;
//! use loop_compositor::retouch::{Retouch, RetouchOutcome, RetouchRegistry};
//!
//! struct Passthrough;
//!
//! impl Retouch for Passthrough {
//!     fn name(&self) -> &str {
//!         "passthrough"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "returns the frame unchanged"
//!     }
//!
//!     fn apply(&self, frame: &Frame) -> loop_compositor::Result<RetouchOutcome> {
//!         Ok(RetouchOutcome::Applied { frame: frame.clone(), pixels: 0 })
//!     }
//! }
//!
//! let mut registry = RetouchRegistry::new();
//! registry.register(Box::new(Passthrough));
//! assert!(registry.has("passthrough"));
//! ```

pub mod classify;
pub mod composite;
pub mod config;
pub mod error;
pub mod frame;
pub mod morphology;
pub mod pipeline;
pub mod resample;
pub mod retouch;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{CompositorError, Result},
    frame::{Frame, Mask},
    pipeline::{RunSummary, Segment, SequencePipeline},
    resample::TemporalResampler,
    retouch::{Retouch, RetouchRegistry},
};
