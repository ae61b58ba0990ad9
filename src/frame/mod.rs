//! # Frame Module
//!
//! Frames, the typed grids computed over them, and numbered frame storage.

pub mod grid;
pub mod store;
pub mod types;

pub use grid::{BlendField, DistanceField, Grid, Mask};
pub use store::{FrameNaming, FrameSink, FrameSource, FrameStore, FrameWriter, MemorySequence};
pub use types::{Channels, Frame, PixelRect, RegionSpec};
