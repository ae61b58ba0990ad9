//! # Pipeline Module
//!
//! Turns a source sequence into the final output sequence by running an
//! ordered list of [`Segment`]s: static holds, resampled motion, and
//! processed passes that retouch frames on a worker pool.

pub mod engine;
pub mod segment;
pub mod summary;

pub use engine::{process_sequence, run, SequencePipeline};
pub use segment::{PassSchedule, Segment, SegmentPlan};
pub use summary::{PassTally, RunSummary, SegmentSummary};
