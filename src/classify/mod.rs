//! # Color Classification Module
//!
//! Builds boolean masks from per-pixel color predicates.
//!
//! Every pixel is measured once ([`PixelStats`]: saturation, value,
//! brightness and distance to a reference [`ColorSample`]) and then tested
//! against a [`RuleSet`], which is the union of its [`ColorRule`]s. Thresholds
//! are plain data so they can live in the configuration file; they were tuned
//! against specific source footage and are not expected to generalize.
//!
//! ```rust
//! use loop_compositor::classify::{ColorClassifier, ColorRule, ColorSample, RuleSet};
//! use loop_compositor::frame::Frame;
//!
//! # fn main() -> loop_compositor::Result<()> {
//! let frame = Frame::new_filled(8, 8, [240, 235, 220]);
//! let classifier = ColorClassifier::new(RuleSet::new(vec![ColorRule::DarkOutline {
//!     max_value: 0.45,
//!     min_distance: 35.0,
//! }]))?;
//! let mask = classifier.classify(&frame, &ColorSample::new([240.0, 235.0, 220.0]));
//! assert!(mask.is_clear());
//! # Ok(())
//! # }
//! ```

pub mod pixel;
pub mod rules;
pub mod sample;

pub use pixel::{luminance, saturation_value, PixelStats};
pub use rules::{Channel, ColorClassifier, ColorRule, RuleSet};
pub use sample::{ColorSample, Corner, ReferenceSpec};
