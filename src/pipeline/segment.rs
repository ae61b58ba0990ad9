use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, ResourceError, Result};

/// One contiguous stretch of the output sequence
///
/// Source indices are 1-based and inclusive, matching the numbering of the
/// frame files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Repeat one source frame `count` times
    StaticHold { frame: usize, count: usize },
    /// Retime `from..=to` to exactly `count` frames
    ResampledMotion { from: usize, to: usize, count: usize },
    /// Run retouches over `from..=to`, one output frame per source frame
    ProcessedPass {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
        #[serde(default)]
        passes: Vec<PassSchedule>,
    },
}

/// Apply the named retouch to source frames `from..=to`
///
/// Ranges use absolute source indices, so a schedule reads the same no
/// matter where its segment starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSchedule {
    pub retouch: String,
    pub from: usize,
    pub to: usize,
}

impl PassSchedule {
    pub fn new(retouch: impl Into<String>, from: usize, to: usize) -> Self {
        Self {
            retouch: retouch.into(),
            from,
            to,
        }
    }

    pub fn covers(&self, index: usize) -> bool {
        (self.from..=self.to).contains(&index)
    }
}

impl Segment {
    pub fn static_hold(frame: usize, count: usize) -> Self {
        Segment::StaticHold { frame, count }
    }

    pub fn resampled_motion(from: usize, to: usize, count: usize) -> Self {
        Segment::ResampledMotion { from, to, count }
    }

    pub fn processed_pass(from: usize, to: usize, passes: Vec<PassSchedule>) -> Self {
        Segment::ProcessedPass {
            from,
            to,
            count: None,
            passes,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Segment::StaticHold { .. } => "static_hold",
            Segment::ResampledMotion { .. } => "resampled_motion",
            Segment::ProcessedPass { .. } => "processed_pass",
        }
    }

    /// Source frames this segment reads
    pub fn source_range(&self) -> RangeInclusive<usize> {
        match self {
            Segment::StaticHold { frame, .. } => *frame..=*frame,
            Segment::ResampledMotion { from, to, .. } | Segment::ProcessedPass { from, to, .. } => *from..=*to,
        }
    }

    /// Frames this segment contributes to the output
    pub fn output_count(&self) -> usize {
        match self {
            Segment::StaticHold { count, .. } | Segment::ResampledMotion { count, .. } => *count,
            Segment::ProcessedPass { from, to, .. } => to + 1 - from,
        }
    }

    pub fn passes(&self) -> &[PassSchedule] {
        match self {
            Segment::ProcessedPass { passes, .. } => passes,
            _ => &[],
        }
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        match self {
            Segment::StaticHold { frame, count } => {
                check_index(key, "frame", *frame)?;
                check_count(key, *count)?;
            }
            Segment::ResampledMotion { from, to, count } => {
                check_range(key, *from, *to)?;
                check_count(key, *count)?;
            }
            Segment::ProcessedPass { from, to, count, passes } => {
                check_range(key, *from, *to)?;
                if let Some(count) = count {
                    if *count != to + 1 - from {
                        return Err(CompositorError::invalid_value(
                            format!("{}.count", key),
                            format!("{} (range {}..={} has {} frames)", count, from, to, to + 1 - from),
                        ));
                    }
                }
                for (i, pass) in passes.iter().enumerate() {
                    let pass_key = format!("{}.passes[{}]", key, i);
                    if pass.retouch.trim().is_empty() {
                        return Err(CompositorError::invalid_value(format!("{}.retouch", pass_key), "\"\""));
                    }
                    check_range(&pass_key, pass.from, pass.to)?;
                }
            }
        }
        Ok(())
    }

    /// Fail unless every source frame this segment reads exists
    pub fn check_source(&self, len: usize) -> Result<()> {
        let last = *self.source_range().end();
        if last > len {
            return Err(ResourceError::SourceOutOfRange { index: last, len }.into());
        }
        Ok(())
    }
}

fn check_index(key: &str, field: &str, index: usize) -> Result<()> {
    if index == 0 {
        return Err(CompositorError::invalid_value(format!("{}.{}", key, field), index));
    }
    Ok(())
}

fn check_count(key: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(CompositorError::invalid_value(format!("{}.count", key), count));
    }
    Ok(())
}

fn check_range(key: &str, from: usize, to: usize) -> Result<()> {
    check_index(key, "from", from)?;
    if to < from {
        return Err(CompositorError::invalid_value(
            format!("{}.to", key),
            format!("{} (before from = {})", to, from),
        ));
    }
    Ok(())
}

/// A validated, ordered list of segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPlan {
    segments: Vec<Segment>,
}

impl SegmentPlan {
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(CompositorError::invalid_value("segments", "[]"));
        }
        for (i, segment) in segments.iter().enumerate() {
            segment.validate(&format!("segments[{}]", i))?;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Length of the assembled output
    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(Segment::output_count).sum()
    }

    /// Highest source index any segment reads
    pub fn last_source_index(&self) -> usize {
        self.segments
            .iter()
            .map(|s| *s.source_range().end())
            .max()
            .unwrap_or(0)
    }

    /// Every retouch name referenced by a pass, in order of first use
    pub fn retouch_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for pass in self.segments.iter().flat_map(Segment::passes) {
            if !names.contains(&pass.retouch.as_str()) {
                names.push(&pass.retouch);
            }
        }
        names
    }

    pub fn check_source(&self, len: usize) -> Result<()> {
        self.segments.iter().try_for_each(|s| s.check_source(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn loop_plan() -> Vec<Segment> {
        vec![
            Segment::static_hold(30, 24),
            Segment::resampled_motion(43, 72, 72),
            Segment::static_hold(72, 18),
        ]
    }

    #[test]
    fn test_output_counts() {
        let plan = SegmentPlan::new(loop_plan()).unwrap();
        assert_eq!(plan.total_frames(), 114);
        assert_eq!(plan.last_source_index(), 72);

        let pass = Segment::processed_pass(1, 105, vec![]);
        assert_eq!(pass.output_count(), 105);
        assert_eq!(pass.source_range(), 1..=105);
    }

    #[test]
    fn test_invalid_segments_fail_fast() {
        let bad = [
            Segment::static_hold(0, 24),
            Segment::static_hold(30, 0),
            Segment::resampled_motion(72, 43, 72),
            Segment::resampled_motion(43, 72, 0),
            Segment::ProcessedPass {
                from: 1,
                to: 10,
                count: Some(9),
                passes: vec![],
            },
            Segment::processed_pass(1, 10, vec![PassSchedule::new("cursor", 5, 2)]),
        ];
        for segment in bad {
            let err = SegmentPlan::new(vec![segment.clone()]).unwrap_err();
            assert!(
                matches!(err, CompositorError::Config(ConfigError::InvalidValue { .. })),
                "{:?}",
                segment
            );
        }
        assert!(SegmentPlan::new(vec![]).is_err());
    }

    #[test]
    fn test_source_bounds() {
        let plan = SegmentPlan::new(loop_plan()).unwrap();
        assert!(plan.check_source(72).is_ok());
        match plan.check_source(71) {
            Err(CompositorError::Resource(ResourceError::SourceOutOfRange { index, len })) => {
                assert_eq!((index, len), (72, 71));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pass_schedules() {
        let segment = Segment::processed_pass(
            1,
            105,
            vec![
                PassSchedule::new("cursor", 1, 20),
                PassSchedule::new("paper_text", 60, 105),
                PassSchedule::new("cursor", 90, 91),
            ],
        );
        assert!(segment.passes()[0].covers(20));
        assert!(!segment.passes()[0].covers(21));

        let plan = SegmentPlan::new(vec![segment]).unwrap();
        assert_eq!(plan.retouch_names(), vec!["cursor", "paper_text"]);
    }

    #[test]
    fn test_segments_parse_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            segments: Vec<Segment>,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[segments]]
            kind = "static_hold"
            frame = 30
            count = 24

            [[segments]]
            kind = "processed_pass"
            from = 1
            to = 105
            passes = [{ retouch = "cursor", from = 1, to = 20 }]
            "#,
        )
        .unwrap();

        assert_eq!(doc.segments[0], Segment::static_hold(30, 24));
        assert_eq!(doc.segments[1].passes(), &[PassSchedule::new("cursor", 1, 20)]);
    }
}
