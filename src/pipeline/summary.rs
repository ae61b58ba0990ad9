use std::collections::BTreeMap;

use tracing::info;

/// What one run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub segments: Vec<SegmentSummary>,
    /// Applied/skipped counts per retouch name
    pub retouches: BTreeMap<String, PassTally>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSummary {
    pub kind: &'static str,
    /// 1-based output index of the segment's first frame
    pub first_output: usize,
    pub frames: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassTally {
    pub applied: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn total_frames(&self) -> usize {
        self.segments.iter().map(|s| s.frames).sum()
    }

    pub(crate) fn record_segment(&mut self, kind: &'static str, first_output: usize, frames: usize) {
        self.segments.push(SegmentSummary {
            kind,
            first_output,
            frames,
        });
    }

    pub(crate) fn record_pass(&mut self, retouch: &str, applied: bool) {
        let tally = self.retouches.entry(retouch.to_string()).or_default();
        if applied {
            tally.applied += 1;
        } else {
            tally.skipped += 1;
        }
    }

    pub fn log(&self) {
        info!("✅ Run complete: {} frames written", self.total_frames());
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.frames == 0 {
                continue;
            }
            info!(
                "   Segment {} ({}): frames {}..={}",
                i + 1,
                segment.kind,
                segment.first_output,
                segment.first_output + segment.frames - 1
            );
        }
        for (name, tally) in &self.retouches {
            info!(
                "   Retouch {}: applied {}, skipped {}",
                name, tally.applied, tally.skipped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tallies() {
        let mut summary = RunSummary::default();
        summary.record_segment("static_hold", 1, 24);
        summary.record_segment("resampled_motion", 25, 72);
        summary.record_pass("cursor", true);
        summary.record_pass("cursor", false);
        summary.record_pass("cursor", true);

        assert_eq!(summary.total_frames(), 96);
        assert_eq!(summary.retouches["cursor"], PassTally { applied: 2, skipped: 1 });
        summary.log();
    }
}
