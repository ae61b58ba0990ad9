use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CompositorError, Result};
use crate::frame::{Frame, FrameSink, FrameSource, FrameStore, FrameWriter, MemorySequence};
use crate::pipeline::segment::{PassSchedule, Segment, SegmentPlan};
use crate::pipeline::summary::RunSummary;
use crate::resample::TemporalResampler;
use crate::retouch::RetouchRegistry;

/// Frames handed to the worker pool per batch, per worker
const FRAMES_PER_WORKER: usize = 2;

/// Assembles an output sequence from an ordered list of segments
///
/// The pipeline follows a simple flow per segment:
/// 1. Load only the source frames the segment reads
/// 2. Hold, retime, or retouch them
/// 3. Push the results to the sink in output order
///
/// Segments run strictly in declared order; output numbering is contiguous
/// from 1 across all of them.
pub struct SequencePipeline {
    plan: SegmentPlan,
    registry: RetouchRegistry,
    resampler: TemporalResampler,
    pool: ThreadPool,
    workers: usize,
}

impl SequencePipeline {
    /// Create a pipeline with the default resampler and one worker per CPU
    pub fn new(plan: SegmentPlan, registry: RetouchRegistry) -> Result<Self> {
        Self::with_options(plan, registry, TemporalResampler::default(), num_cpus::get())
    }

    /// Create a pipeline, checking that every pass names a registered retouch
    pub fn with_options(
        plan: SegmentPlan,
        registry: RetouchRegistry,
        resampler: TemporalResampler,
        workers: usize,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(CompositorError::invalid_value("pipeline.workers", workers));
        }
        for name in plan.retouch_names() {
            registry.require(name)?;
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("retouch-{}", i))
            .build()
            .map_err(|e| CompositorError::generic(format!("Failed to start worker pool: {}", e)))?;

        Ok(Self {
            plan,
            registry,
            resampler,
            pool,
            workers,
        })
    }

    /// Build the pipeline described by a configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let plan = SegmentPlan::new(config.segments.clone())?;
        let registry = RetouchRegistry::from_specs(&config.retouch)?;
        let resampler = TemporalResampler::new(config.pipeline.blend_epsilon)?;
        Self::with_options(plan, registry, resampler, config.pipeline.workers)
    }

    pub fn plan(&self) -> &SegmentPlan {
        &self.plan
    }

    pub fn registry(&self) -> &RetouchRegistry {
        &self.registry
    }

    /// Run every segment against `source`, pushing output frames into `sink`
    ///
    /// Source bounds are checked for all segments before any frame is
    /// produced. Any error aborts the run; whatever the sink received up to
    /// that point is not a valid result.
    pub fn process(&self, source: &dyn FrameSource, sink: &mut dyn FrameSink) -> Result<RunSummary> {
        info!(
            "🎬 Assembling {} output frames from {} segments ({} source frames)",
            self.plan.total_frames(),
            self.plan.len(),
            source.len()
        );
        self.plan.check_source(source.len())?;

        let mut summary = RunSummary::default();
        for (i, segment) in self.plan.segments().iter().enumerate() {
            let first_output = sink.written() + 1;
            debug!("Segment {}: {:?}", i + 1, segment);

            match segment {
                Segment::StaticHold { frame, count } => self.static_hold(source, *frame, *count, sink)?,
                Segment::ResampledMotion { from, to, count } => {
                    self.resampled_motion(source, *from, *to, *count, sink)?
                }
                Segment::ProcessedPass { from, to, passes, .. } => {
                    self.processed_pass(source, *from, *to, passes, sink, &mut summary)?
                }
            }

            let frames = sink.written() + 1 - first_output;
            info!("   Segment {} ({}): {} frames", i + 1, segment.kind(), frames);
            summary.record_segment(segment.kind(), first_output, frames);
        }

        summary.log();
        Ok(summary)
    }

    fn static_hold(&self, source: &dyn FrameSource, frame: usize, count: usize, sink: &mut dyn FrameSink) -> Result<()> {
        let held = source.load(frame)?;
        for _ in 0..count {
            sink.push(held.clone())?;
        }
        Ok(())
    }

    fn resampled_motion(
        &self,
        source: &dyn FrameSource,
        from: usize,
        to: usize,
        count: usize,
        sink: &mut dyn FrameSink,
    ) -> Result<()> {
        let slice = (from..=to).map(|i| source.load(i)).collect::<Result<Vec<_>>>()?;
        for frame in self.resampler.resample(&slice, count)? {
            sink.push(frame)?;
        }
        Ok(())
    }

    /// Retouch `from..=to` on the worker pool, in bounded batches
    fn processed_pass(
        &self,
        source: &dyn FrameSource,
        from: usize,
        to: usize,
        passes: &[PassSchedule],
        sink: &mut dyn FrameSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let indices: Vec<usize> = (from..=to).collect();
        let batch = (self.workers * FRAMES_PER_WORKER).max(1);

        for chunk in indices.chunks(batch) {
            let results = self.pool.install(|| {
                chunk
                    .par_iter()
                    .map(|&index| self.retouch_frame(source.load(index)?, index, passes))
                    .collect::<Result<Vec<_>>>()
            })?;

            for (frame, records) in results {
                for (name, applied) in records {
                    summary.record_pass(name, applied);
                }
                sink.push(frame)?;
            }
        }
        Ok(())
    }

    /// Apply every pass whose range covers `index`, in declared order
    fn retouch_frame<'a>(
        &self,
        mut frame: Frame,
        index: usize,
        passes: &'a [PassSchedule],
    ) -> Result<(Frame, Vec<(&'a str, bool)>)> {
        let mut records = Vec::new();
        for pass in passes.iter().filter(|p| p.covers(index)) {
            let retouch = self.registry.require(&pass.retouch)?;
            let outcome = retouch.apply(&frame)?;
            records.push((pass.retouch.as_str(), outcome.is_applied()));
            frame = outcome.into_frame(frame);
        }
        Ok((frame, records))
    }
}

/// Load the configured input directory, clear the output directory, and run
///
/// **Destructive**: the output directory is deleted and recreated before the
/// first frame is written.
pub fn run(config: &Config) -> Result<RunSummary> {
    let pipeline = SequencePipeline::from_config(config)?;
    let naming = config.io.naming();

    let source = FrameStore::open(&config.io.input_dir, naming.clone())?;
    pipeline.plan().check_source(source.len())?;
    config.io.check_output_location()?;

    let mut sink = FrameWriter::create(&config.io.output_dir, naming)?;
    let summary = pipeline.process(&source, &mut sink)?;
    info!("   Output: {:?}", sink.dir());
    Ok(summary)
}

/// Run segments over in-memory frames using the built-in retouches
pub fn process_sequence(frames: Vec<Frame>, segments: Vec<Segment>) -> Result<Vec<Frame>> {
    let pipeline = SequencePipeline::new(SegmentPlan::new(segments)?, RetouchRegistry::with_builtins()?)?;
    let source = MemorySequence::from(frames);
    let mut sink = MemorySequence::new();
    pipeline.process(&source, &mut sink)?;
    Ok(sink.into_frames())
}
