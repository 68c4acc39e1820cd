//! Frame execution.
//!
//! Execution happens in three steps:
//!
//! 1. Barrier synthesis walks the linear order on the calling thread and
//!    advances the tracked resource states.
//! 2. Recording hands every pass its barriers and a command context. Each
//!    recording group gets its own context, and groups are recorded on
//!    scoped worker threads when more than one thread is allowed.
//! 3. Submission passes all contexts to the backend in one call, ordered by
//!    the position of their first pass.

use framegraph_core::profiling::{profile_scope, profile_scope_dynamic, set_thread_name};

use crate::backend::{CommandContext, ContextKind, GpuBackend};
use crate::barrier::{BarrierBatch, BarrierPlan, BarrierSynthesizer};
use crate::compiler::ExecutionOrder;
use crate::config::FrameGraphConfig;
use crate::error::GraphError;
use crate::graph::{Pass, PassHandle};
use crate::resource::ResourceTable;

/// Summary of one executed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    /// Frame the report belongs to.
    pub frame_index: u64,
    /// Number of passes recorded.
    pub pass_count: usize,
    /// State transitions recorded.
    pub transition_barriers: usize,
    /// UAV barriers recorded.
    pub uav_barriers: usize,
    /// Command contexts handed to the backend.
    pub contexts_submitted: usize,
    /// Threads that recorded contexts.
    pub recording_threads: usize,
}

impl ExecutionReport {
    /// Total number of barriers.
    pub fn barrier_count(&self) -> usize {
        self.transition_barriers + self.uav_barriers
    }
}

/// Passes recorded into one context.
struct RecordJob<'b, 'p> {
    kind: ContextKind,
    passes: Vec<(Pass<'p>, &'b BarrierBatch)>,
}

pub(crate) fn execute(
    passes: Vec<Pass<'_>>,
    order: &ExecutionOrder,
    resources: &mut ResourceTable,
    backend: &dyn GpuBackend,
    config: &FrameGraphConfig,
) -> Result<ExecutionReport, GraphError> {
    profile_scope!("framegraph_execute");

    let plan = BarrierSynthesizer::new().synthesize(order, &passes, resources)?;
    if config.dump_execution_plan {
        log_execution_plan(order, &passes, &plan);
    }

    let pass_count = passes.len();
    let (job_count, threads) = match record_and_submit(passes, order, &plan, backend, config) {
        Ok(counts) => counts,
        Err(err) => {
            if let Err(restore_err) = plan.restore(resources) {
                log::error!("FrameGraph: failed to restore resource states: {restore_err}");
            }
            return Err(err);
        }
    };

    let report = ExecutionReport {
        frame_index: resources.frame_index(),
        pass_count,
        transition_barriers: plan.transition_count(),
        uav_barriers: plan.uav_count(),
        contexts_submitted: job_count,
        recording_threads: threads,
    };
    log::debug!(
        "FrameGraph: frame {} executed {} passes with {} barriers in {} contexts",
        report.frame_index,
        report.pass_count,
        report.barrier_count(),
        report.contexts_submitted
    );
    Ok(report)
}

/// Record every pass and submit the contexts, returning the number of
/// contexts and recording threads.
fn record_and_submit(
    passes: Vec<Pass<'_>>,
    order: &ExecutionOrder,
    plan: &BarrierPlan,
    backend: &dyn GpuBackend,
    config: &FrameGraphConfig,
) -> Result<(usize, usize), GraphError> {
    let mut slots: Vec<Option<Pass<'_>>> = passes.into_iter().map(Some).collect();
    let jobs = if config.max_recording_threads <= 1 || order.groups().len() <= 1 {
        vec![make_job(order.pass_order(), &mut slots, plan)?]
    } else {
        order
            .groups()
            .iter()
            .map(|group| make_job(group.passes(), &mut slots, plan))
            .collect::<Result<Vec<_>, _>>()?
    };

    let job_count = jobs.len();
    let threads = config.max_recording_threads.clamp(1, job_count.max(1));
    let contexts = if threads <= 1 {
        jobs.into_iter()
            .map(|job| record_job(job, backend, config.debug_labels))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        record_parallel(jobs, threads, backend, config.debug_labels)?
    };

    profile_scope!("framegraph_submit");
    log::trace!(
        "FrameGraph: submitting {} contexts to {}",
        contexts.len(),
        backend.name()
    );
    backend.submit(contexts)?;
    Ok((job_count, threads))
}

/// Move the passes of `handles` out of `slots`, pairing each with its
/// barriers.
fn make_job<'b, 'p>(
    handles: &[PassHandle],
    slots: &mut [Option<Pass<'p>>],
    plan: &'b BarrierPlan,
) -> Result<RecordJob<'b, 'p>, GraphError> {
    let mut kind = ContextKind::Copy;
    let mut passes = Vec::with_capacity(handles.len());
    for &handle in handles {
        let index = handle.index() as usize;
        let pass = slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(GraphError::InvalidPassHandle(handle))?;
        let barriers = plan
            .batch(index)
            .ok_or(GraphError::InvalidPassHandle(handle))?;
        kind = kind.max(ContextKind::for_pass(pass.kind()));
        passes.push((pass, barriers));
    }
    Ok(RecordJob { kind, passes })
}

fn record_job(
    job: RecordJob<'_, '_>,
    backend: &dyn GpuBackend,
    debug_labels: bool,
) -> Result<Box<dyn CommandContext>, GraphError> {
    let mut ctx = backend.create_context(job.kind)?;
    let context = ctx.kind();

    for (mut pass, barriers) in job.passes {
        if !context.supports(pass.kind()) {
            return Err(GraphError::IncompatibleContext {
                pass: pass.name().to_string(),
                kind: pass.kind(),
                context,
            });
        }

        if !barriers.is_empty() {
            ctx.resource_barriers(barriers.as_slice());
        }

        profile_scope_dynamic!(pass.name());
        if debug_labels {
            ctx.begin_event(pass.name());
        }
        pass.record(&mut *ctx);
        if debug_labels {
            ctx.end_event();
        }
    }

    Ok(ctx)
}

/// Record `jobs` on up to `threads` scoped workers, returning the contexts in
/// job order.
fn record_parallel(
    jobs: Vec<RecordJob<'_, '_>>,
    threads: usize,
    backend: &dyn GpuBackend,
    debug_labels: bool,
) -> Result<Vec<Box<dyn CommandContext>>, GraphError> {
    let job_count = jobs.len();
    let mut buckets: Vec<Vec<(usize, RecordJob<'_, '_>)>> =
        (0..threads).map(|_| Vec::new()).collect();
    for (index, job) in jobs.into_iter().enumerate() {
        buckets[index % threads].push((index, job));
    }

    let recorded = std::thread::scope(|scope| {
        let workers: Vec<_> = buckets
            .into_iter()
            .map(|bucket| {
                scope.spawn(move || {
                    set_thread_name!("framegraph recorder");
                    bucket
                        .into_iter()
                        .map(|(index, job)| (index, record_job(job, backend, debug_labels)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Vec<_>>()
    });

    let mut contexts: Vec<Option<Box<dyn CommandContext>>> =
        (0..job_count).map(|_| None).collect();
    for (index, result) in recorded {
        contexts[index] = Some(result?);
    }
    Ok(contexts.into_iter().flatten().collect())
}

/// Log the order, levels, groups and barriers of a frame.
fn log_execution_plan(order: &ExecutionOrder, passes: &[Pass<'_>], plan: &BarrierPlan) {
    let mut group_of = vec![0; passes.len()];
    for (group_index, group) in order.groups().iter().enumerate() {
        for handle in group.passes() {
            group_of[handle.index() as usize] = group_index;
        }
    }

    log::debug!(
        "Execution plan for frame {}: {} passes, {} levels, {} groups, {} barriers",
        order.frame(),
        order.pass_count(),
        order.level_count(),
        order.groups().len(),
        plan.transition_count() + plan.uav_count()
    );
    for (position, handle) in order.pass_order().iter().enumerate() {
        let index = handle.index() as usize;
        let pass = &passes[index];
        log::debug!(
            "  [{position:>2}] {} ({}) level {} group {}",
            pass.name(),
            pass.kind().name(),
            order.level(*handle).unwrap_or_default(),
            group_of[index]
        );
        for barrier in plan.batch(index).into_iter().flat_map(BarrierBatch::iter) {
            log::debug!("         {barrier}");
        }
    }
}
