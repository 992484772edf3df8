//! Tiled wavefront path tracing over a pool of device queues.
//!
//! One worker thread per queue claims tiles from the shared [`WorkScheduler`]
//! and drives each tile's batch to completion:
//!
//! 1. upload the tile and launch `integrator_init_from_camera`
//! 2. read the batch counters, enqueue every kernel with queued paths
//!    (shadow kernels first), synchronize
//! 3. repeat until all counters are zero, then accumulate radiance
//!
//! Failures are reported per tile in a [`RenderReport`]; what happens to the
//! other queues is set by [`FailurePolicy`], what happens to an in-flight batch
//! on cancellation by [`CancelPolicy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::buffers::RenderBuffers;
use super::config::{CancelPolicy, FailurePolicy, RenderConfig};
use super::report::{RenderReport, TileOutcome};
use super::work_scheduler::WorkScheduler;
use super::work_tile::WorkTile;
use crate::device::{
    queued_paths_args, Device, DeviceKernel, DeviceQueue, PathRadiance, INIT_FROM_CAMERA_ARGS, PATH_KERNEL_ARGS,
};
use crate::kernel::{PathKernel, QueueCounterSnapshot};
use crate::util::{Error, Result};

/// Cloneable flag that cancels a running render.
///
/// Workers check it before claiming a tile and after every synchronize.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Re-arm the token for the next render.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Kernels launched in one round, in launch order, with their queued counts.
pub type RoundKernels = SmallVec<[(PathKernel, u32); PathKernel::COUNT]>;

const SHADOW_ORDER: [PathKernel; 2] = [PathKernel::IntersectShadow, PathKernel::ShadeShadow];
const MAIN_ORDER: [PathKernel; 5] = [
    PathKernel::IntersectClosest,
    PathKernel::IntersectSubsurface,
    PathKernel::ShadeBackground,
    PathKernel::ShadeSurface,
    PathKernel::ShadeVolume,
];

/// Pick the kernels of the next round from the batch counters.
///
/// While any shadow path is queued, kernels that may spawn another shadow path
/// are held back, so a slot never holds two shadow paths and a shadow resolves
/// before its parent shades again.
pub fn schedule_round(counters: &QueueCounterSnapshot) -> RoundKernels {
    let shadows_queued = counters.num_shadow_queued() > 0;
    let mut round = RoundKernels::new();
    for kernel in SHADOW_ORDER.into_iter().chain(MAIN_ORDER) {
        let n = counters.get(kernel);
        if n == 0 || (shadows_queued && kernel.spawns_shadow()) {
            continue;
        }
        round.push((kernel, n));
    }
    round
}

struct WorkerQueue {
    index: usize,
    queue: Box<dyn DeviceQueue>,
    /// Device data generation this queue was initialized for.
    init_generation: Option<u64>,
    /// A launch failed during the last render; the queue is replaced before
    /// the next one.
    failed: bool,
}

#[derive(Debug, Default)]
struct WorkerStats {
    rounds: u64,
    launches: [u64; PathKernel::COUNT],
}

/// Shared, read-only view handed to every worker.
struct WorkerContext<'a> {
    scheduler: &'a WorkScheduler,
    buffers: &'a RenderBuffers,
    cancel: &'a CancelToken,
    failure_policy: FailurePolicy,
    cancel_policy: CancelPolicy,
    report: &'a Mutex<RenderReport>,
}

/// Tiled path trace coordinator.
pub struct PathTraceWorkTiled {
    device: Arc<dyn Device>,
    buffers: Arc<RenderBuffers>,
    config: RenderConfig,
    queues: Vec<WorkerQueue>,
    scheduler: WorkScheduler,
    cancel: CancelToken,
}

impl PathTraceWorkTiled {
    /// Create one queue per concurrent device queue.
    ///
    /// The buffer's full image must match the device camera.
    pub fn new(device: Arc<dyn Device>, buffers: Arc<RenderBuffers>, config: RenderConfig) -> Result<Self> {
        config.validate()?;

        let num_queues = device.num_concurrent_queues();
        if num_queues == 0 {
            return Err(Error::NoQueues);
        }

        let film = device.film_size();
        let params = buffers.params();
        if film.x != params.full_width || film.y != params.full_height {
            return Err(Error::BufferMismatch {
                expected: film.x as usize * film.y as usize,
                actual: params.full_width as usize * params.full_height as usize,
            });
        }

        let queues: Vec<_> = (0..num_queues)
            .map(|index| WorkerQueue {
                index,
                queue: device.create_queue(index),
                init_generation: None,
                failed: false,
            })
            .collect();

        // Tiles are planned against the device maximum; every queue must hold
        // a full batch.
        let max_states = device.max_num_path_states();
        if let Some(capacity) = queues
            .iter()
            .map(|wq| wq.queue.num_concurrent_states())
            .find(|&capacity| capacity < max_states)
        {
            return Err(Error::TileTooLarge { work_size: max_states, capacity });
        }
        let scheduler = WorkScheduler::new(max_states);

        tracing::debug!(device = %device.info().name, num_queues, "path trace work created");

        Ok(Self {
            device,
            buffers,
            config,
            queues,
            scheduler,
            cancel: CancelToken::new(),
        })
    }

    pub fn buffers(&self) -> &Arc<RenderBuffers> {
        &self.buffers
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    /// Tile plan of the last [`render_samples`](Self::render_samples) call.
    pub fn scheduler(&self) -> &WorkScheduler {
        &self.scheduler
    }

    /// Token that cancels this coordinator's renders.
    ///
    /// A cancelled token stays set; call [`CancelToken::reset`] before the
    /// next render.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Render all configured samples.
    pub fn render(&mut self) -> RenderReport {
        self.render_samples(0, self.config.samples)
    }

    /// Render samples `start_sample .. start_sample + num_samples` into the
    /// buffer.
    #[tracing::instrument(skip(self))]
    pub fn render_samples(&mut self, start_sample: u32, num_samples: u32) -> RenderReport {
        self.scheduler.set_max_num_path_states(self.device.max_num_path_states());
        self.scheduler.reset(self.buffers.params(), start_sample, num_samples);

        let generation = self.device.data_generation();
        for wq in &mut self.queues {
            if wq.failed {
                // Failures are sticky for the queue's lifetime; a fresh queue
                // takes over so one bad batch does not cost a tile per render.
                tracing::debug!(queue = wq.queue.name(), "replacing failed queue");
                wq.queue = self.device.create_queue(wq.index);
                wq.init_generation = None;
                wq.failed = false;
            }
            if wq.init_generation != Some(generation) {
                wq.queue.init_execution();
                wq.init_generation = Some(generation);
            }
        }

        let report = Mutex::new(RenderReport::new(self.scheduler.num_tiles()));
        let ctx = WorkerContext {
            scheduler: &self.scheduler,
            buffers: &self.buffers,
            cancel: &self.cancel,
            failure_policy: self.config.failure_policy,
            cancel_policy: self.config.cancel_policy,
            report: &report,
        };

        std::thread::scope(|s| {
            for wq in self.queues.iter_mut() {
                let ctx = &ctx;
                s.spawn(move || wq.failed = ctx.run_worker(wq.queue.as_mut()));
            }
        });

        let mut report = report.into_inner();
        let unclaimed = self.scheduler.num_tiles() - self.scheduler.num_claimed();
        report.finish(self.cancel.is_cancelled(), unclaimed);

        if report.is_success() {
            tracing::info!(tiles = report.total_tiles, rounds = report.num_rounds, "render finished");
        } else {
            tracing::warn!(%report, "render incomplete");
        }
        report
    }
}

impl WorkerContext<'_> {
    /// Drive `queue` until the scheduler runs dry; `true` if a launch failed.
    fn run_worker(&self, queue: &mut dyn DeviceQueue) -> bool {
        let span = tracing::info_span!("worker", queue = queue.name());
        let _enter = span.enter();

        let mut stats = WorkerStats::default();
        let mut radiance = Vec::new();
        let mut failed = false;

        while !self.cancel.is_cancelled() {
            let Some(tile) = self.scheduler.next_tile() else {
                break;
            };
            let outcome = self.render_tile(queue, &tile, &mut stats, &mut radiance);
            self.report.lock().record(tile, outcome);

            match outcome {
                TileOutcome::Completed => {}
                TileOutcome::Failed => {
                    failed = true;
                    if self.failure_policy == FailurePolicy::FailFast {
                        tracing::warn!(tile = tile.index, "stopping all queues");
                        self.scheduler.stop();
                    }
                    break;
                }
                TileOutcome::Abandoned | TileOutcome::Partial => break,
            }
        }

        let mut report = self.report.lock();
        report.num_rounds += stats.rounds;
        for (total, n) in report.kernel_launches.iter_mut().zip(stats.launches) {
            *total += n;
        }
        failed
    }

    #[tracing::instrument(level = "debug", skip_all, fields(tile = tile.index))]
    fn render_tile(
        &self,
        queue: &mut dyn DeviceQueue,
        tile: &WorkTile,
        stats: &mut WorkerStats,
        radiance: &mut Vec<PathRadiance>,
    ) -> TileOutcome {
        let work_size = tile.work_size();
        let initialized = queue.copy_work_tile_to_device(tile)
            && queue.enqueue(DeviceKernel::IntegratorInitFromCamera, work_size, &INIT_FROM_CAMERA_ARGS)
            && queue.synchronize();
        if !initialized {
            tracing::warn!(queue = queue.name(), work_size, "tile init failed");
            return TileOutcome::Failed;
        }
        stats.rounds += 1;

        let capacity = queue.num_concurrent_states();
        loop {
            let counters = queue.queue_counters();
            if counters.is_empty() {
                break;
            }
            if self.cancel.is_cancelled() {
                return self.cancel_batch(queue, radiance);
            }

            let round = schedule_round(&counters);
            for &(kernel, n) in &round {
                let enqueued = queue.enqueue(DeviceKernel::IntegratorQueuedPathsArray, capacity, &queued_paths_args(kernel))
                    && queue.enqueue(kernel.into(), n as usize, &PATH_KERNEL_ARGS);
                if !enqueued {
                    tracing::warn!(queue = queue.name(), %kernel, "enqueue failed");
                    return TileOutcome::Failed;
                }
                stats.launches[kernel.index()] += 1;
            }
            if !queue.synchronize() {
                tracing::warn!(queue = queue.name(), round = stats.rounds, "synchronize failed");
                return TileOutcome::Failed;
            }
            stats.rounds += 1;
            tracing::trace!(kernels = round.len(), alive = counters.total(), "round");
        }

        self.accumulate(queue, radiance);
        TileOutcome::Completed
    }

    fn cancel_batch(&self, queue: &mut dyn DeviceQueue, radiance: &mut Vec<PathRadiance>) -> TileOutcome {
        let outcome = match self.cancel_policy {
            CancelPolicy::WritePartial => {
                self.accumulate(queue, radiance);
                TileOutcome::Partial
            }
            CancelPolicy::DiscardBatch => TileOutcome::Abandoned,
        };
        tracing::warn!(queue = queue.name(), ?outcome, "render cancelled mid-batch");

        let capacity = queue.num_concurrent_states();
        if !(queue.enqueue(DeviceKernel::IntegratorReset, capacity, &[]) && queue.synchronize()) {
            tracing::warn!(queue = queue.name(), "reset after cancel failed");
        }
        outcome
    }

    fn accumulate(&self, queue: &dyn DeviceQueue, radiance: &mut Vec<PathRadiance>) {
        queue.copy_path_radiance(radiance);
        for r in radiance.iter() {
            self.buffers.accumulate_sample(r.pixel, r.radiance);
        }
    }
}
