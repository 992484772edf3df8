//! Host device. Each queue runs its launches with rayon, so invocations of one
//! launch really do complete concurrently and race on the batch counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rayon::prelude::*;

use super::kernel::{DeviceKernel, KernelArg, KernelLaunch, LaunchError};
use super::queue::{DeviceQueue, PathRadiance};
use super::{Device, DeviceInfo};
use crate::integrator::{RenderConfig, WorkTile};
use crate::kernel::{
    integrator_init_from_camera, integrator_path_kernel, KernelGlobals, KernelQueueCounters, PathKernel, PathSlot,
    QueueCounterSnapshot,
};
use crate::util::{self, Error, UVec2};

/// Queue layout of a [`CpuDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDeviceOptions {
    pub num_queues: usize,
    pub path_states_per_queue: usize,
    /// Record INIT/NEXT/TERMINATE events per path (tests, debugging).
    pub record_path_history: bool,
}

impl Default for CpuDeviceOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl CpuDeviceOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            num_queues: config.resolved_num_queues(),
            path_states_per_queue: config.path_states_per_queue,
            record_path_history: config.record_path_history,
        }
    }
}

#[derive(Debug)]
struct CpuDeviceInner {
    globals: RwLock<Arc<KernelGlobals>>,
    /// Bumped on every device data update; starts at 1.
    generation: AtomicU64,
    options: CpuDeviceOptions,
}

/// Host execution device.
#[derive(Debug, Clone)]
pub struct CpuDevice {
    inner: Arc<CpuDeviceInner>,
}

impl CpuDevice {
    pub fn new(globals: KernelGlobals, options: CpuDeviceOptions) -> util::Result<Self> {
        if options.num_queues == 0 {
            return Err(Error::NoQueues);
        }
        if options.path_states_per_queue == 0 {
            return Err(Error::invalid("path_states_per_queue must be > 0"));
        }
        Ok(Self {
            inner: Arc::new(CpuDeviceInner {
                globals: RwLock::new(Arc::new(globals)),
                generation: AtomicU64::new(1),
                options,
            }),
        })
    }

    pub fn options(&self) -> &CpuDeviceOptions {
        &self.inner.options
    }

    pub fn globals(&self) -> Arc<KernelGlobals> {
        self.inner.globals.read().clone()
    }

    /// Replace scene, camera and integrator data.
    ///
    /// Queues must run `init_execution` again before their next launch.
    pub fn set_globals(&self, globals: KernelGlobals) {
        *self.inner.globals.write() = Arc::new(globals);
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(generation, "device data updated");
    }
}

impl Device for CpuDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "CPU".to_string(),
            num_queues: self.inner.options.num_queues,
            path_states_per_queue: self.inner.options.path_states_per_queue,
        }
    }

    fn num_concurrent_queues(&self) -> usize {
        self.inner.options.num_queues
    }

    fn max_num_path_states(&self) -> usize {
        self.inner.options.path_states_per_queue
    }

    fn data_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    fn film_size(&self) -> UVec2 {
        let globals = self.inner.globals.read();
        UVec2::new(globals.camera.width, globals.camera.height)
    }

    fn create_queue(&self, index: usize) -> Box<dyn DeviceQueue> {
        Box::new(CpuQueue::new(&self.inner, index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueStatus {
    Uninitialized,
    Ready { generation: u64 },
    Unusable { generation: u64 },
}

#[derive(Debug, Clone, Copy)]
struct PendingLaunch {
    kernel: DeviceKernel,
    launch: KernelLaunch,
    work_size: usize,
}

/// Execution queue of a [`CpuDevice`].
///
/// Owns the integrator state array, the batch counters, the queued-paths
/// array and the uploaded work tile. Launches are recorded by `enqueue` and
/// executed in order by `synchronize`.
#[derive(Debug)]
pub struct CpuQueue {
    name: String,
    device: Weak<CpuDeviceInner>,
    capacity: usize,
    record_history: bool,

    status: QueueStatus,
    failed: bool,
    globals: Option<Arc<KernelGlobals>>,

    states: Vec<PathSlot>,
    counters: KernelQueueCounters,
    queued_paths: Vec<u32>,
    /// Kernel the queued-paths array was gathered for; cleared by any launch
    /// that moves paths.
    queued_paths_kernel: Option<PathKernel>,
    selected: Vec<bool>,
    work_tile: Option<WorkTile>,
    batch_size: usize,

    pending: Vec<PendingLaunch>,
}

impl CpuQueue {
    fn new(device: &Arc<CpuDeviceInner>, index: usize) -> Self {
        Self {
            name: format!("cpu-queue-{index}"),
            device: Arc::downgrade(device),
            capacity: device.options.path_states_per_queue,
            record_history: device.options.record_path_history,
            status: QueueStatus::Uninitialized,
            failed: false,
            globals: None,
            states: Vec::new(),
            counters: KernelQueueCounters::new(),
            queued_paths: Vec::new(),
            queued_paths_kernel: None,
            selected: Vec::new(),
            work_tile: None,
            batch_size: 0,
            pending: Vec::new(),
        }
    }

    fn check_ready(&self) -> Result<(), LaunchError> {
        let current = self.device.upgrade().map(|d| d.generation.load(Ordering::Acquire));
        match self.status {
            QueueStatus::Ready { generation } if Some(generation) == current => Ok(()),
            QueueStatus::Unusable { .. } => Err(LaunchError::Unusable),
            _ => Err(LaunchError::NotInitialized),
        }
    }

    fn check_enqueue(&self, kernel: DeviceKernel, work_size: usize, args: &[KernelArg]) -> Result<KernelLaunch, LaunchError> {
        if self.failed {
            return Err(LaunchError::PriorFailure);
        }
        self.check_ready()?;
        let launch = KernelLaunch::decode(kernel, args)?;

        if work_size > self.capacity {
            return Err(LaunchError::WorkSize { kernel, work_size, limit: self.capacity });
        }
        if launch == KernelLaunch::InitFromCamera {
            let tile = self.work_tile.ok_or(LaunchError::NoWorkTile { kernel })?;
            if work_size != tile.work_size() {
                return Err(LaunchError::WorkSize { kernel, work_size, limit: tile.work_size() });
            }
        }
        Ok(launch)
    }

    fn fail(&mut self, err: LaunchError) {
        if err != LaunchError::PriorFailure {
            tracing::warn!(queue = %self.name, error = %err, "kernel launch failed");
        }
        self.failed = true;
        self.pending.clear();
    }

    fn execute(&mut self, p: PendingLaunch) -> Result<(), LaunchError> {
        let kg = self.globals.clone().ok_or(LaunchError::NotInitialized)?;
        let counters = &self.counters;

        match p.launch {
            KernelLaunch::InitFromCamera => {
                let alive = counters.snapshot().total();
                if alive != 0 {
                    return Err(LaunchError::BatchNotDrained { kernel: p.kernel, alive });
                }
                let tile = self.work_tile.ok_or(LaunchError::NoWorkTile { kernel: p.kernel })?;
                self.states[..p.work_size]
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, slot)| integrator_init_from_camera(&kg, slot, counters, &tile, i));
                self.batch_size = p.work_size;
                self.queued_paths_kernel = None;
            }
            KernelLaunch::QueuedPathsArray(kernel) => {
                self.queued_paths = self.states[..p.work_size]
                    .par_iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.is_queued_on(kernel))
                    .map(|(i, _)| i as u32)
                    .collect();
                self.queued_paths_kernel = Some(kernel);
            }
            KernelLaunch::Path(kernel) => {
                if self.queued_paths_kernel != Some(kernel) {
                    return Err(LaunchError::StaleQueuedPaths {
                        kernel: p.kernel,
                        gathered: self.queued_paths_kernel,
                        expected: kernel,
                    });
                }
                if p.work_size > self.queued_paths.len() {
                    return Err(LaunchError::WorkSize {
                        kernel: p.kernel,
                        work_size: p.work_size,
                        limit: self.queued_paths.len(),
                    });
                }
                self.selected.clear();
                self.selected.resize(self.states.len(), false);
                for &i in &self.queued_paths[..p.work_size] {
                    self.selected[i as usize] = true;
                }
                self.states
                    .par_iter_mut()
                    .zip(self.selected.par_iter())
                    .filter(|(_, selected)| **selected)
                    .for_each(|(slot, _)| integrator_path_kernel(&kg, kernel, slot, counters));
                self.queued_paths_kernel = None;
            }
            KernelLaunch::Reset => {
                let n = p.work_size.max(self.batch_size);
                self.states[..n].par_iter_mut().for_each(PathSlot::clear);
                counters.reset();
                self.batch_size = 0;
                self.queued_paths.clear();
                self.queued_paths_kernel = None;
            }
        }
        Ok(())
    }
}

impl DeviceQueue for CpuQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_concurrent_states(&self) -> usize {
        self.capacity
    }

    fn init_execution(&mut self) {
        let Some(device) = self.device.upgrade() else {
            self.status = QueueStatus::Unusable { generation: 0 };
            return;
        };
        let generation = device.generation.load(Ordering::Acquire);
        match self.status {
            QueueStatus::Ready { generation: g } | QueueStatus::Unusable { generation: g } if g == generation => {
                tracing::debug!(queue = %self.name, generation, "redundant init_execution");
                self.status = QueueStatus::Unusable { generation };
                return;
            }
            _ => {}
        }

        self.globals = Some(device.globals.read().clone());
        if self.states.len() != self.capacity {
            self.states = (0..self.capacity).map(|_| PathSlot::new(self.record_history)).collect();
        } else {
            self.states.iter_mut().for_each(PathSlot::clear);
        }
        self.counters.reset();
        self.queued_paths.clear();
        self.queued_paths_kernel = None;
        self.work_tile = None;
        self.batch_size = 0;
        self.pending.clear();
        self.failed = false;
        self.status = QueueStatus::Ready { generation };
        tracing::trace!(queue = %self.name, generation, "queue initialized");
    }

    fn copy_work_tile_to_device(&mut self, tile: &WorkTile) -> bool {
        if self.failed || self.check_ready().is_err() {
            return false;
        }
        self.work_tile = Some(*tile);
        true
    }

    fn enqueue(&mut self, kernel: DeviceKernel, work_size: usize, args: &[KernelArg]) -> bool {
        match self.check_enqueue(kernel, work_size, args) {
            Ok(launch) => {
                self.pending.push(PendingLaunch { kernel, launch, work_size });
                true
            }
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    fn synchronize(&mut self) -> bool {
        if self.failed {
            self.pending.clear();
            return false;
        }
        if let Err(err) = self.check_ready() {
            self.fail(err);
            return false;
        }
        let mut pending = std::mem::take(&mut self.pending);
        for launch in pending.drain(..) {
            if let Err(err) = self.execute(launch) {
                self.fail(err);
                return false;
            }
        }
        self.pending = pending;
        true
    }

    fn queue_counters(&self) -> QueueCounterSnapshot {
        self.counters.snapshot()
    }

    fn copy_path_radiance(&self, out: &mut Vec<PathRadiance>) {
        out.clear();
        out.extend(self.states[..self.batch_size].iter().map(|slot| PathRadiance {
            pixel: slot.main.pixel,
            sample: slot.main.sample,
            radiance: slot.main.radiance,
        }));
    }

    fn path_states(&self) -> &[PathSlot] {
        &self.states[..self.batch_size]
    }
}
