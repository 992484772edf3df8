//! Execution queue abstraction.

use super::kernel::{DeviceKernel, KernelArg};
use crate::integrator::WorkTile;
use crate::kernel::{PathSlot, QueueCounterSnapshot};
use crate::util::{UVec2, Vec3};

/// Radiance of one path of the current batch, read back to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRadiance {
    /// Pixel in buffer coordinates.
    pub pixel: UVec2,
    pub sample: u32,
    pub radiance: Vec3,
}

/// One ordered command stream on a device.
///
/// Launches execute in enqueue order; nothing is guaranteed complete until
/// [`synchronize`](Self::synchronize) returns `true`. Failures are sticky: once
/// a launch fails, every later `enqueue` and `synchronize` returns `false`
/// until the next successful [`init_execution`](Self::init_execution) for new
/// device data. Host reads stay available for diagnostics.
pub trait DeviceQueue: Send {
    fn name(&self) -> &str;

    /// Path states this queue can hold in one batch.
    fn num_concurrent_states(&self) -> usize;

    /// Prepare for a new batch after device data was synchronized.
    ///
    /// Must be called exactly once per device data generation. A redundant
    /// call leaves the queue unusable; it reports nothing.
    fn init_execution(&mut self);

    /// Upload the tile read by the camera init kernel.
    fn copy_work_tile_to_device(&mut self, tile: &WorkTile) -> bool;

    /// Schedule `work_size` invocations of `kernel`.
    ///
    /// Returns `false` if this or any earlier launch failed.
    fn enqueue(&mut self, kernel: DeviceKernel, work_size: usize, args: &[KernelArg]) -> bool;

    /// Block until every enqueued launch finished; `false` if any failed.
    fn synchronize(&mut self) -> bool;

    /// Per-kernel queued path counts of the current batch.
    fn queue_counters(&self) -> QueueCounterSnapshot;

    /// Radiance gathered so far by every path of the current batch.
    fn copy_path_radiance(&self, out: &mut Vec<PathRadiance>);

    /// Path states of the current batch.
    fn path_states(&self) -> &[PathSlot];
}
