//! Execution devices and queues.
//!
//! A [`Device`] owns kernel data (scene, camera, integrator settings) and hands
//! out [`DeviceQueue`]s. Queues never own the device; they hold a weak
//! reference and stop working once it is gone.

mod cpu;
mod kernel;
mod queue;

pub use cpu::{CpuDevice, CpuDeviceOptions, CpuQueue};
pub use kernel::{
    queued_paths_args, DeviceKernel, DeviceMemory, KernelArg, KernelLaunch, LaunchError, INIT_FROM_CAMERA_ARGS,
    PATH_KERNEL_ARGS,
};
pub use queue::{DeviceQueue, PathRadiance};

use crate::util::UVec2;

/// Static description of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub num_queues: usize,
    pub path_states_per_queue: usize,
}

/// Compute device the coordinator renders on.
pub trait Device: Send + Sync {
    fn info(&self) -> DeviceInfo;

    /// Queues that can execute at the same time.
    fn num_concurrent_queues(&self) -> usize;

    /// Path states one queue holds; tiles are sized to fill it.
    fn max_num_path_states(&self) -> usize;

    /// Changes whenever device data is synchronized. Queues must run
    /// `init_execution` once per generation.
    fn data_generation(&self) -> u64;

    /// Resolution of the camera in the loaded kernel data.
    fn film_size(&self) -> UVec2;

    fn create_queue(&self, index: usize) -> Box<dyn DeviceQueue>;
}
