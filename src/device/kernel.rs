//! Device kernel identifiers and launch arguments.

use std::fmt;

use thiserror::Error;

use crate::kernel::PathKernel;

/// Every kernel a queue can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKernel {
    IntegratorInitFromCamera,
    IntegratorIntersectClosest,
    IntegratorIntersectShadow,
    IntegratorIntersectSubsurface,
    IntegratorShadeBackground,
    IntegratorShadeSurface,
    IntegratorShadeVolume,
    IntegratorShadeShadow,
    /// Gathers indices of paths queued on one path kernel.
    IntegratorQueuedPathsArray,
    /// Clears path states and counters of an abandoned batch.
    IntegratorReset,
}

impl DeviceKernel {
    /// Path kernel run by this launch, if any.
    pub fn path_kernel(self) -> Option<PathKernel> {
        Some(match self {
            DeviceKernel::IntegratorIntersectClosest => PathKernel::IntersectClosest,
            DeviceKernel::IntegratorIntersectShadow => PathKernel::IntersectShadow,
            DeviceKernel::IntegratorIntersectSubsurface => PathKernel::IntersectSubsurface,
            DeviceKernel::IntegratorShadeBackground => PathKernel::ShadeBackground,
            DeviceKernel::IntegratorShadeSurface => PathKernel::ShadeSurface,
            DeviceKernel::IntegratorShadeVolume => PathKernel::ShadeVolume,
            DeviceKernel::IntegratorShadeShadow => PathKernel::ShadeShadow,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            DeviceKernel::IntegratorInitFromCamera => "integrator_init_from_camera",
            DeviceKernel::IntegratorIntersectClosest => "integrator_intersect_closest",
            DeviceKernel::IntegratorIntersectShadow => "integrator_intersect_shadow",
            DeviceKernel::IntegratorIntersectSubsurface => "integrator_intersect_subsurface",
            DeviceKernel::IntegratorShadeBackground => "integrator_shade_background",
            DeviceKernel::IntegratorShadeSurface => "integrator_shade_surface",
            DeviceKernel::IntegratorShadeVolume => "integrator_shade_volume",
            DeviceKernel::IntegratorShadeShadow => "integrator_shade_shadow",
            DeviceKernel::IntegratorQueuedPathsArray => "integrator_queued_paths_array",
            DeviceKernel::IntegratorReset => "integrator_reset",
        }
    }
}

impl From<PathKernel> for DeviceKernel {
    fn from(kernel: PathKernel) -> Self {
        match kernel {
            PathKernel::IntersectClosest => DeviceKernel::IntegratorIntersectClosest,
            PathKernel::IntersectShadow => DeviceKernel::IntegratorIntersectShadow,
            PathKernel::IntersectSubsurface => DeviceKernel::IntegratorIntersectSubsurface,
            PathKernel::ShadeBackground => DeviceKernel::IntegratorShadeBackground,
            PathKernel::ShadeSurface => DeviceKernel::IntegratorShadeSurface,
            PathKernel::ShadeVolume => DeviceKernel::IntegratorShadeVolume,
            PathKernel::ShadeShadow => DeviceKernel::IntegratorShadeShadow,
        }
    }
}

impl fmt::Display for DeviceKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Queue-resident buffers a kernel argument can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMemory {
    WorkTile,
    QueuedPathsArray,
    PathState,
    QueueCounter,
}

/// One kernel argument: a scalar or a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelArg {
    Int(i32),
    Memory(DeviceMemory),
}

/// Why a launch was rejected or failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("queue is not initialized for the current device data")]
    NotInitialized,

    #[error("queue is unusable after a redundant init_execution")]
    Unusable,

    #[error("an earlier launch on this queue failed")]
    PriorFailure,

    #[error("{kernel}: bad arguments {args:?}")]
    BadArguments { kernel: DeviceKernel, args: Vec<KernelArg> },

    #[error("{kernel}: work size {work_size} exceeds {limit}")]
    WorkSize { kernel: DeviceKernel, work_size: usize, limit: usize },

    #[error("{kernel}: no work tile copied to the device")]
    NoWorkTile { kernel: DeviceKernel },

    #[error("{kernel}: previous batch still has {alive} queued path(s)")]
    BatchNotDrained { kernel: DeviceKernel, alive: u64 },

    #[error("{kernel}: queued paths array holds {gathered:?}, not {expected}")]
    StaleQueuedPaths {
        kernel: DeviceKernel,
        gathered: Option<PathKernel>,
        expected: PathKernel,
    },
}

/// A launch after argument decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelLaunch {
    InitFromCamera,
    QueuedPathsArray(PathKernel),
    Path(PathKernel),
    Reset,
}

impl KernelLaunch {
    /// Check `args` against the kernel's signature.
    pub fn decode(kernel: DeviceKernel, args: &[KernelArg]) -> Result<Self, LaunchError> {
        use DeviceMemory as M;
        use KernelArg::{Int, Memory};

        let launch = match (kernel, args) {
            (DeviceKernel::IntegratorInitFromCamera, [Memory(M::WorkTile)]) => Some(KernelLaunch::InitFromCamera),
            (DeviceKernel::IntegratorQueuedPathsArray, [Int(k), Memory(M::QueuedPathsArray)]) => usize::try_from(*k)
                .ok()
                .and_then(PathKernel::from_index)
                .map(KernelLaunch::QueuedPathsArray),
            (DeviceKernel::IntegratorReset, []) => Some(KernelLaunch::Reset),
            (k, [Memory(M::QueuedPathsArray)]) => k.path_kernel().map(KernelLaunch::Path),
            _ => None,
        };
        launch.ok_or_else(|| LaunchError::BadArguments { kernel, args: args.to_vec() })
    }
}

/// Arguments of a queued-paths-array launch gathering `kernel`.
pub fn queued_paths_args(kernel: PathKernel) -> [KernelArg; 2] {
    [KernelArg::Int(kernel.index() as i32), KernelArg::Memory(DeviceMemory::QueuedPathsArray)]
}

/// Arguments of a path kernel launch.
pub const PATH_KERNEL_ARGS: [KernelArg; 1] = [KernelArg::Memory(DeviceMemory::QueuedPathsArray)];

/// Arguments of the camera init launch.
pub const INIT_FROM_CAMERA_ARGS: [KernelArg; 1] = [KernelArg::Memory(DeviceMemory::WorkTile)];
