//! # Wavefront
//!
//! Wavefront path-tracing execution engine.
//!
//! A large population of independent light paths is driven through a set of
//! compute kernels (intersection, shading, shadow testing) on one or more
//! execution queues. Every path is queued on exactly one kernel at a time;
//! per-queue atomic counters track how many paths wait on each kernel and tell
//! the host which kernels to launch next and when a batch has drained.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, rays
//! - [`kernel`] - Per-path state machine, queue counters, kernel bodies
//! - [`scene`] - Scene boundary trait and a small analytic scene
//! - [`device`] - Devices and execution queues (host implementation on rayon)
//! - [`integrator`] - Tiles, work scheduler, render buffers, coordinator
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wavefront::prelude::*;
//!
//! let config = RenderConfig { width: 64, height: 64, samples: 4, ..Default::default() };
//! let camera = Camera::look_at(Vec3::new(0.0, 1.0, 4.0), Vec3::ZERO, Vec3::Y, 40.0, 64, 64);
//! let globals = KernelGlobals::new(Arc::new(SimpleScene::new(Vec3::splat(0.5))), camera, config.integrator_params());
//! let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config))?);
//! let buffers = Arc::new(RenderBuffers::new(BufferParams::new(64, 64))?);
//!
//! let mut work = PathTraceWorkTiled::new(device, buffers.clone(), config)?;
//! work.render().into_result()?;
//! let rgb = buffers.mean_rgb();
//! ```

pub mod device;
pub mod integrator;
pub mod kernel;
pub mod scene;
pub mod util;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::device::{CpuDevice, CpuDeviceOptions, Device, DeviceQueue};
    pub use crate::integrator::{
        BufferParams, CancelPolicy, CancelToken, FailurePolicy, PathTraceWorkTiled, RenderBuffers, RenderConfig,
        RenderReport, RenderStatus, WorkScheduler, WorkTile,
    };
    pub use crate::kernel::{Camera, IntegratorParams, KernelGlobals, PathKernel};
    pub use crate::scene::{Material, Scene, SimpleScene};
    pub use crate::util::{Error, Result, UVec2, Vec3};
}
