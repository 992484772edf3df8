//! Kernel layer: per-path state, queue counters and the integrator kernels.
//!
//! ## Control flow
//! ```text
//! init_from_camera ─▶ intersect_closest ─▶ shade_background ─▶ ✕
//!                        ▲      │
//!                        │      ├─▶ shade_surface ─┬─▶ intersect_closest (next bounce)
//!                        │      │                  ├─▶ intersect_subsurface ─▶ shade_surface
//!                        │      │                  └─▶ ✕
//!                        │      └─▶ shade_volume ──┬─▶ intersect_closest
//!                        └─────────────────────────┘  └─▶ ✕
//!
//! shade_surface / shade_volume ╌▶ intersect_shadow ─▶ shade_shadow ─▶ ✕
//!                                        └─▶ ✕ (occluded)
//! ```
//!
//! Everything here runs per path; the device layer decides which paths a
//! launch covers and runs them in parallel.

mod camera;
mod globals;
mod integrator;
mod path_state;
mod queue_counter;
mod random;
mod types;

pub use camera::Camera;
pub use globals::{IntegratorParams, KernelGlobals};
pub use integrator::{
    integrator_init_from_camera, integrator_path_kernel, MainTransition, ShadeOutcome, ShadowRequest,
    ShadowTransition,
};
pub use path_state::{MainPath, PathEvent, PathFlow, PathSlot, ShadowPath};
pub use queue_counter::{KernelQueueCounters, QueueCounterSnapshot};
pub use random::{BounceRng, PathRng};
pub use types::{MainKernel, PathKernel, ShadowKernel};
