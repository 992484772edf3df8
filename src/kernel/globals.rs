//! Read-only data shared by every kernel launch.

use std::fmt;
use std::sync::Arc;

use super::camera::Camera;
use crate::scene::Scene;

/// Integrator settings consumed by kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorParams {
    /// Scatter events allowed after the camera hit. The light sample taken at
    /// the last allowed scatter is dropped, so 0 keeps only emission and
    /// background seen directly from the camera.
    pub max_bounce: u32,
    /// Bounce from which Russian roulette may kill paths.
    pub min_bounce: u32,
    pub seed: u32,
    /// Pixel filter width in pixels; 0 samples pixel centers.
    pub filter_width: f32,
}

impl Default for IntegratorParams {
    fn default() -> Self {
        Self {
            max_bounce: 8,
            min_bounce: 3,
            seed: 0,
            filter_width: 1.0,
        }
    }
}

/// Scene, camera and integrator settings as seen by the device.
#[derive(Clone)]
pub struct KernelGlobals {
    pub scene: Arc<dyn Scene>,
    pub camera: Camera,
    pub integrator: IntegratorParams,
}

impl KernelGlobals {
    pub fn new(scene: Arc<dyn Scene>, camera: Camera, integrator: IntegratorParams) -> Self {
        Self { scene, camera, integrator }
    }
}

impl fmt::Debug for KernelGlobals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelGlobals")
            .field("camera", &self.camera)
            .field("integrator", &self.integrator)
            .finish_non_exhaustive()
    }
}
