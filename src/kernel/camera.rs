//! Pinhole camera used by the init-from-camera kernel.

use crate::util::{Ray, Vec2, Vec3};

/// Perspective pinhole camera over the full image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    tan_half_fov: f32,
    /// Full image width in pixels.
    pub width: u32,
    /// Full image height in pixels.
    pub height: u32,
}

impl Camera {
    /// Camera at `eye` looking at `target` with vertical field of view in degrees.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, fov_y_degrees: f32, width: u32, height: u32) -> Self {
        let forward = (target - eye).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Self {
            position: eye,
            forward,
            right,
            up,
            tan_half_fov: (fov_y_degrees.to_radians() * 0.5).tan(),
            width: width.max(1),
            height: height.max(1),
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Primary ray through pixel `(x, y)` offset by `jitter` from the pixel center.
    ///
    /// `jitter` is in pixels, `(0, 0)` is the center.
    pub fn generate_ray(&self, x: u32, y: u32, jitter: Vec2) -> Ray {
        let fx = x as f32 + 0.5 + jitter.x;
        let fy = y as f32 + 0.5 + jitter.y;
        let ndc_x = (2.0 * fx / self.width as f32 - 1.0) * self.aspect() * self.tan_half_fov;
        let ndc_y = (1.0 - 2.0 * fy / self.height as f32) * self.tan_half_fov;
        Ray::new(self.position, self.forward + self.right * ndc_x + self.up * ndc_y)
    }
}
