//! Math type re-exports and ray/sampling helpers.
//!
//! Vector types come from `glam`; radiance and throughput are plain `Vec3`
//! (linear RGB).

pub use glam::{Vec2, Vec3, UVec2, IVec2, Mat3};

use std::f32::consts::PI;

/// Offset applied to spawned ray origins to escape the surface they start on.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray segment `origin + t * dir` for `t` in `(0, t_max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub dir: Vec3,
    pub t_max: f32,
}

impl Ray {
    /// Unbounded ray. `dir` is normalized.
    #[inline]
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir: dir.normalize(), t_max: f32::INFINITY }
    }

    /// Ray limited to `t_max` (shadow rays towards a light).
    #[inline]
    pub fn segment(origin: Vec3, dir: Vec3, t_max: f32) -> Self {
        Self { origin, dir: dir.normalize(), t_max }
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self { origin: Vec3::ZERO, dir: Vec3::Z, t_max: f32::INFINITY }
    }
}

/// Build tangent and bitangent for a unit normal (Duff et al. 2017).
#[inline]
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

/// Cosine-weighted direction in the hemisphere around `n`.
#[inline]
pub fn sample_cos_hemisphere(n: Vec3, u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let x = r * phi.cos();
    let y = r * phi.sin();
    let z = (1.0 - u1).max(0.0).sqrt();
    let (t, b) = orthonormal_basis(n);
    (t * x + b * y + n * z).normalize()
}

/// Uniform direction on the unit sphere.
#[inline]
pub fn sample_uniform_sphere(u1: f32, u2: f32) -> Vec3 {
    let z = 1.0 - 2.0 * u1;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// True when every channel is zero (or negative).
#[inline]
pub fn is_black(v: Vec3) -> bool {
    v.max_element() <= 0.0
}
