//! Scene collaborator boundary.
//!
//! The engine never looks at geometry or materials directly. Kernels call a
//! [`Scene`] to intersect rays and to evaluate shading, and get back an
//! [`Intersection`] or a [`ShadingResult`].
//!
//! [`SimpleScene`] is a small analytic implementation (spheres, planes, point
//! lights) used by the CLI, the tests and anyone who wants to drive the engine
//! without a real scene database.

mod simple;

pub use simple::{Material, MaterialId, PointLight, Shape, SimpleScene};

use crate::kernel::BounceRng;
use crate::util::{Ray, Vec3};

/// What a ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// Opaque or scattering surface, shaded by `shade_surface`.
    Surface,
    /// Boundary of a participating medium, shaded by `shade_volume`.
    Volume,
}

/// Closest hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t: f32,
    pub position: Vec3,
    /// Outward geometric normal.
    pub normal: Vec3,
    /// Ray arrived from the side the normal points to.
    pub front_face: bool,
    pub object: u32,
    pub kind: HitKind,
}

impl Intersection {
    /// Normal flipped to face the incoming ray.
    #[inline]
    pub fn facing_normal(&self) -> Vec3 {
        if self.front_face { self.normal } else { -self.normal }
    }
}

/// Shading inputs for one path at one hit.
#[derive(Debug, Clone, Copy)]
pub struct ShaderContext<'a> {
    pub ray: &'a Ray,
    pub isect: &'a Intersection,
    pub bounce: u32,
    /// The hit is the exit point of a subsurface walk.
    pub exiting_subsurface: bool,
}

/// Next-event-estimation request: a visibility ray and the radiance it
/// carries if unoccluded, already weighted by BSDF, geometry term and pdf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub ray: Ray,
    pub radiance: Vec3,
}

/// How the path continues after shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Continuation {
    /// Scatter event: counts as a bounce, goes back to intersect_closest.
    Bounce { ray: Ray, weight: Vec3 },
    /// Pass through a boundary without scattering (no bounce).
    Transmit { ray: Ray, weight: Vec3 },
    /// Enter the object interior: counts as a bounce, goes to intersect_subsurface.
    Subsurface { ray: Ray, weight: Vec3 },
    /// Path ends here.
    Absorb,
}

/// Result of a shading evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingResult {
    pub emission: Vec3,
    pub light: Option<LightSample>,
    pub continuation: Continuation,
}

impl ShadingResult {
    pub fn absorb() -> Self {
        Self { emission: Vec3::ZERO, light: None, continuation: Continuation::Absorb }
    }
}

/// Scene queries consumed by the integrator kernels.
pub trait Scene: Send + Sync {
    /// Closest hit within `(0, ray.t_max)`.
    fn intersect(&self, ray: &Ray) -> Option<Intersection>;

    /// Any surface hit within `(0, ray.t_max)`. Media do not block shadow rays.
    fn occluded(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some_and(|h| h.kind == HitKind::Surface)
    }

    /// Exit point of a subsurface walk started at `entry`.
    fn intersect_subsurface(&self, ray: &Ray, entry: &Intersection) -> Option<Intersection> {
        self.intersect(ray).filter(|h| h.object == entry.object)
    }

    /// Radiance arriving along a ray that left the scene.
    fn background(&self, ray: &Ray) -> Vec3;

    fn shade_surface(&self, sd: &ShaderContext<'_>, rng: &mut BounceRng) -> ShadingResult;

    fn shade_volume(&self, sd: &ShaderContext<'_>, rng: &mut BounceRng) -> ShadingResult;
}
