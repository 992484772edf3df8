//! Analytic scene: spheres, planes and point lights.

use std::f32::consts::{FRAC_1_PI, PI};

use crate::kernel::BounceRng;
use crate::util::{
    is_black, sample_cos_hemisphere, sample_uniform_sphere, Ray, Vec3, RAY_EPSILON,
};

use super::{Continuation, HitKind, Intersection, LightSample, Scene, ShaderContext, ShadingResult};

/// Index into [`SimpleScene`] materials.
pub type MaterialId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Lambertian reflector.
    Diffuse { albedo: Vec3 },
    /// Front-face emitter, absorbs everything it is hit with.
    Emissive { radiance: Vec3 },
    /// Enters the object, exits on the far side and reflects diffusely there.
    Subsurface { albedo: Vec3 },
    /// Homogeneous medium with isotropic phase function.
    Volume { density: f32, albedo: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    /// Infinite plane; `normal` is the outward side.
    Plane { point: Vec3, normal: Vec3 },
}

impl Shape {
    /// Closest hit in `(RAY_EPSILON, t_max)` as `(t, outward normal)`.
    fn intersect(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match *self {
            Shape::Sphere { center, radius } => {
                let oc = ray.origin - center;
                let b = oc.dot(ray.dir);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let t = [-b - sq, -b + sq]
                    .into_iter()
                    .find(|&t| t > RAY_EPSILON && t < ray.t_max)?;
                let normal = (ray.at(t) - center) / radius;
                Some((t, normal))
            }
            Shape::Plane { point, normal } => {
                let denom = normal.dot(ray.dir);
                if denom.abs() < 1e-8 {
                    return None;
                }
                let t = (point - ray.origin).dot(normal) / denom;
                (t > RAY_EPSILON && t < ray.t_max).then_some((t, normal))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Object {
    shape: Shape,
    material: MaterialId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Radiant intensity (W/sr per channel).
    pub intensity: Vec3,
}

/// Small scene built in code.
#[derive(Debug, Clone, Default)]
pub struct SimpleScene {
    objects: Vec<Object>,
    materials: Vec<Material>,
    lights: Vec<PointLight>,
    background: Vec3,
}

impl SimpleScene {
    /// Empty scene with a constant background.
    pub fn new(background: Vec3) -> Self {
        Self { background, ..Default::default() }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        (self.materials.len() - 1) as MaterialId
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: MaterialId) -> &mut Self {
        self.objects.push(Object { shape: Shape::Sphere { center, radius }, material });
        self
    }

    pub fn add_plane(&mut self, point: Vec3, normal: Vec3, material: MaterialId) -> &mut Self {
        self.objects.push(Object {
            shape: Shape::Plane { point, normal: normal.normalize() },
            material,
        });
        self
    }

    pub fn add_light(&mut self, position: Vec3, intensity: Vec3) -> &mut Self {
        self.lights.push(PointLight { position, intensity });
        self
    }

    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    fn material(&self, object: u32) -> Material {
        let id = self.objects[object as usize].material;
        self.materials[id as usize]
    }

    fn hit_kind(material: Material) -> HitKind {
        match material {
            Material::Volume { .. } => HitKind::Volume,
            _ => HitKind::Surface,
        }
    }

    fn make_isect(&self, ray: &Ray, object: u32, t: f32, normal: Vec3) -> Intersection {
        Intersection {
            t,
            position: ray.at(t),
            normal,
            front_face: normal.dot(ray.dir) < 0.0,
            object,
            kind: Self::hit_kind(self.material(object)),
        }
    }

    /// Pick one light and build its shadow ray from `p`.
    ///
    /// `weight` maps incident radiance to outgoing (BSDF or phase function);
    /// `normal` is `None` for scattering inside a medium (no cosine term).
    fn sample_light(&self, p: Vec3, normal: Option<Vec3>, weight: Vec3, rng: &mut BounceRng) -> Option<LightSample> {
        let pick = rng.next_1d();
        if self.lights.is_empty() {
            return None;
        }
        let n = self.lights.len();
        let light = &self.lights[((pick * n as f32) as usize).min(n - 1)];

        let to_light = light.position - p;
        let dist2 = to_light.length_squared();
        if dist2 <= 0.0 {
            return None;
        }
        let dist = dist2.sqrt();
        let dir = to_light / dist;
        let cos = match normal {
            Some(nrm) => nrm.dot(dir),
            None => 1.0,
        };
        if cos <= 0.0 {
            return None;
        }
        let radiance = light.intensity / dist2 * weight * cos * n as f32;
        if is_black(radiance) {
            return None;
        }
        let origin = p + normal.unwrap_or(Vec3::ZERO) * RAY_EPSILON;
        Some(LightSample {
            ray: Ray::segment(origin, dir, (dist - 2.0 * RAY_EPSILON).max(0.0)),
            radiance,
        })
    }

    fn shade_diffuse(&self, p: Vec3, n: Vec3, albedo: Vec3, rng: &mut BounceRng) -> ShadingResult {
        let light = self.sample_light(p, Some(n), albedo * FRAC_1_PI, rng);
        let u = rng.next_2d();
        let dir = sample_cos_hemisphere(n, u.x, u.y);
        ShadingResult {
            emission: Vec3::ZERO,
            light,
            continuation: Continuation::Bounce { ray: Ray::new(p + n * RAY_EPSILON, dir), weight: albedo },
        }
    }
}

impl Scene for SimpleScene {
    fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let mut closest: Option<(u32, f32, Vec3)> = None;
        let mut probe = *ray;
        for (i, obj) in self.objects.iter().enumerate() {
            if let Some((t, normal)) = obj.shape.intersect(&probe) {
                probe.t_max = t;
                closest = Some((i as u32, t, normal));
            }
        }
        closest.map(|(obj, t, normal)| self.make_isect(ray, obj, t, normal))
    }

    fn intersect_subsurface(&self, ray: &Ray, entry: &Intersection) -> Option<Intersection> {
        let obj = self.objects.get(entry.object as usize)?;
        let (t, normal) = obj.shape.intersect(ray)?;
        let isect = self.make_isect(ray, entry.object, t, normal);
        // Only an exit through the back side counts.
        (!isect.front_face).then_some(isect)
    }

    fn background(&self, _ray: &Ray) -> Vec3 {
        self.background
    }

    fn shade_surface(&self, sd: &ShaderContext<'_>, rng: &mut BounceRng) -> ShadingResult {
        let isect = sd.isect;
        match self.material(isect.object) {
            Material::Diffuse { albedo } => {
                self.shade_diffuse(isect.position, isect.facing_normal(), albedo, rng)
            }
            Material::Emissive { radiance } => ShadingResult {
                emission: if isect.front_face { radiance } else { Vec3::ZERO },
                light: None,
                continuation: Continuation::Absorb,
            },
            Material::Subsurface { albedo } => {
                if sd.exiting_subsurface {
                    // Leave through the outward side.
                    self.shade_diffuse(isect.position, isect.normal, albedo, rng)
                } else {
                    let inward = -isect.facing_normal();
                    let u = rng.next_2d();
                    let dir = sample_cos_hemisphere(inward, u.x, u.y);
                    ShadingResult {
                        emission: Vec3::ZERO,
                        light: None,
                        continuation: Continuation::Subsurface {
                            ray: Ray::new(isect.position + inward * RAY_EPSILON, dir),
                            weight: albedo,
                        },
                    }
                }
            }
            Material::Volume { .. } => ShadingResult {
                emission: Vec3::ZERO,
                light: None,
                continuation: Continuation::Transmit {
                    ray: Ray::new(isect.position + sd.ray.dir * RAY_EPSILON, sd.ray.dir),
                    weight: Vec3::ONE,
                },
            },
        }
    }

    fn shade_volume(&self, sd: &ShaderContext<'_>, rng: &mut BounceRng) -> ShadingResult {
        let isect = sd.isect;
        let ray = sd.ray;
        let Material::Volume { density, albedo } = self.material(isect.object) else {
            return ShadingResult::absorb();
        };
        let transmit = Continuation::Transmit {
            ray: Ray::new(isect.position + ray.dir * RAY_EPSILON, ray.dir),
            weight: Vec3::ONE,
        };
        if isect.front_face || density <= 0.0 {
            // Entering: the medium segment is handled when the exit is hit.
            return ShadingResult { emission: Vec3::ZERO, light: None, continuation: transmit };
        }

        // Ray origin is inside the medium and `isect` is where it leaves.
        let u = rng.next_1d();
        let distance = -(1.0 - u).ln() / density;
        if distance >= isect.t {
            return ShadingResult { emission: Vec3::ZERO, light: None, continuation: transmit };
        }

        let p = ray.at(distance);
        let phase = 1.0 / (4.0 * PI);
        let light = self.sample_light(p, None, albedo * phase, rng);
        let u = rng.next_2d();
        ShadingResult {
            emission: Vec3::ZERO,
            light,
            continuation: Continuation::Bounce {
                ray: Ray::new(p, sample_uniform_sphere(u.x, u.y)),
                weight: albedo,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::PathRng;

    fn floor_scene() -> SimpleScene {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let white = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.5) });
        scene.add_plane(Vec3::ZERO, Vec3::Y, white);
        scene.add_light(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(4.0));
        scene
    }

    #[test]
    fn test_sphere_hit_front_and_back() {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let m = scene.add_material(Material::Diffuse { albedo: Vec3::ONE });
        scene.add_sphere(Vec3::ZERO, 1.0, m);

        let outside = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        let hit = scene.intersect(&outside).expect("hit from outside");
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!(hit.front_face);
        assert_eq!(hit.kind, HitKind::Surface);

        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = scene.intersect(&inside).expect("hit from inside");
        assert!((hit.t - 1.0).abs() < 1e-4);
        assert!(!hit.front_face);
        assert!((hit.normal - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_closest_of_many() {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let m = scene.add_material(Material::Diffuse { albedo: Vec3::ONE });
        scene.add_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, m);
        scene.add_sphere(Vec3::new(0.0, 0.0, -4.0), 1.0, m);
        let hit = scene.intersect(&Ray::new(Vec3::ZERO, -Vec3::Z)).unwrap();
        assert_eq!(hit.object, 1);
        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_plane_shadow_ray() {
        let scene = floor_scene();
        let down = Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        assert!(scene.occluded(&down));
        let up = Ray::segment(Vec3::new(0.0, 0.1, 0.0), Vec3::Y, 1.0);
        assert!(!scene.occluded(&up));
    }

    #[test]
    fn test_diffuse_light_sample() {
        let scene = floor_scene();
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y);
        let isect = scene.intersect(&ray).unwrap();
        let sd = ShaderContext { ray: &ray, isect: &isect, bounce: 0, exiting_subsurface: false };
        let mut rng = PathRng::new(0, 0, 0, 0).bounce(0);
        let result = scene.shade_surface(&sd, &mut rng);

        let light = result.light.expect("light above the floor");
        // I / d^2 * albedo / pi * cos = 4 / 4 * 0.5 / pi
        let expected = 0.5 * FRAC_1_PI;
        assert!((light.radiance.x - expected).abs() < 1e-5);
        assert!(matches!(result.continuation, Continuation::Bounce { .. }));
    }

    #[test]
    fn test_emissive_back_face_is_dark() {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let e = scene.add_material(Material::Emissive { radiance: Vec3::ONE });
        scene.add_plane(Vec3::ZERO, Vec3::Y, e);
        let from_below = Ray::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);
        let isect = scene.intersect(&from_below).unwrap();
        let sd = ShaderContext { ray: &from_below, isect: &isect, bounce: 0, exiting_subsurface: false };
        let mut rng = PathRng::default().bounce(0);
        let result = scene.shade_surface(&sd, &mut rng);
        assert_eq!(result.emission, Vec3::ZERO);
        assert_eq!(result.continuation, Continuation::Absorb);
    }

    #[test]
    fn test_subsurface_exit_on_far_side() {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let m = scene.add_material(Material::Subsurface { albedo: Vec3::splat(0.8) });
        scene.add_sphere(Vec3::ZERO, 1.0, m);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        let entry = scene.intersect(&ray).unwrap();
        let sd = ShaderContext { ray: &ray, isect: &entry, bounce: 0, exiting_subsurface: false };
        let mut rng = PathRng::new(3, 1, 1, 0).bounce(0);
        let Continuation::Subsurface { ray: walk, .. } = scene.shade_surface(&sd, &mut rng).continuation else {
            panic!("expected subsurface continuation");
        };
        let exit = scene.intersect_subsurface(&walk, &entry).expect("exit point");
        assert!(!exit.front_face);
        assert!((exit.position.length() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_volume_entry_transmits() {
        let mut scene = SimpleScene::new(Vec3::ZERO);
        let fog = scene.add_material(Material::Volume { density: 1.0, albedo: Vec3::ONE });
        scene.add_sphere(Vec3::ZERO, 1.0, fog);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        let isect = scene.intersect(&ray).unwrap();
        assert_eq!(isect.kind, HitKind::Volume);
        let sd = ShaderContext { ray: &ray, isect: &isect, bounce: 0, exiting_subsurface: false };
        let mut rng = PathRng::default().bounce(0);
        assert!(matches!(
            scene.shade_volume(&sd, &mut rng).continuation,
            Continuation::Transmit { .. }
        ));
        // Media never block shadow rays.
        assert!(!scene.occluded(&ray));
    }
}
