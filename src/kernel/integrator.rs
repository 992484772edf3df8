//! Integrator kernel bodies.
//!
//! A kernel body only computes *where the path goes next*; it returns a
//! transition instead of touching the counters. [`integrator_path_kernel`]
//! applies that transition exactly once, so every kernel pass performs
//! exactly one of INIT / NEXT / TERMINATE per sub-path it runs on.

use super::globals::KernelGlobals;
use super::path_state::{MainPath, PathSlot, ShadowPath};
use super::queue_counter::KernelQueueCounters;
use super::random::{PathRng, PRNG_FILTER_U, PRNG_FILTER_V, PRNG_TERMINATE};
use super::types::{MainKernel, PathKernel, ShadowKernel};
use crate::integrator::WorkTile;
use crate::scene::{Continuation, HitKind, ShaderContext};
use crate::util::{is_black, Ray, Vec2, Vec3};

/// Where a main path goes after a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainTransition {
    Next(MainKernel),
    Terminate,
}

/// Where a shadow path goes after a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowTransition {
    Next(ShadowKernel),
    Terminate,
}

/// Shadow path to spawn from a shading kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowRequest {
    pub ray: Ray,
    pub contribution: Vec3,
}

/// Output of a shading kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeOutcome {
    pub transition: MainTransition,
    pub shadow: Option<ShadowRequest>,
}

/// Create the camera path for work item `work_index` of `tile` in `slot`.
///
/// The slot must be free; reusing a live slot is a protocol violation.
pub fn integrator_init_from_camera(
    kg: &KernelGlobals,
    slot: &mut PathSlot,
    counters: &KernelQueueCounters,
    tile: &WorkTile,
    work_index: usize,
) {
    assert!(slot.is_free(), "init_from_camera on a slot with live paths");
    slot.clear();

    let (pixel, sample) = tile.work_pixel(work_index);
    let cam_x = pixel.x + tile.offset.x;
    let cam_y = pixel.y + tile.offset.y;
    let rng = PathRng::new(kg.integrator.seed, cam_x, cam_y, sample);
    let filter = Vec2::new(rng.get(PRNG_FILTER_U), rng.get(PRNG_FILTER_V));
    let jitter = (filter - Vec2::splat(0.5)) * kg.integrator.filter_width;

    let main = &mut slot.main;
    main.pixel = pixel;
    main.sample = sample;
    main.rng = rng;
    main.ray = kg.camera.generate_ray(cam_x, cam_y, jitter);
    main.throughput = Vec3::ONE;
    main.radiance = Vec3::ZERO;
    main.bounce = 0;

    slot.path_init(counters, MainKernel::INIT);
}

/// Run `kernel` for one path and apply its transition.
pub fn integrator_path_kernel(
    kg: &KernelGlobals,
    kernel: PathKernel,
    slot: &mut PathSlot,
    counters: &KernelQueueCounters,
) {
    assert!(slot.is_queued_on(kernel), "{kernel} launched on a path not queued there");

    match kernel {
        PathKernel::IntersectClosest => {
            let t = intersect_closest(kg, &mut slot.main);
            apply_main(slot, counters, MainKernel::IntersectClosest, t);
        }
        PathKernel::IntersectSubsurface => {
            let t = intersect_subsurface(kg, &mut slot.main);
            apply_main(slot, counters, MainKernel::IntersectSubsurface, t);
        }
        PathKernel::ShadeBackground => {
            let t = shade_background(kg, &mut slot.main);
            apply_main(slot, counters, MainKernel::ShadeBackground, t);
        }
        PathKernel::ShadeSurface | PathKernel::ShadeVolume => {
            let current = if kernel == PathKernel::ShadeSurface {
                MainKernel::ShadeSurface
            } else {
                MainKernel::ShadeVolume
            };
            let outcome = shade(kg, &mut slot.main, current);
            if let Some(request) = outcome.shadow {
                slot.shadow.ray = request.ray;
                slot.shadow.contribution = request.contribution;
                slot.shadow_path_init(counters, ShadowKernel::INIT);
            }
            apply_main(slot, counters, current, outcome.transition);
        }
        PathKernel::IntersectShadow => {
            let t = intersect_shadow(kg, &slot.shadow);
            apply_shadow(slot, counters, ShadowKernel::IntersectShadow, t);
        }
        PathKernel::ShadeShadow => {
            shade_shadow(slot, counters);
        }
    }
}

fn apply_main(slot: &mut PathSlot, counters: &KernelQueueCounters, current: MainKernel, t: MainTransition) {
    match t {
        MainTransition::Next(next) => slot.path_next(counters, current, next),
        MainTransition::Terminate => slot.path_terminate(counters, current),
    }
}

fn apply_shadow(slot: &mut PathSlot, counters: &KernelQueueCounters, current: ShadowKernel, t: ShadowTransition) {
    match t {
        ShadowTransition::Next(next) => slot.shadow_path_next(counters, current, next),
        ShadowTransition::Terminate => slot.shadow_path_terminate(counters, current),
    }
}

/// Closest hit decides which shading kernel runs next.
pub fn intersect_closest(kg: &KernelGlobals, main: &mut MainPath) -> MainTransition {
    main.isect = kg.scene.intersect(&main.ray);
    match main.isect.map(|h| h.kind) {
        None => MainTransition::Next(MainKernel::ShadeBackground),
        Some(HitKind::Surface) => MainTransition::Next(MainKernel::ShadeSurface),
        Some(HitKind::Volume) => MainTransition::Next(MainKernel::ShadeVolume),
    }
}

/// Trace the walk ray through the object interior to its exit.
pub fn intersect_subsurface(kg: &KernelGlobals, main: &mut MainPath) -> MainTransition {
    let Some(entry) = main.isect else {
        panic!("intersect_subsurface without an entry intersection");
    };
    match kg.scene.intersect_subsurface(&main.ray, &entry) {
        Some(exit) => {
            main.isect = Some(exit);
            main.exiting_subsurface = true;
            MainTransition::Next(MainKernel::ShadeSurface)
        }
        None => MainTransition::Terminate,
    }
}

/// Escaped ray: add background and terminate.
pub fn shade_background(kg: &KernelGlobals, main: &mut MainPath) -> MainTransition {
    main.radiance += main.throughput * kg.scene.background(&main.ray);
    MainTransition::Terminate
}

/// Evaluate surface or volume shading, spawn the light sample and pick the
/// continuation.
pub fn shade(kg: &KernelGlobals, main: &mut MainPath, current: MainKernel) -> ShadeOutcome {
    let Some(isect) = main.isect else {
        panic!("{} without an intersection", PathKernel::from(current));
    };
    let mut rng = main.rng.bounce(main.bounce);
    let sd = ShaderContext {
        ray: &main.ray,
        isect: &isect,
        bounce: main.bounce,
        exiting_subsurface: main.exiting_subsurface,
    };
    let result = match current {
        MainKernel::ShadeVolume => kg.scene.shade_volume(&sd, &mut rng),
        _ => kg.scene.shade_surface(&sd, &mut rng),
    };
    main.exiting_subsurface = false;

    main.radiance += main.throughput * result.emission;

    let shadow = result
        .light
        .map(|ls| ShadowRequest { ray: ls.ray, contribution: main.throughput * ls.radiance })
        .filter(|req| !is_black(req.contribution));

    let transition = continue_path(kg, main, result.continuation);
    ShadeOutcome { transition, shadow }
}

/// Apply bounce limit, throughput and Russian roulette to a continuation.
fn continue_path(kg: &KernelGlobals, main: &mut MainPath, continuation: Continuation) -> MainTransition {
    let (ray, weight, next, scatters) = match continuation {
        Continuation::Absorb => return MainTransition::Terminate,
        Continuation::Transmit { ray, weight } => (ray, weight, MainKernel::IntersectClosest, false),
        Continuation::Bounce { ray, weight } => (ray, weight, MainKernel::IntersectClosest, true),
        Continuation::Subsurface { ray, weight } => (ray, weight, MainKernel::IntersectSubsurface, true),
    };

    if scatters {
        if main.bounce >= kg.integrator.max_bounce {
            return MainTransition::Terminate;
        }
        main.bounce += 1;
    }

    main.throughput *= weight;
    if is_black(main.throughput) {
        return MainTransition::Terminate;
    }

    if scatters && main.bounce >= kg.integrator.min_bounce {
        let q = main.throughput.max_element().min(1.0);
        let u = main.rng.get(PathRng::bounce_offset(main.bounce) + PRNG_TERMINATE);
        if u >= q {
            return MainTransition::Terminate;
        }
        main.throughput /= q;
    }

    main.ray = ray;
    MainTransition::Next(next)
}

/// Visibility test; occluded shadow paths end here.
pub fn intersect_shadow(kg: &KernelGlobals, shadow: &ShadowPath) -> ShadowTransition {
    if kg.scene.occluded(&shadow.ray) {
        ShadowTransition::Terminate
    } else {
        ShadowTransition::Next(ShadowKernel::ShadeShadow)
    }
}

/// Apply the unoccluded contribution to the parent and terminate.
///
/// A parent that already terminated does not receive it.
pub fn shade_shadow(slot: &mut PathSlot, counters: &KernelQueueCounters) {
    slot.shadow_path_terminate(counters, ShadowKernel::ShadeShadow);
    if slot.main.flow.is_alive() {
        slot.main.radiance += slot.shadow.contribution;
    } else {
        tracing::trace!(pixel = ?slot.main.pixel, "shadow contribution discarded, parent terminated");
    }
    slot.shadow.contribution = Vec3::ZERO;
}
