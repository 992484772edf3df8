//! Drives a CPU queue by hand and checks the counters against the path
//! states after every synchronize, then validates each recorded path history
//! against the kernel graph.

use std::sync::Arc;

use wavefront::device::{queued_paths_args, DeviceKernel, INIT_FROM_CAMERA_ARGS, PATH_KERNEL_ARGS};
use wavefront::integrator::schedule_round;
use wavefront::kernel::{PathEvent, PathSlot};
use wavefront::prelude::*;

const WIDTH: u32 = 6;
const HEIGHT: u32 = 4;
const SAMPLES: u32 = 3;

fn scene() -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::new(0.05, 0.05, 0.1));
    let white = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.8) });
    let skin = scene.add_material(Material::Subsurface { albedo: Vec3::new(0.9, 0.7, 0.6) });
    let fog = scene.add_material(Material::Volume { density: 1.5, albedo: Vec3::splat(0.9) });
    let lamp = scene.add_material(Material::Emissive { radiance: Vec3::splat(4.0) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, white)
        .add_sphere(Vec3::new(-0.5, 0.4, 0.0), 0.4, skin)
        .add_sphere(Vec3::new(0.5, 0.4, 0.0), 0.4, fog)
        .add_sphere(Vec3::new(0.0, 1.6, -0.5), 0.2, lamp)
        .add_light(Vec3::new(0.0, 2.0, 1.0), Vec3::splat(6.0));
    scene
}

fn device() -> CpuDevice {
    let camera = Camera::look_at(Vec3::new(0.0, 0.6, 3.0), Vec3::new(0.0, 0.4, 0.0), Vec3::Y, 45.0, WIDTH, HEIGHT);
    let params = IntegratorParams { max_bounce: 6, min_bounce: 2, seed: 11, filter_width: 1.0 };
    let options = CpuDeviceOptions {
        num_queues: 1,
        path_states_per_queue: (WIDTH * HEIGHT * SAMPLES) as usize,
        record_path_history: true,
    };
    CpuDevice::new(KernelGlobals::new(Arc::new(scene()), camera, params), options).unwrap()
}

fn whole_image_tile() -> WorkTile {
    WorkTile {
        index: 0,
        x: 0,
        y: 0,
        w: WIDTH,
        h: HEIGHT,
        start_sample: 0,
        num_samples: SAMPLES,
        offset: UVec2::ZERO,
    }
}

fn assert_counters_match(queue: &dyn DeviceQueue) {
    let counters = queue.queue_counters();
    let alive: u64 = queue.path_states().iter().map(|s| s.num_alive() as u64).sum();
    assert_eq!(counters.total(), alive);
    for kernel in PathKernel::ALL {
        let queued = queue.path_states().iter().filter(|s| s.is_queued_on(kernel)).count();
        assert_eq!(counters.get(kernel) as usize, queued, "{kernel}");
    }
}

/// Run one batch; `limit` caps how many queued paths each launch runs.
fn run_batch(limit: impl Fn(u32) -> u32) -> Box<dyn DeviceQueue> {
    let device = device();
    let mut queue = device.create_queue(0);
    queue.init_execution();

    let tile = whole_image_tile();
    assert!(queue.copy_work_tile_to_device(&tile));
    assert!(queue.enqueue(DeviceKernel::IntegratorInitFromCamera, tile.work_size(), &INIT_FROM_CAMERA_ARGS));
    assert!(queue.synchronize());
    assert_eq!(queue.queue_counters().get(PathKernel::IntersectClosest) as usize, tile.work_size());
    assert_counters_match(queue.as_ref());

    let capacity = queue.num_concurrent_states();
    let mut rounds = 0;
    while !queue.queue_counters().is_empty() {
        for (kernel, n) in schedule_round(&queue.queue_counters()) {
            assert!(queue.enqueue(DeviceKernel::IntegratorQueuedPathsArray, capacity, &queued_paths_args(kernel)));
            assert!(queue.enqueue(kernel.into(), limit(n).clamp(1, n) as usize, &PATH_KERNEL_ARGS));
        }
        assert!(queue.synchronize());
        assert_counters_match(queue.as_ref());
        rounds += 1;
        assert!(rounds < 1000, "batch did not drain");
    }
    assert!(queue.path_states().iter().all(PathSlot::is_free));
    queue
}

/// Split a slot history into main and shadow events and check each against
/// the kernel graph.
fn check_history(history: &[PathEvent]) {
    let is_shadow = |e: &PathEvent| match *e {
        PathEvent::Init(k) | PathEvent::Terminate(k) => k.is_shadow(),
        PathEvent::Next { from, .. } => from.is_shadow(),
    };

    let main: Vec<_> = history.iter().copied().filter(|e| !is_shadow(e)).collect();
    let shadow: Vec<_> = history.iter().copied().filter(is_shadow).collect();

    // Exactly one main sub-path: init, a connected chain, one terminate.
    assert_eq!(main.first(), Some(&PathEvent::Init(PathKernel::IntersectClosest)), "{history:?}");
    let mut current = Some(PathKernel::IntersectClosest);
    for event in &main[1..] {
        let at = current.expect("event after terminate");
        match *event {
            PathEvent::Next { from, to } => {
                assert_eq!(from, at);
                assert!(from.as_main().unwrap().can_follow(to.as_main().unwrap()), "{from} -> {to}");
                current = Some(to);
            }
            PathEvent::Terminate(k) => {
                assert_eq!(k, at);
                assert!(k.as_main().unwrap().can_terminate());
                current = None;
            }
            PathEvent::Init(k) => panic!("second main init on {k}"),
        }
    }
    assert_eq!(current, None, "main path never terminated: {history:?}");

    // Any number of shadow sub-paths, never overlapping.
    let mut current: Option<PathKernel> = None;
    for event in &shadow {
        match (*event, current) {
            (PathEvent::Init(k), None) => {
                assert_eq!(k, PathKernel::IntersectShadow);
                current = Some(k);
            }
            (PathEvent::Next { from, to }, Some(at)) => {
                assert_eq!(from, at);
                assert!(from.as_shadow().unwrap().can_follow(to.as_shadow().unwrap()));
                current = Some(to);
            }
            (PathEvent::Terminate(k), Some(at)) => {
                assert_eq!(k, at);
                current = None;
            }
            (e, c) => panic!("shadow event {e:?} while at {c:?}"),
        }
    }
    assert_eq!(current, None, "shadow path left alive: {history:?}");
}

#[test]
fn test_counters_match_states_full_launches() {
    let queue = run_batch(|n| n);
    let mut saw_shadow = false;
    let mut saw_subsurface = false;
    for slot in queue.path_states() {
        let history = slot.history.as_deref().unwrap();
        check_history(history);
        saw_shadow |= history.contains(&PathEvent::Init(PathKernel::IntersectShadow));
        saw_subsurface |= history.iter().any(|e| matches!(e, PathEvent::Terminate(PathKernel::IntersectSubsurface))
            || matches!(e, PathEvent::Next { to: PathKernel::IntersectSubsurface, .. }));
    }
    assert!(saw_shadow);
    assert!(saw_subsurface);
}

#[test]
fn test_counters_match_states_partial_launches() {
    // Only half of each queue runs per round; the rest waits for later rounds.
    let queue = run_batch(|n| n.div_ceil(2));
    for slot in queue.path_states() {
        check_history(slot.history.as_deref().unwrap());
    }
}
