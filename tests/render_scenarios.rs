//! End-to-end renders through the coordinator on the CPU device.

use std::f32::consts::FRAC_1_PI;
use std::sync::Arc;

use wavefront::integrator::FilmPixel;
use wavefront::prelude::*;

struct Setup {
    work: PathTraceWorkTiled,
    buffers: Arc<RenderBuffers>,
}

fn setup(scene: SimpleScene, camera: Camera, config: RenderConfig) -> Setup {
    let globals = KernelGlobals::new(Arc::new(scene), camera, config.integrator_params());
    let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config)).unwrap());
    let buffers = Arc::new(RenderBuffers::new(BufferParams::new(config.width, config.height)).unwrap());
    let work = PathTraceWorkTiled::new(device, buffers.clone(), config).unwrap();
    Setup { work, buffers }
}

fn front_camera(width: u32, height: u32) -> Camera {
    Camera::look_at(Vec3::new(0.0, 1.0, 3.4), Vec3::new(0.0, 1.0, 0.0), Vec3::Y, 40.0, width, height)
}

/// Small closed box with diffuse, subsurface, volume and emissive parts.
fn box_scene() -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::new(0.1, 0.1, 0.2));
    let white = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.7) });
    let red = scene.add_material(Material::Diffuse { albedo: Vec3::new(0.7, 0.1, 0.1) });
    let skin = scene.add_material(Material::Subsurface { albedo: Vec3::new(0.9, 0.6, 0.5) });
    let fog = scene.add_material(Material::Volume { density: 2.0, albedo: Vec3::splat(0.8) });
    let lamp = scene.add_material(Material::Emissive { radiance: Vec3::splat(5.0) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, white)
        .add_plane(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, white)
        .add_plane(Vec3::new(-1.0, 0.0, 0.0), Vec3::X, red)
        .add_sphere(Vec3::new(-0.4, 0.35, -0.3), 0.35, skin)
        .add_sphere(Vec3::new(0.45, 0.4, 0.1), 0.4, fog)
        .add_sphere(Vec3::new(0.0, 2.0, -0.5), 0.3, lamp)
        .add_light(Vec3::new(0.0, 1.8, 0.5), Vec3::splat(3.0));
    scene
}

#[test]
fn test_empty_scene_2x2_shows_background() {
    let background = Vec3::new(0.25, 0.5, 0.75);
    let config = RenderConfig {
        width: 2,
        height: 2,
        samples: 1,
        num_queues: 1,
        path_states_per_queue: 4,
        ..Default::default()
    };
    let mut s = setup(SimpleScene::new(background), front_camera(2, 2), config);

    let report = s.work.render();
    assert!(report.is_success(), "{report}");
    assert_eq!(report.total_tiles, 1);
    assert_eq!(report.completed.len(), 1);

    // Every path takes intersect_closest once, then shade_background once.
    assert_eq!(report.launches(PathKernel::IntersectClosest), 1);
    assert_eq!(report.launches(PathKernel::ShadeBackground), 1);
    assert_eq!(report.total_launches(), 2);

    for y in 0..2 {
        for x in 0..2 {
            let p = s.buffers.pixel(x, y);
            assert_eq!(p.num_samples, 1.0);
            assert!((p.mean() - background).length() < 1e-6, "pixel ({x},{y}) = {:?}", p.mean());
        }
    }
}

fn floor_with_light(occluder: bool) -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::ZERO);
    let floor = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.5) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, floor)
        .add_light(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(4.0));
    if occluder {
        scene.add_sphere(Vec3::new(0.0, 1.5, 0.0), 0.2, floor);
    }
    scene
}

fn direct_light_render(occluder: bool, max_bounce: u32) -> Vec3 {
    // One pixel looking straight down; the bounce escapes into black.
    let config = RenderConfig {
        width: 1,
        height: 1,
        samples: 8,
        max_bounce,
        min_bounce: 100,
        filter_width: 0.0,
        num_queues: 1,
        path_states_per_queue: 8,
        ..Default::default()
    };
    let camera = Camera::look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, Vec3::Z, 30.0, 1, 1);
    let mut s = setup(floor_with_light(occluder), camera, config);
    let report = s.work.render();
    assert!(report.is_success(), "{report}");
    assert!(report.launches(PathKernel::IntersectShadow) > 0);
    s.buffers.pixel_mean(0, 0)
}

#[test]
fn test_visible_shadow_adds_light_once() {
    // One bounce keeps the parent alive when its shadow path resolves.
    let mean = direct_light_render(false, 1);
    let expected = 0.5 * FRAC_1_PI;
    assert!((mean.x - expected).abs() < 1e-4, "{mean:?} vs {expected}");
}

#[test]
fn test_occluded_shadow_adds_nothing() {
    let mean = direct_light_render(true, 1);
    assert_eq!(mean, Vec3::ZERO);
}

#[test]
fn test_no_bounces_drop_floor_light_sample() {
    // The shadow is still traced, but its parent has already terminated.
    let mean = direct_light_render(false, 0);
    assert_eq!(mean, Vec3::ZERO);
}

fn render_box(num_queues: usize) -> Vec<FilmPixel> {
    let config = RenderConfig {
        width: 12,
        height: 8,
        samples: 4,
        seed: 7,
        num_queues,
        path_states_per_queue: 64,
        ..Default::default()
    };
    let mut s = setup(box_scene(), front_camera(12, 8), config);
    let report = s.work.render();
    assert!(report.is_success(), "{report}");
    assert!(report.launches(PathKernel::ShadeVolume) > 0);
    assert!(report.launches(PathKernel::IntersectSubsurface) > 0);
    s.buffers.snapshot()
}

#[test]
fn test_queue_count_does_not_change_result() {
    let one = render_box(1);
    let many = render_box(4);
    assert_eq!(one.len(), many.len());
    for (i, (a, b)) in one.iter().zip(&many).enumerate() {
        assert_eq!(a.num_samples, 4.0, "pixel {i}");
        assert_eq!(a.num_samples, b.num_samples, "pixel {i}");
        let (ma, mb) = (a.mean(), b.mean());
        assert!(ma.is_finite());
        let tol = 1e-4 * ma.max_element().max(1.0);
        assert!((ma - mb).abs().max_element() <= tol, "pixel {i}: {ma:?} vs {mb:?}");
    }
}

#[test]
fn test_sample_ranges_accumulate() {
    let config = RenderConfig {
        width: 4,
        height: 4,
        samples: 2,
        num_queues: 2,
        path_states_per_queue: 8,
        ..Default::default()
    };
    let mut s = setup(box_scene(), front_camera(4, 4), config);
    assert!(s.work.render_samples(0, 2).is_success());
    assert!(s.work.render_samples(2, 3).is_success());
    for p in s.buffers.snapshot() {
        assert_eq!(p.num_samples, 5.0);
    }
}

#[test]
fn test_device_data_update_reinitializes_queues() {
    let config = RenderConfig {
        width: 2,
        height: 2,
        samples: 1,
        num_queues: 2,
        path_states_per_queue: 4,
        ..Default::default()
    };
    let camera = front_camera(2, 2);
    let globals = KernelGlobals::new(Arc::new(SimpleScene::new(Vec3::ONE)), camera, config.integrator_params());
    let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config)).unwrap());
    let buffers = Arc::new(RenderBuffers::new(BufferParams::new(2, 2)).unwrap());
    let mut work = PathTraceWorkTiled::new(device.clone(), buffers.clone(), config.clone()).unwrap();

    assert!(work.render().is_success());
    assert!(work.render().is_success());

    device.set_globals(KernelGlobals::new(
        Arc::new(SimpleScene::new(Vec3::splat(3.0))),
        camera,
        config.integrator_params(),
    ));
    assert!(work.render().is_success());
    assert!((buffers.pixel_mean(1, 1) - Vec3::splat(5.0 / 3.0)).length() < 1e-5);
}

#[test]
fn test_buffer_must_match_camera() {
    let config = RenderConfig { width: 4, height: 4, num_queues: 1, ..Default::default() };
    let globals = KernelGlobals::new(Arc::new(SimpleScene::new(Vec3::ONE)), front_camera(4, 4), config.integrator_params());
    let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config)).unwrap());
    let buffers = Arc::new(RenderBuffers::new(BufferParams::new(8, 4)).unwrap());
    let err = PathTraceWorkTiled::new(device, buffers, config).err().unwrap();
    assert!(matches!(err, Error::BufferMismatch { expected: 16, actual: 32 }));
}

#[test]
fn test_buffer_window_of_larger_image() {
    let config = RenderConfig {
        width: 8,
        height: 8,
        samples: 1,
        num_queues: 1,
        path_states_per_queue: 16,
        ..Default::default()
    };
    let globals = KernelGlobals::new(
        Arc::new(SimpleScene::new(Vec3::new(0.3, 0.2, 0.1))),
        front_camera(8, 8),
        config.integrator_params(),
    );
    let device = Arc::new(CpuDevice::new(globals, CpuDeviceOptions::from_config(&config)).unwrap());
    let buffers = Arc::new(RenderBuffers::new(BufferParams::window(8, 8, 4, 4, 4, 4)).unwrap());
    let mut work = PathTraceWorkTiled::new(device, buffers.clone(), config).unwrap();
    assert!(work.render().is_success());
    assert_eq!(buffers.snapshot().len(), 16);
    assert!(buffers.snapshot().iter().all(|p| p.num_samples == 1.0));
}
