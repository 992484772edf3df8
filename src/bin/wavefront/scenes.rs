//! Built-in scene presets.

use anyhow::{bail, Result};
use wavefront::prelude::{Camera, Material, SimpleScene, Vec3};

pub const NAMES: [&str; 4] = ["empty", "shadow", "cornell", "volume"];

/// Scene and camera for preset `name` at `width` x `height`.
pub fn build(name: &str, width: u32, height: u32) -> Result<(SimpleScene, Camera)> {
    let scene = match name {
        "empty" => SimpleScene::new(Vec3::new(0.6, 0.7, 0.9)),
        "shadow" => shadow(),
        "cornell" => cornell(),
        "volume" => volume(),
        other => bail!("unknown scene '{other}' (expected one of {})", NAMES.join(", ")),
    };
    let camera = match name {
        "cornell" => Camera::look_at(Vec3::new(0.0, 1.0, 3.4), Vec3::new(0.0, 1.0, 0.0), Vec3::Y, 40.0, width, height),
        _ => Camera::look_at(Vec3::new(0.0, 1.5, 4.0), Vec3::new(0.0, 0.5, 0.0), Vec3::Y, 40.0, width, height),
    };
    Ok((scene, camera))
}

fn shadow() -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::splat(0.05));
    let floor = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.7) });
    let red = scene.add_material(Material::Diffuse { albedo: Vec3::new(0.8, 0.2, 0.2) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, floor)
        .add_sphere(Vec3::new(0.0, 0.6, 0.0), 0.6, red)
        .add_light(Vec3::new(2.0, 4.0, 2.0), Vec3::splat(30.0));
    scene
}

fn cornell() -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::ZERO);
    let white = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.73) });
    let red = scene.add_material(Material::Diffuse { albedo: Vec3::new(0.65, 0.05, 0.05) });
    let green = scene.add_material(Material::Diffuse { albedo: Vec3::new(0.12, 0.45, 0.15) });
    let skin = scene.add_material(Material::Subsurface { albedo: Vec3::new(0.9, 0.6, 0.5) });
    let lamp = scene.add_material(Material::Emissive { radiance: Vec3::splat(8.0) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, white)
        .add_plane(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, white)
        .add_plane(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, white)
        .add_plane(Vec3::new(-1.0, 0.0, 0.0), Vec3::X, red)
        .add_plane(Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_X, green)
        .add_sphere(Vec3::new(-0.4, 0.35, -0.3), 0.35, white)
        .add_sphere(Vec3::new(0.45, 0.3, 0.2), 0.3, skin)
        .add_sphere(Vec3::new(0.0, 2.15, 0.0), 0.3, lamp)
        .add_light(Vec3::new(0.0, 1.9, 0.0), Vec3::splat(2.0));
    scene
}

fn volume() -> SimpleScene {
    let mut scene = SimpleScene::new(Vec3::new(0.2, 0.25, 0.3));
    let floor = scene.add_material(Material::Diffuse { albedo: Vec3::splat(0.5) });
    let fog = scene.add_material(Material::Volume { density: 1.5, albedo: Vec3::new(0.9, 0.9, 0.8) });
    scene
        .add_plane(Vec3::ZERO, Vec3::Y, floor)
        .add_sphere(Vec3::new(0.0, 0.8, 0.0), 0.8, fog)
        .add_light(Vec3::new(-2.0, 3.0, 2.0), Vec3::splat(25.0));
    scene
}
