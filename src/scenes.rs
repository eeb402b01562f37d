//! Built-in scenes for the demo binary and the tests.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::camera::Camera;
use crate::material::Material;
use crate::primitive::Primitive;
use crate::scene::Scene;
use crate::vec3::{Color, Point3, Vec3};

pub const PRESETS: &[&str] = &["spheres", "cornell", "motion_blur", "lit_sphere"];

pub struct Preset {
    pub scene: Scene,
    pub camera: Camera,
}

pub fn build_preset(name: &str) -> Option<Preset> {
    let preset = match name {
        "spheres" => spheres(),
        "cornell" => cornell(),
        "motion_blur" | "motion" => motion_blur(),
        "lit_sphere" => lit_sphere(),
        _ => return None,
    };
    Some(preset)
}

/// The parallelogram `q, q + u, q + u + v, q + v` as two triangles whose
/// one-sided normal is `cross(u, v)`.
fn quad(q: Point3, u: Vec3, v: Vec3, material: Material) -> [Primitive; 2] {
    [
        Primitive::triangle(q, q + u, q + u + v, material),
        Primitive::triangle(q, q + u + v, q + v, material),
    ]
}

fn add_quad(scene: &mut Scene, q: Point3, u: Vec3, v: Vec3, material: Material) {
    for triangle in quad(q, u, v, material) {
        scene.add(triangle);
    }
}

/// Axis-aligned box spanned by corners `a` and `b`.
fn add_box(scene: &mut Scene, a: Point3, b: Point3, material: Material) {
    let min = a.min(b);
    let max = a.max(b);
    let dx = Vec3::new(max.x() - min.x(), 0.0, 0.0);
    let dy = Vec3::new(0.0, max.y() - min.y(), 0.0);
    let dz = Vec3::new(0.0, 0.0, max.z() - min.z());

    add_quad(scene, Point3::new(min.x(), min.y(), max.z()), dx, dy, material); // front
    add_quad(scene, Point3::new(max.x(), min.y(), max.z()), -dz, dy, material); // right
    add_quad(scene, Point3::new(max.x(), min.y(), min.z()), -dx, dy, material); // back
    add_quad(scene, min, dz, dy, material); // left
    add_quad(scene, Point3::new(min.x(), max.y(), max.z()), dx, -dz, material); // top
    add_quad(scene, min, dx, dz, material); // bottom
}

fn spheres() -> Preset {
    let mut scene = Scene::new();
    scene.sky = Color::new(0.15, 0.21, 0.3);

    scene.add(Primitive::plane(Vec3::new(0.0, 1.0, 0.0), 0.0, Material::diffuse(Color::splat(0.5))));
    scene.add(Primitive::sphere(Point3::new(-2.2, 1.0, 0.0), 1.0, Material::diffuse(Color::new(0.7, 0.3, 0.3))));
    scene.add(Primitive::sphere(Point3::new(0.0, 1.0, 0.0), 1.0, Material::diffuse(Color::splat(0.8))));
    scene.add(Primitive::sphere(Point3::new(2.2, 1.0, 0.0), 1.0, Material::diffuse(Color::new(0.3, 0.4, 0.8))));
    scene.add(
        Primitive::sphere(Point3::new(0.0, 4.0, 2.0), 0.5, Material::BLACK).with_emission(Color::splat(20.0)),
    );

    Preset {
        scene,
        camera: Camera {
            position: Point3::new(0.0, 1.5, 8.0),
            target: Point3::new(0.0, 1.0, 0.0),
            ..Camera::default()
        },
    }
}

fn cornell() -> Preset {
    let mut scene = Scene::new();

    let red = Material::diffuse(Color::new(0.65, 0.05, 0.05));
    let white = Material::diffuse(Color::new(0.73, 0.73, 0.73));
    let green = Material::diffuse(Color::new(0.12, 0.45, 0.15));

    add_quad(&mut scene, Point3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 555.0, 0.0), Vec3::new(0.0, 0.0, 555.0), green);
    add_quad(&mut scene, Point3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 555.0), Vec3::new(0.0, 555.0, 0.0), red);
    add_quad(&mut scene, Point3::new(0.0, 555.0, 0.0), Vec3::new(0.0, 0.0, 555.0), Vec3::new(555.0, 0.0, 0.0), white);
    add_quad(&mut scene, Point3::new(0.0, 0.0, 0.0), Vec3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 555.0), white);
    add_quad(&mut scene, Point3::new(0.0, 0.0, 555.0), Vec3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 555.0, 0.0), white);

    // Light, facing down into the box.
    let light = quad(Point3::new(213.0, 554.0, 227.0), Vec3::new(130.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 105.0), Material::BLACK);
    for triangle in light {
        scene.add(triangle.with_emission(Color::splat(15.0)));
    }

    add_box(&mut scene, Point3::new(265.0, 0.0, 295.0), Point3::new(430.0, 330.0, 460.0), white);
    scene.add(Primitive::sphere(Point3::new(190.0, 90.0, 190.0), 90.0, white));

    Preset {
        scene,
        camera: Camera {
            position: Point3::new(278.0, 278.0, -800.0),
            target: Point3::new(278.0, 278.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 40.0,
        },
    }
}

fn motion_blur() -> Preset {
    let mut scene = Scene::new();
    scene.sky = Color::new(0.35, 0.45, 0.6);
    scene.add(Primitive::plane(Vec3::new(0.0, 1.0, 0.0), 0.0, Material::diffuse(Color::splat(0.5))));

    let mut rng = SmallRng::seed_from_u64(0x5EED_1234);
    for a in -6..6 {
        for b in -6..6 {
            let center = Point3::new(
                a as f32 + 0.9 * rng.r#gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.r#gen::<f32>(),
            );
            if (center - Point3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }
            let albedo = Color::new(
                rng.r#gen::<f32>() * rng.r#gen::<f32>(),
                rng.r#gen::<f32>() * rng.r#gen::<f32>(),
                rng.r#gen::<f32>() * rng.r#gen::<f32>(),
            );
            let bounce = Vec3::new(0.0, rng.gen_range(0.0..0.5), 0.0);
            scene.add(Primitive::sphere(center, 0.2, Material::diffuse(albedo)).with_motion(bounce));
        }
    }

    scene.add(Primitive::sphere(Point3::new(-4.0, 1.0, 0.0), 1.0, Material::diffuse(Color::new(0.4, 0.2, 0.1))));
    scene.add(Primitive::sphere(Point3::new(0.0, 1.0, 0.0), 1.0, Material::diffuse(Color::splat(0.8))));
    scene.add(
        Primitive::sphere(Point3::new(4.0, 1.0, 0.0), 1.0, Material::BLACK).with_emission(Color::new(4.0, 3.6, 3.0)),
    );

    Preset {
        scene,
        camera: Camera {
            position: Point3::new(13.0, 2.0, 3.0),
            target: Point3::ZERO,
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 20.0,
        },
    }
}

/// Unit diffuse sphere under a small sphere light, viewed straight down onto
/// its top through a narrow field of view. With a black sky and a black light
/// surface the top point receives direct light only.
fn lit_sphere() -> Preset {
    let mut scene = Scene::new();
    scene.add(Primitive::sphere(Point3::ZERO, 1.0, Material::diffuse(Color::splat(0.8))));
    scene.add(
        Primitive::sphere(Point3::new(2.0, 3.0, 0.0), 0.5, Material::BLACK).with_emission(Color::splat(10.0)),
    );

    Preset {
        scene,
        camera: Camera {
            position: Point3::new(0.0, 6.0, 0.0),
            target: Point3::ZERO,
            up: Vec3::new(0.0, 0.0, -1.0),
            fov: 1.0,
        },
    }
}
