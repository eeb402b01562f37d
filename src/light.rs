//! Next-event estimation over the snapshot's light list.

use rand::Rng;

use crate::material::Material;
use crate::ray::Ray;
use crate::scene::Intersector;
use crate::vec3::{dot, Color, Point3, Vec3};

pub const SAMPLES_PER_LIGHT: u32 = 2;

/// Estimates direct illumination reflected toward `wo` at `p`.
///
/// A sample counts as visible when the shadow ray's nearest hit is any
/// light-flagged primitive, not necessarily the one sampled, so a light
/// standing in front of another one does not occlude it.
pub fn sample_lights<S, R>(
    scene: &S,
    material: &Material,
    p: Point3,
    normal: Vec3,
    wo: Vec3,
    time: f32,
    rng: &mut R,
) -> Color
where
    S: Intersector + ?Sized,
    R: Rng + ?Sized,
{
    let snapshot = scene.snapshot();
    let mut sum = Color::ZERO;

    for light in snapshot.lights() {
        let mut radiance = Color::ZERO;

        for _ in 0..SAMPLES_PER_LIGHT {
            let Some(sample) = light.sample(time, rng) else {
                continue;
            };
            if sample.area <= 0.0 {
                continue;
            }

            let to_light = sample.point - p;
            let dist_sq = to_light.length_squared();
            if dist_sq <= 0.0 {
                continue;
            }
            let wi = to_light / dist_sq.sqrt();

            let Some(hit) = scene.intersect(&Ray::new(p, wi, time)) else {
                continue;
            };
            if !snapshot.primitive(hit.primitive).light {
                continue;
            }

            let cos_light = dot(sample.normal, -wi).clamp(0.0, 1.0);
            if cos_light <= 0.0 {
                continue;
            }

            // Area density converted to solid angle.
            let pdf = dist_sq / (cos_light * sample.area);
            let f = material.brdf(normal, wo, wi);
            let cos_surface = dot(wi, normal).clamp(0.0, 1.0);
            radiance += f * light.emission * cos_surface / pdf;
        }

        sum += radiance / SAMPLES_PER_LIGHT as f32;
    }

    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;
    use crate::scene::Scene;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    fn estimate(scene: &Scene, p: Point3, material: &Material, n: u32) -> Color {
        let snapshot = scene.snapshot();
        let mut rng = SmallRng::seed_from_u64(0xD1CE);
        let mut sum = Color::ZERO;
        for _ in 0..n {
            sum += sample_lights(&snapshot, material, p, UP, UP, 0.0, &mut rng);
        }
        sum / n as f32
    }

    fn sphere_light(center: Point3, radius: f32, emission: f32) -> Primitive {
        Primitive::sphere(center, radius, Material::BLACK).with_emission(Color::splat(emission))
    }

    /// Reflected radiance from a diffuse receiver lit by a sphere light that is
    /// fully above its horizon: `albedo * L * (r / d)^2 * cos(theta)`.
    fn analytic(albedo: f32, emission: f32, radius: f32, to_center: Vec3) -> f32 {
        let d_sq = to_center.length_squared();
        let cos_theta = to_center.y() / d_sq.sqrt();
        albedo * emission * radius * radius * cos_theta / d_sq
    }

    #[test]
    fn converges_to_sphere_light_formula_on_axis() {
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(0.0, 4.0, 0.0), 0.5, 10.0));
        let material = Material::diffuse(Color::splat(0.8));

        let expected = analytic(0.8, 10.0, 0.5, Vec3::new(0.0, 4.0, 0.0));
        // Tolerances sit several standard errors out and narrow with the count.
        let coarse = estimate(&scene, Point3::ZERO, &material, 500);
        let fine = estimate(&scene, Point3::ZERO, &material, 40_000);

        assert_abs_diff_eq!(coarse.x(), expected, epsilon = 0.04);
        assert_abs_diff_eq!(fine.x(), expected, epsilon = 0.005);
    }

    #[test]
    fn converges_to_sphere_light_formula_off_axis() {
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(2.0, 3.0, 0.0), 0.5, 10.0));
        let material = Material::diffuse(Color::splat(0.8));

        let p = Point3::new(0.0, 1.0, 0.0);
        let expected = analytic(0.8, 10.0, 0.5, Point3::new(2.0, 3.0, 0.0) - p);
        let got = estimate(&scene, p, &material, 40_000);
        assert_abs_diff_eq!(got.y(), expected, epsilon = 0.01);
    }

    #[test]
    fn no_lights_contribute_nothing() {
        let mut scene = Scene::new();
        scene.add(Primitive::sphere(Point3::new(0.0, 3.0, 0.0), 1.0, Material::default()));
        let got = estimate(&scene, Point3::ZERO, &Material::default(), 10);
        assert!(got.is_black());
    }

    #[test]
    fn zero_area_light_is_skipped() {
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(0.0, 2.0, 0.0), 0.0, 10.0));
        let got = estimate(&scene, Point3::ZERO, &Material::default(), 100);
        assert!(got.is_black());
        assert!(got.x().is_finite());
    }

    #[test]
    fn opaque_occluder_blocks_light() {
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(0.0, 5.0, 0.0), 0.5, 10.0));
        scene.add(Primitive::sphere(Point3::new(0.0, 2.5, 0.0), 1.5, Material::default()));
        let got = estimate(&scene, Point3::ZERO, &Material::default(), 1000);
        assert!(got.is_black());
    }

    #[test]
    fn light_in_front_of_light_does_not_occlude() {
        // Known approximation: any light-flagged hit validates the sample.
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(0.0, 5.0, 0.0), 0.5, 10.0));
        scene.add(
            Primitive::sphere(Point3::new(0.0, 2.5, 0.0), 1.5, Material::BLACK)
                .with_emission(Color::splat(0.001)),
        );
        let got = estimate(&scene, Point3::ZERO, &Material::default(), 1000);
        assert!(got.x() > 0.0);
    }

    #[test]
    fn light_below_horizon_is_black() {
        let mut scene = Scene::new();
        scene.add(sphere_light(Point3::new(0.0, -3.0, 0.0), 0.5, 10.0));
        let got = estimate(&scene, Point3::ZERO, &Material::default(), 200);
        assert!(got.is_black());
    }
}
