//! Iterative path integrator.

use rand::Rng;

use crate::light::sample_lights;
use crate::onb::Onb;
use crate::ray::Ray;
use crate::sampling::{uniform_hemisphere, UNIFORM_HEMISPHERE_PDF};
use crate::scene::Intersector;
use crate::vec3::{dot, Color};

/// Per-sample state carried from bounce to bounce.
#[derive(Clone, Copy, Debug)]
pub struct PathState {
    pub throughput: Color,
    pub radiance: Color,
    pub ray: Ray,
    pub bounce: u32,
}

impl PathState {
    pub fn new(ray: Ray) -> Self {
        Self { throughput: Color::ONE, radiance: Color::ZERO, ray, bounce: 0 }
    }

    /// Runs one bounce. Returns `false` once the path has left the scene.
    pub fn advance<S, R>(&mut self, scene: &S, rng: &mut R) -> bool
    where
        S: Intersector + ?Sized,
        R: Rng + ?Sized,
    {
        let ray = self.ray;
        let time = ray.time();

        let Some(hit) = scene.intersect(&ray) else {
            self.radiance += self.throughput * scene.snapshot().sky();
            return false;
        };

        let primitive = scene.snapshot().primitive(hit.primitive);
        let p = ray.at(hit.t);
        let wo = -ray.direction();

        if self.bounce == 0 {
            self.radiance += primitive.emission;
        }
        self.radiance +=
            self.throughput * sample_lights(scene, &primitive.material, p, hit.normal, wo, time, rng);

        let uvw = Onb::new(hit.normal);
        let wi = uvw.transform(uniform_hemisphere(rng));
        let f = primitive.material.brdf(hit.normal, wo, wi);
        let cos_theta = dot(hit.normal, wi).clamp(0.0, 1.0);
        self.throughput *= f * cos_theta / UNIFORM_HEMISPHERE_PDF;

        self.ray = Ray::new(p, wi, time);
        self.bounce += 1;
        true
    }
}

/// Single-sample radiance estimate along a path starting with `ray`. Paths
/// still inside the scene after `max_depth` bounces are cut off with no
/// further contribution.
pub fn trace_path<S, R>(scene: &S, ray: Ray, max_depth: u32, rng: &mut R) -> Color
where
    S: Intersector + ?Sized,
    R: Rng + ?Sized,
{
    let mut state = PathState::new(ray);
    while state.bounce < max_depth {
        if !state.advance(scene, rng) {
            break;
        }
    }
    state.radiance
}
