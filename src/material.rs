use std::f32::consts::PI;

use crate::vec3::{dot, Color, Vec3};

/// Diffuse surface description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
}

impl Material {
    pub const BLACK: Material = Material { color: Color::ZERO };

    pub fn diffuse(albedo: Color) -> Self {
        Self { color: albedo }
    }

    /// Lambertian BRDF. Zero unless `wo` and `wi` both lie above the surface.
    pub fn brdf(&self, normal: Vec3, wo: Vec3, wi: Vec3) -> Color {
        if dot(normal, wi) <= 0.0 || dot(normal, wo) <= 0.0 {
            return Color::ZERO;
        }
        self.color / PI
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::splat(0.8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn lambert_is_albedo_over_pi() {
        let m = Material::diffuse(Color::new(0.8, 0.4, 0.2));
        let n = Vec3::new(0.0, 1.0, 0.0);
        let f = m.brdf(n, n, Vec3::new(0.6, 0.8, 0.0));
        assert_abs_diff_eq!(f.x(), 0.8 / PI, epsilon = 1e-6);
        assert_abs_diff_eq!(f.z(), 0.2 / PI, epsilon = 1e-6);
    }

    #[test]
    fn below_horizon_is_black() {
        let m = Material::default();
        let n = Vec3::new(0.0, 1.0, 0.0);
        assert!(m.brdf(n, n, Vec3::new(0.0, -1.0, 0.0)).is_black());
        assert!(m.brdf(n, Vec3::new(1.0, -0.1, 0.0), n).is_black());
    }
}
