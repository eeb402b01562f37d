use crate::vec3::{cross, unit_vector, Vec3};

/// Orthonormal basis with `w` along the surface normal.
pub struct Onb {
    axis: [Vec3; 3],
}

impl Onb {
    pub fn new(n: Vec3) -> Self {
        let w = unit_vector(n);
        let a = if w.x().abs() > 0.9 {
            Vec3::new(0.0, 1.0, 0.0)
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        };
        let v = unit_vector(cross(w, a));
        let u = cross(w, v);
        Self { axis: [u, v, w] }
    }

    /// Maps a local direction (z up) into world space.
    pub fn transform(&self, v: Vec3) -> Vec3 {
        v[0] * self.axis[0] + v[1] * self.axis[1] + v[2] * self.axis[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::dot;
    use approx::assert_abs_diff_eq;

    #[test]
    fn basis_is_orthonormal_for_any_normal() {
        for n in [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-0.3, 0.2, -0.9),
        ] {
            let onb = Onb::new(n);
            let [u, v, w] = onb.axis;
            assert_abs_diff_eq!(dot(u, v), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(dot(u, w), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(dot(v, w), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(u.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(v.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn local_z_maps_onto_normal() {
        let n = unit_vector(Vec3::new(0.4, -0.5, 0.2));
        let onb = Onb::new(n);
        let mapped = onb.transform(Vec3::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(dot(mapped, n), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(dot(onb.axis[2], n), 1.0, epsilon = 1e-5);
    }
}
