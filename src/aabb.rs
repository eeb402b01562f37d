use crate::ray::Ray;
use crate::vec3::{Point3, Vec3};

/// Padding applied to every box so that hit points computed by the exact
/// primitive tests never fall outside their bounds through rounding.
const PADDING: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(a: Point3, b: Point3) -> Self {
        let pad = Vec3::splat(PADDING);
        Self { min: a.min(b) - pad, max: a.max(b) + pad }
    }

    pub fn from_boxes(box0: Aabb, box1: Aabb) -> Self {
        Self { min: box0.min.min(box1.min), max: box0.max.max(box1.max) }
    }

    pub fn centroid(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test against `[t_min, t_max]`. The range is closed so that a box
    /// entered exactly at `t_max` is still visited.
    pub fn hit(&self, r: &Ray, mut t_min: f32, mut t_max: f32) -> bool {
        let ray_orig = r.origin();
        let ray_dir = r.direction();

        for axis in 0..3 {
            let adinv = 1.0 / ray_dir[axis];

            let t0 = (self.min[axis] - ray_orig[axis]) * adinv;
            let t1 = (self.max[axis] - ray_orig[axis]) * adinv;

            if t0 < t1 {
                if t0 > t_min {
                    t_min = t0;
                }
                if t1 < t_max {
                    t_max = t1;
                }
            } else {
                if t1 > t_min {
                    t_min = t1;
                }
                if t0 < t_max {
                    t_max = t0;
                }
            }

            if t_max < t_min {
                return false;
            }
        }
        true
    }

    pub fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x() > extent.y() {
            if extent.x() > extent.z() { 0 } else { 2 }
        } else if extent.y() > extent.z() {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_through_box_hits() {
        let bbox = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        assert!(bbox.hit(&ray, 0.0, f32::INFINITY));
        assert!(!bbox.hit(&ray, 0.0, 3.0));
    }

    #[test]
    fn axis_parallel_ray_outside_slab_misses() {
        let bbox = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 2.0, -5.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        assert!(!bbox.hit(&ray, 0.0, f32::INFINITY));
    }

    #[test]
    fn flat_box_is_padded() {
        let bbox = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(bbox.max.y() > bbox.min.y());
        assert_eq!(bbox.longest_axis(), 2);
    }
}
