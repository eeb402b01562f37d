use std::f32::consts::PI;

use rand::Rng;

use crate::aabb::Aabb;
use crate::material::Material;
use crate::ray::Ray;
use crate::sampling::{uniform_sphere, uniform_triangle};
use crate::vec3::{cross, dot, face_forward, unit_vector, Color, Point3, Vec3};

/// Minimum accepted hit distance; keeps rays leaving a surface from hitting it again.
pub const EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { center: Point3, radius: f32 },
    /// Points `x` with `dot(normal, x) == offset`.
    Plane { normal: Vec3, offset: f32 },
    Triangle { v0: Point3, v1: Point3, v2: Point3 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub material: Material,
    pub emission: Color,
    pub light: bool,
    /// Translation over the shutter interval; position at time `t` is `base + motion * t`.
    pub motion: Vec3,
}

/// A point drawn on a light's surface together with the quantities needed to
/// turn its area density into a solid-angle density.
#[derive(Clone, Copy, Debug)]
pub struct LightSample {
    pub point: Point3,
    pub normal: Vec3,
    pub area: f32,
}

impl Primitive {
    pub fn new(shape: Shape, material: Material) -> Self {
        Self { shape, material, emission: Color::ZERO, light: false, motion: Vec3::ZERO }
    }

    pub fn sphere(center: Point3, radius: f32, material: Material) -> Self {
        Self::new(Shape::Sphere { center, radius }, material)
    }

    pub fn plane(normal: Vec3, offset: f32, material: Material) -> Self {
        Self::new(Shape::Plane { normal: unit_vector(normal), offset }, material)
    }

    pub fn triangle(v0: Point3, v1: Point3, v2: Point3, material: Material) -> Self {
        Self::new(Shape::Triangle { v0, v1, v2 }, material)
    }

    /// Marks the primitive as a light emitting `emission`.
    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission;
        self.light = true;
        self
    }

    pub fn with_motion(mut self, motion: Vec3) -> Self {
        self.motion = motion;
        self
    }

    fn shift(&self, time: f32) -> Vec3 {
        self.motion * time
    }

    /// Nearest hit beyond [`EPSILON`] as `(distance, normal)`, the normal
    /// facing against the ray.
    pub fn intersect(&self, r: &Ray) -> Option<(f32, Vec3)> {
        let shift = self.shift(r.time());
        match self.shape {
            Shape::Sphere { center, radius } => {
                if radius <= 0.0 {
                    return None;
                }
                let center = center + shift;
                let oc = r.origin() - center;
                let b = dot(oc, r.direction());
                let c = oc.length_squared() - radius * radius;
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let sqrtd = discriminant.sqrt();
                let mut root = -b - sqrtd;
                if root <= EPSILON {
                    root = -b + sqrtd;
                    if root <= EPSILON {
                        return None;
                    }
                }
                let outward = (r.at(root) - center) / radius;
                Some((root, face_forward(outward, r.direction())))
            }
            Shape::Plane { normal, offset } => {
                let denom = dot(normal, r.direction());
                if denom.abs() < 1e-8 {
                    return None;
                }
                let offset = offset + dot(normal, shift);
                let t = (offset - dot(normal, r.origin())) / denom;
                if t <= EPSILON {
                    return None;
                }
                Some((t, face_forward(normal, r.direction())))
            }
            Shape::Triangle { v0, v1, v2 } => {
                let e1 = v1 - v0;
                let e2 = v2 - v0;
                let v0 = v0 + shift;
                let pvec = cross(r.direction(), e2);
                let det = dot(e1, pvec);
                if det.abs() < 1e-12 {
                    return None;
                }
                let inv_det = 1.0 / det;
                let tvec = r.origin() - v0;
                let u = dot(tvec, pvec) * inv_det;
                if !(0.0..=1.0).contains(&u) {
                    return None;
                }
                let qvec = cross(tvec, e1);
                let v = dot(r.direction(), qvec) * inv_det;
                if v < 0.0 || u + v > 1.0 {
                    return None;
                }
                let t = dot(e2, qvec) * inv_det;
                if t <= EPSILON {
                    return None;
                }
                let normal = unit_vector(cross(e1, e2));
                Some((t, face_forward(normal, r.direction())))
            }
        }
    }

    /// Uniformly samples a point on the surface at `time`. Planes have no
    /// finite area and cannot be sampled.
    pub fn sample<R: Rng + ?Sized>(&self, time: f32, rng: &mut R) -> Option<LightSample> {
        let shift = self.shift(time);
        match self.shape {
            Shape::Sphere { center, radius } => {
                let normal = uniform_sphere(rng);
                Some(LightSample {
                    point: center + shift + radius * normal,
                    normal,
                    area: 4.0 * PI * radius * radius,
                })
            }
            Shape::Plane { .. } => None,
            Shape::Triangle { v0, v1, v2 } => {
                let (b0, b1) = uniform_triangle(rng);
                let n = cross(v1 - v0, v2 - v0);
                let double_area = n.length();
                let normal = if double_area > 0.0 { n / double_area } else { Vec3::ZERO };
                Some(LightSample {
                    point: b0 * v0 + b1 * v1 + (1.0 - b0 - b1) * v2 + shift,
                    normal,
                    area: 0.5 * double_area,
                })
            }
        }
    }

    /// Bounds covering the whole shutter interval, or `None` for unbounded shapes.
    pub fn bounds(&self) -> Option<Aabb> {
        let at = |time: f32| -> Option<Aabb> {
            let shift = self.shift(time);
            match self.shape {
                Shape::Sphere { center, radius } => {
                    let r = Vec3::splat(radius.max(0.0));
                    Some(Aabb::from_points(center + shift - r, center + shift + r))
                }
                Shape::Plane { .. } => None,
                Shape::Triangle { v0, v1, v2 } => {
                    let lo = v0.min(v1).min(v2) + shift;
                    let hi = v0.max(v1).max(v2) + shift;
                    Some(Aabb::from_points(lo, hi))
                }
            }
        };
        Some(Aabb::from_boxes(at(0.0)?, at(1.0)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn unit_sphere() -> Primitive {
        Primitive::sphere(Point3::ZERO, 1.0, Material::default())
    }

    #[test]
    fn sphere_hit_from_outside() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        let (t, n) = unit_sphere().intersect(&ray).unwrap();
        assert_abs_diff_eq!(t, 4.0, epsilon = 1e-5);
        assert_eq!(n, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn sphere_hit_from_inside_faces_ray() {
        let ray = Ray::new(Point3::ZERO, Vec3::new(0.0, 1.0, 0.0), 0.0);
        let (t, n) = unit_sphere().intersect(&ray).unwrap();
        assert_abs_diff_eq!(t, 1.0, epsilon = 1e-5);
        assert_eq!(n, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn ray_leaving_surface_does_not_self_intersect() {
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.0);
        assert!(unit_sphere().intersect(&ray).is_none());

        let plane = Primitive::plane(Vec3::new(0.0, 1.0, 0.0), 0.0, Material::default());
        let grazing = Ray::new(Point3::ZERO, unit_vector(Vec3::new(1.0, 1.0, 0.0)), 0.0);
        assert!(plane.intersect(&grazing).is_none());
    }

    #[test]
    fn zero_radius_sphere_never_hits() {
        let dot_light = Primitive::sphere(Point3::ZERO, 0.0, Material::default());
        let ray = Ray::new(Point3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0), 0.0);
        assert!(dot_light.intersect(&ray).is_none());
    }

    #[test]
    fn triangle_hit_and_miss() {
        let tri = Primitive::triangle(
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 1.0),
            Material::default(),
        );
        let down = Vec3::new(0.0, -1.0, 0.0);
        let (t, n) = tri.intersect(&Ray::new(Point3::new(0.0, 2.0, 0.0), down, 0.0)).unwrap();
        assert_abs_diff_eq!(t, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(n.y(), 1.0, epsilon = 1e-5);
        assert!(tri.intersect(&Ray::new(Point3::new(3.0, 2.0, 0.0), down, 0.0)).is_none());
    }

    #[test]
    fn moving_sphere_follows_time() {
        let s = unit_sphere().with_motion(Vec3::new(4.0, 0.0, 0.0));
        let ray = |time| Ray::new(Point3::new(4.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0), time);
        assert!(s.intersect(&ray(0.0)).is_none());
        assert!(s.intersect(&ray(1.0)).is_some());
        let bounds = s.bounds().unwrap();
        assert!(bounds.min.x() <= -1.0 && bounds.max.x() >= 5.0);
    }

    #[test]
    fn sphere_samples_lie_on_surface() {
        let mut rng = SmallRng::seed_from_u64(9);
        let s = Primitive::sphere(Point3::new(1.0, 2.0, 3.0), 0.5, Material::default());
        for _ in 0..100 {
            let sample = s.sample(0.0, &mut rng).unwrap();
            assert_abs_diff_eq!((sample.point - Point3::new(1.0, 2.0, 3.0)).length(), 0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(sample.area, PI, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_triangle_has_zero_area() {
        let mut rng = SmallRng::seed_from_u64(10);
        let p = Point3::new(1.0, 1.0, 1.0);
        let tri = Primitive::triangle(p, p, p, Material::default());
        assert_eq!(tri.sample(0.0, &mut rng).unwrap().area, 0.0);
        assert!(tri.intersect(&Ray::new(Point3::ZERO, unit_vector(p), 0.0)).is_none());
    }

    #[test]
    fn planes_are_unbounded_and_unsampleable() {
        let mut rng = SmallRng::seed_from_u64(11);
        let plane = Primitive::plane(Vec3::new(0.0, 1.0, 0.0), 0.0, Material::default());
        assert!(plane.bounds().is_none());
        assert!(plane.sample(0.0, &mut rng).is_none());
    }
}
