use crate::ray::Ray;
use crate::vec3::{cross, unit_vector, Point3, Vec3};

/// Pinhole camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3,
    pub target: Point3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 1.0, 5.0),
            target: Point3::new(0.0, 1.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 35.0,
        }
    }
}

/// Per-resolution viewport derived from a [`Camera`]. Pixel `(0, 0)` is the
/// top-left corner of the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub origin: Point3,
    pub pixel00: Point3,
    pub pixel_delta_u: Vec3,
    pub pixel_delta_v: Vec3,
}

impl Camera {
    pub fn frame(&self, width: u32, height: u32) -> CameraFrame {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;

        let theta = self.fov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width / height);

        let w = unit_vector(self.position - self.target);
        let u = unit_vector(cross(self.up, w));
        let v = cross(w, u);

        let viewport_u = viewport_width * u;
        let viewport_v = viewport_height * -v;

        let pixel_delta_u = viewport_u / width;
        let pixel_delta_v = viewport_v / height;

        let viewport_upper_left = self.position - w - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00 = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        CameraFrame { origin: self.position, pixel00, pixel_delta_u, pixel_delta_v }
    }
}

impl CameraFrame {
    /// Ray through continuous raster position `(px, py)`; pixel `(x, y)` spans
    /// `[x, x + 1) x [y, y + 1)`.
    pub fn ray(&self, px: f32, py: f32, time: f32) -> Ray {
        let pixel_sample =
            self.pixel00 + (px - 0.5) * self.pixel_delta_u + (py - 0.5) * self.pixel_delta_v;
        Ray::new(self.origin, unit_vector(pixel_sample - self.origin), time)
    }
}
