//! Seed derivation and warping functions shared by the light estimator and
//! the integrator.
//!
//! The hash constants match the ones in `gpu/renderer.wgsl`, so both backends
//! derive their per-pixel generators from the same `(x, y, seed)` triple even
//! though the generators themselves differ.

use std::f32::consts::PI;

use rand::Rng;

use crate::vec3::Vec3;

/// Density of [`uniform_hemisphere`] with respect to solid angle.
pub const UNIFORM_HEMISPHERE_PDF: f32 = 1.0 / (2.0 * PI);

const PASS_SEED_STRIDE: u32 = 0x9E37_79B9;

pub fn rng_hash(x: u32) -> u32 {
    let mut v = x;
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}

pub fn rng_init(x: u32, y: u32, seed: u32) -> u32 {
    rng_hash(
        x.wrapping_mul(1973)
            .wrapping_add(y.wrapping_mul(9277))
            .wrapping_add(seed.wrapping_mul(26699))
            .wrapping_add(9119),
    )
}

/// Seed for the independent generator of the unit at pixel `(x, y)`.
pub fn unit_seed(x: u32, y: u32, seed: u32) -> u64 {
    let hi = rng_init(x, y, seed);
    let lo = rng_hash(hi ^ x.rotate_left(16) ^ y);
    ((hi as u64) << 32) | lo as u64
}

/// Decorrelates successive full-image passes that share one call seed.
pub fn pass_seed(seed: u32, pass: u32) -> u32 {
    seed ^ pass.wrapping_mul(PASS_SEED_STRIDE)
}

/// Uniform direction over the `z >= 0` hemisphere.
pub fn uniform_hemisphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.r#gen();
    let phi = 2.0 * PI * rng.r#gen::<f32>();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction over the whole sphere.
pub fn uniform_sphere<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z = 1.0 - 2.0 * rng.r#gen::<f32>();
    let phi = 2.0 * PI * rng.r#gen::<f32>();
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform barycentric coordinates `(b0, b1)` over a triangle.
pub fn uniform_triangle<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    let su = rng.r#gen::<f32>().sqrt();
    let v: f32 = rng.r#gen();
    (1.0 - su, v * su)
}

/// Point on the disk of radius `width` with density proportional to
/// `exp(-falloff * r^2)`, by inverting the radial CDF. A non-positive
/// `falloff` gives a uniform disk.
pub fn truncated_gaussian_disk(width: f32, falloff: f32, u1: f32, u2: f32) -> (f32, f32) {
    let a = falloff * width * width;
    let r = if a > 1e-4 {
        let mass = -(-a).exp_m1();
        (-(-u1 * mass).ln_1p() / falloff).sqrt()
    } else {
        width * u1.sqrt()
    };
    let phi = 2.0 * PI * u2;
    (r * phi.cos(), r * phi.sin())
}
