//! Multithreaded CPU backend.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::bvh::Bvh;
use crate::camera::{Camera, CameraFrame};
use crate::config::{RenderMode, RenderOptions};
use crate::error::{RenderError, Result};
use crate::integrator::trace_path;
use crate::renderer::{allocate_accum, check_dimensions, check_output, Renderer, Rgba};
use crate::sampling::{pass_seed, unit_seed};
use crate::scene::{Intersector, SceneSnapshot};
use crate::vec3::Color;

const MISS_GRAY: Rgba = [0.5, 0.5, 0.5, 1.0];

/// Traversal cost that maps to a heat value of 1.
const HEAT_SCALE: f32 = 32.0;

enum Accel {
    Linear(SceneSnapshot),
    Bvh(Bvh),
}

pub struct CpuRenderer {
    accel: Accel,
    accum: Option<Vec<Rgba>>,
    width: u32,
    height: u32,
    /// Passes run since the last `init`.
    passes: u32,
}

impl CpuRenderer {
    pub fn new(snapshot: SceneSnapshot, bvh: bool) -> Self {
        let accel = if bvh { Accel::Bvh(Bvh::new(snapshot)) } else { Accel::Linear(snapshot) };
        Self { accel, accum: None, width: 0, height: 0, passes: 0 }
    }
}

fn unit_coords(index: usize, width: u32) -> (u32, u32) {
    let width = width as usize;
    ((index % width) as u32, (index / width) as u32)
}

fn normals_pass<S: Intersector>(scene: &S, accum: &mut [Rgba], width: u32, frame: &CameraFrame) {
    accum.par_iter_mut().enumerate().for_each(|(index, pixel)| {
        let (x, y) = unit_coords(index, width);
        let ray = frame.ray(x as f32 + 0.5, y as f32 + 0.5, 0.0);
        *pixel = match scene.intersect(&ray) {
            Some(hit) => (0.5 * hit.normal + Color::splat(0.5)).extend(1.0),
            None => MISS_GRAY,
        };
    });
}

fn complexity_pass<S: Intersector>(scene: &S, accum: &mut [Rgba], width: u32, frame: &CameraFrame) {
    accum.par_iter_mut().enumerate().for_each(|(index, pixel)| {
        let (x, y) = unit_coords(index, width);
        let ray = frame.ray(x as f32 + 0.5, y as f32 + 0.5, 0.0);
        let (_, cost) = scene.intersect_cost(&ray);
        let heat = cost as f32 / HEAT_SCALE;
        *pixel = [heat, heat, heat, 1.0];
    });
}

/// Adds one path sample. Non-finite radiance is dropped but still counts
/// toward the weight so every pixel keeps the same sample count.
fn accumulate(pixel: &mut Rgba, radiance: Color, clamp: Color) {
    let radiance = if radiance.is_finite() { radiance.min(clamp) } else { Color::ZERO };
    pixel[0] += radiance.x();
    pixel[1] += radiance.y();
    pixel[2] += radiance.z();
    pixel[3] += 1.0;
}

fn trace_pass<S: Intersector>(
    scene: &S,
    accum: &mut [Rgba],
    width: u32,
    frame: &CameraFrame,
    options: &RenderOptions,
    seed: u32,
) {
    let clamp = Color::splat(options.clamp);
    accum.par_iter_mut().enumerate().for_each(|(index, pixel)| {
        let (x, y) = unit_coords(index, width);
        let mut rng = SmallRng::seed_from_u64(unit_seed(x, y, seed));

        let (dx, dy) = options.filter.offset(rng.r#gen(), rng.r#gen());
        let time: f32 = rng.r#gen();
        let ray = frame.ray(x as f32 + 0.5 + dx, y as f32 + 0.5 + dy, time);

        accumulate(pixel, trace_path(scene, ray, options.max_depth, &mut rng), clamp);
    });
}

impl Renderer for CpuRenderer {
    fn name(&self) -> &'static str {
        match self.accel {
            Accel::Linear(_) => "cpu",
            Accel::Bvh(_) => "cpu-bvh",
        }
    }

    fn init(&mut self, width: u32, height: u32) -> Result<()> {
        let pixels = check_dimensions(width, height)?;
        self.accum = None;
        self.accum = Some(allocate_accum("accumulator", pixels)?);
        self.width = width;
        self.height = height;
        self.passes = 0;
        tracing::info!(width, height, threads = rayon::current_num_threads(), "cpu accumulator reset");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(mode = ?options.mode, spp = options.samples_per_pixel))]
    fn render(&mut self, camera: &Camera, options: &RenderOptions, output: &mut [Rgba]) -> Result<()> {
        let Self { accel, accum, width, height, passes } = self;
        let accum = accum.as_mut().ok_or(RenderError::NotInitialized)?;
        check_output(accum.len(), output)?;
        let frame = camera.frame(*width, *height);

        match options.mode {
            RenderMode::Normals => match &*accel {
                Accel::Linear(scene) => normals_pass(scene, accum, *width, &frame),
                Accel::Bvh(scene) => normals_pass(scene, accum, *width, &frame),
            },
            RenderMode::Complexity => match &*accel {
                Accel::Linear(scene) => complexity_pass(scene, accum, *width, &frame),
                Accel::Bvh(scene) => complexity_pass(scene, accum, *width, &frame),
            },
            RenderMode::PathTrace => {
                for _ in 0..options.samples_per_pixel {
                    let seed = pass_seed(options.seed, *passes);
                    match &*accel {
                        Accel::Linear(scene) => trace_pass(scene, accum, *width, &frame, options, seed),
                        Accel::Bvh(scene) => trace_pass(scene, accum, *width, &frame, options, seed),
                    }
                    tracing::debug!(pass = *passes, "cpu pass done");
                    *passes = passes.wrapping_add(1);
                }
            }
        }

        output.copy_from_slice(accum);
        Ok(())
    }

    fn teardown(&mut self) {
        self.accum = None;
        self.passes = 0;
    }
}
