//! Backend-independent renderer contract.

use std::str::FromStr;

use crate::camera::Camera;
use crate::config::RenderOptions;
use crate::cpu::CpuRenderer;
use crate::error::{RenderError, Result};
use crate::gpu::GpuRenderer;
use crate::scene::SceneSnapshot;

/// Accumulated `(r, g, b, weight)` for one pixel.
pub type Rgba = [f32; 4];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" | "wgpu" => Ok(Self::Gpu),
            _ => Err(()),
        }
    }
}

/// A renderer owns an accumulator of `width * height` [`Rgba`] values.
///
/// `init` allocates and zeroes the accumulator; calling it again resets
/// accumulation. `render` runs `options.samples_per_pixel` passes, adding
/// `(radiance, 1)` per pass to each pixel, then copies the accumulator into
/// `output`. `teardown` releases everything; `render` afterwards fails with
/// [`RenderError::NotInitialized`] until `init` runs again.
pub trait Renderer: Send {
    fn name(&self) -> &'static str;

    fn init(&mut self, width: u32, height: u32) -> Result<()>;

    fn render(&mut self, camera: &Camera, options: &RenderOptions, output: &mut [Rgba]) -> Result<()>;

    fn teardown(&mut self);
}

pub fn create_renderer(backend: Backend, snapshot: SceneSnapshot, bvh: bool) -> Result<Box<dyn Renderer>> {
    let renderer: Box<dyn Renderer> = match backend {
        Backend::Cpu => Box::new(CpuRenderer::new(snapshot, bvh)),
        Backend::Gpu => Box::new(GpuRenderer::new(snapshot)?),
    };
    tracing::info!(backend = renderer.name(), "created renderer");
    Ok(renderer)
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    Ok(width as usize * height as usize)
}

/// Zeroed `(r, g, b, weight)` buffer that reports allocation failure instead
/// of aborting.
pub(crate) fn allocate_accum(what: &'static str, pixels: usize) -> Result<Vec<Rgba>> {
    let mut accum = Vec::new();
    accum.try_reserve_exact(pixels).map_err(|_| RenderError::Allocation {
        what,
        bytes: pixels.saturating_mul(std::mem::size_of::<Rgba>()),
    })?;
    accum.resize(pixels, [0.0; 4]);
    Ok(accum)
}

pub(crate) fn check_output(expected: usize, output: &[Rgba]) -> Result<()> {
    if output.len() != expected {
        return Err(RenderError::OutputSize { expected, actual: output.len() });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_accumulator_is_an_error() {
        let err = allocate_accum("accumulator", usize::MAX / 8).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { what: "accumulator", .. }), "{err}");

        let accum = allocate_accum("accumulator", 6).unwrap();
        assert_eq!(accum, vec![[0.0; 4]; 6]);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(check_dimensions(0, 4), Err(RenderError::InvalidDimensions { width: 0, height: 4 })));
        assert_eq!(check_dimensions(3, 2).unwrap(), 6);
    }
}
