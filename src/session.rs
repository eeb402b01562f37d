//! Progressive rendering session: owns a renderer, the camera and the
//! accumulated image, and decides when accumulation restarts.

use crate::camera::Camera;
use crate::config::{RenderMode, RenderOptions};
use crate::error::Result;
use crate::renderer::{allocate_accum, check_dimensions, Renderer, Rgba};
use crate::vec3::Color;

pub struct RenderSession {
    renderer: Box<dyn Renderer>,
    camera: Camera,
    width: u32,
    height: u32,
    mode: Option<RenderMode>,
    pixels: Vec<Rgba>,
}

impl RenderSession {
    pub fn new(mut renderer: Box<dyn Renderer>, camera: Camera, width: u32, height: u32) -> Result<Self> {
        renderer.init(width, height)?;
        let pixels = allocate_accum("session image", check_dimensions(width, height)?)?;
        Ok(Self { renderer, camera, width, height, mode: None, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Restarts accumulation from zero.
    pub fn reset(&mut self) -> Result<()> {
        self.renderer.init(self.width, self.height)?;
        self.pixels.fill([0.0; 4]);
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let pixels = allocate_accum("session image", check_dimensions(width, height)?)?;
        if let Err(err) = self.renderer.init(width, height) {
            // The renderer may already have released its old buffers.
            if let Err(restore) = self.reset() {
                tracing::warn!(error = %restore, "could not restore previous size");
            }
            return Err(err);
        }
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        Ok(())
    }

    /// Moving the camera invalidates everything accumulated so far.
    pub fn set_camera(&mut self, camera: Camera) -> Result<()> {
        if camera == self.camera {
            return Ok(());
        }
        self.camera = camera;
        self.reset()
    }

    /// Runs one `render` call, resetting first when the mode changed since the
    /// previous call.
    pub fn render(&mut self, options: &RenderOptions) -> Result<()> {
        if self.mode.is_some_and(|mode| mode != options.mode) {
            tracing::info!(mode = ?options.mode, "render mode changed, resetting");
            self.reset()?;
        }
        self.mode = Some(options.mode);
        self.renderer.render(&self.camera, options, &mut self.pixels)
    }

    /// Accumulated weight, equal for every pixel.
    pub fn sample_count(&self) -> u32 {
        self.pixels.first().map_or(0, |p| p[3] as u32)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Weight-divided color per pixel.
    pub fn resolve(&self) -> Vec<Color> {
        self.pixels
            .iter()
            .map(|p| {
                if p[3] > 0.0 {
                    Color::new(p[0], p[1], p[2]) / p[3]
                } else {
                    Color::ZERO
                }
            })
            .collect()
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.renderer.teardown();
    }
}
