use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::vec3::Color;

/// Exposure, gamma 2 and 8-bit quantization of one resolved color.
pub fn to_rgb8(color: Color, exposure: f32) -> [u8; 3] {
    let mut out = [0u8; 3];
    for (channel, value) in out.iter_mut().zip([color.x(), color.y(), color.z()]) {
        let mut v = value * exposure;
        if !v.is_finite() {
            v = 0.0;
        }
        let v = v.max(0.0).sqrt();
        *channel = (v.clamp(0.0, 0.999) * 256.0) as u8;
    }
    out
}

pub fn to_image(width: u32, height: u32, colors: &[Color], exposure: f32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let index = y as usize * width as usize + x as usize;
        let color = colors.get(index).copied().unwrap_or(Color::ZERO);
        Rgb(to_rgb8(color, exposure))
    })
}

pub fn write_png(path: &Path, width: u32, height: u32, colors: &[Color], exposure: f32) -> Result<()> {
    to_image(width, height, colors, exposure).save(path)?;
    tracing::info!(path = %path.display(), width, height, "wrote image");
    Ok(())
}
