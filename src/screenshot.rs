use std::path::Path;

use image::{Rgb, RgbImage};
use vibe_dmg_core::image::Image;

/// Expand a frame of color indices to RGB, `scale` pixels per dot.
pub fn render(frame: &Image, palette: &[u32; 4], scale: u32) -> RgbImage {
    assert!(scale > 0, "scale must be positive");
    let width = frame.width() as u32 * scale;
    let height = frame.height() as u32 * scale;
    RgbImage::from_fn(width, height, |x, y| {
        let color = frame.get((x / scale) as usize, (y / scale) as usize);
        let [_, r, g, b] = palette[usize::from(color & 0x03)].to_be_bytes();
        Rgb([r, g, b])
    })
}

pub fn save_png(
    frame: &Image,
    palette: &[u32; 4],
    scale: u32,
    path: &Path,
) -> Result<(), image::ImageError> {
    render(frame, palette, scale).save_with_format(path, image::ImageFormat::Png)
}
