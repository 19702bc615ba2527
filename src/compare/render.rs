use std::io::Cursor;

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::compare::slider::clamp_position;

const DIVIDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DIVIDER_WIDTH: u32 = 2;

/// First column that still shows the "before" image.
pub fn split_column(width: u32, position: f32) -> u32 {
    let column = (width as f32 * clamp_position(position) / 100.0).round() as u32;
    column.min(width)
}

/// Reveals `after` from the left edge up to `position` percent of the width,
/// over `before` scaled to the same size, with a divider at the split.
pub fn composite(before: &DynamicImage, after: &DynamicImage, position: f32) -> RgbaImage {
    let after = after.to_rgba8();
    let (width, height) = after.dimensions();
    let mut canvas = before.to_rgba8();
    if canvas.dimensions() != (width, height) {
        canvas = imageops::resize(&canvas, width, height, FilterType::Triangle);
    }

    let split = split_column(width, position);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if x < split {
            *pixel = *after.get_pixel(x, y);
        }
    }

    let divider_start = split.saturating_sub(DIVIDER_WIDTH / 2);
    let divider_end = (split + DIVIDER_WIDTH / 2).min(width);
    for x in divider_start..divider_end {
        for y in 0..height {
            canvas.put_pixel(x, y, DIVIDER_COLOR);
        }
    }

    canvas
}

pub fn render_comparison_png(before: &[u8], after: &[u8], position: f32) -> Result<Vec<u8>> {
    let before = image::load_from_memory(before)
        .map_err(|err| anyhow!("Failed to decode original image: {err}"))?;
    let after = image::load_from_memory(after)
        .map_err(|err| anyhow!("Failed to decode enhanced image: {err}"))?;

    let canvas = composite(&before, &after, position);
    let mut output = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|err| anyhow!("Failed to encode comparison image: {err}"))?;
    Ok(output.into_inner())
}
