use crate::constants::MAX_JPEG_DIMENSION;
use crate::types::ExpandConfig;
use crate::writer::write_jpeg;

use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use log::info;

/// Stretches `img` vertically by `scale_y`, then lays `repeat_x` copies side
/// by side.
pub fn expand_image(img: &DynamicImage, scale_y: u32, repeat_x: u32) -> Result<RgbImage> {
    if scale_y == 0 || repeat_x == 0 {
        bail!(
            "Expansion factors must be positive (scale_y={}, repeat_x={})",
            scale_y,
            repeat_x
        );
    }

    let (width, height) = img.dimensions();
    let scaled_height = height
        .checked_mul(scale_y)
        .context("Scaled height overflows")?;
    let expanded_width = width
        .checked_mul(repeat_x)
        .context("Expanded width overflows")?;

    if expanded_width > MAX_JPEG_DIMENSION || scaled_height > MAX_JPEG_DIMENSION {
        bail!(
            "Expanded size {}x{} exceeds the JPEG limit of {} pixels per side",
            expanded_width,
            scaled_height,
            MAX_JPEG_DIMENSION
        );
    }

    let scaled = imageops::resize(
        &img.to_rgb8(),
        width,
        scaled_height,
        FilterType::CatmullRom,
    );

    let mut canvas = RgbImage::new(expanded_width, scaled_height);
    for i in 0..repeat_x {
        imageops::replace(&mut canvas, &scaled, (i * width) as i64, 0);
    }

    Ok(canvas)
}

pub fn expand_file(config: &ExpandConfig) -> Result<()> {
    let img = image::open(&config.input_path)
        .with_context(|| format!("Failed to open {}", config.input_path.display()))?;
    let expanded = expand_image(&img, config.scale_y, config.repeat_x)?;

    info!(
        "expand: {} {}x{} -> {}x{}",
        config.input_path.display(),
        img.width(),
        img.height(),
        expanded.width(),
        expanded.height()
    );

    write_jpeg(
        &expanded,
        &config.output_path,
        config.dpi,
        config.jpeg_quality,
    )
}
