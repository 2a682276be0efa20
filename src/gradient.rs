use crate::colors::Color;
use crate::types::RenderSettings;
use crate::utils::{clamp_channel, interpolate_color};

use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use indicatif::ProgressBar;
use rand::Rng;

pub fn render_gradient<R: Rng>(
    palette: &[Color],
    settings: &RenderSettings,
    rng: &mut R,
    pb: &ProgressBar,
) -> Result<RgbImage> {
    if palette.is_empty() {
        bail!("Cannot render a gradient from an empty palette");
    }

    let (width, height) = (settings.width, settings.height);
    let mut canvas = RgbImage::new(width, height);
    if width == 0 || height == 0 {
        return Ok(canvas);
    }

    // First pass: one blended, noisy, faded color per row
    pb.set_message("Pass 1: Blending palette rows");
    pb.set_length(height as u64);
    pb.set_position(0);
    let noise = settings.noise_range as i32;
    for y in 0..height {
        let t = y as f32 / height as f32;
        let base = row_color(palette, y, height);
        let fade = 1.0 - settings.fade_strength * t;

        let mut pixel = [0u8; 3];
        for (channel, value) in pixel.iter_mut().zip(base) {
            let noisy = clamp_channel(value + rng.gen_range(-noise..=noise) as f32);
            *channel = clamp_channel(noisy as f32 * fade);
        }

        for x in 0..width {
            canvas.put_pixel(x, y, Rgb(pixel));
        }
        pb.inc(1);
    }

    // Second pass: smooth out banding between rows
    if let Some(blur) = settings.blur.filter(|blur| blur.kernel > 1) {
        pb.set_message("Pass 2: Smoothing bands");
        canvas = gaussian_blur(&canvas, blur.kernel, blur.sigma);
    }

    Ok(canvas)
}

/// Pre-noise color of `row`: a linear blend of the two palette entries
/// around the row's relative position.
pub fn row_color(palette: &[Color], row: u32, height: u32) -> [f32; 3] {
    match palette {
        [] => [0.0; 3],
        [only] => only.channels(),
        _ => {
            let t = if height == 0 {
                0.0
            } else {
                row as f32 / height as f32
            };
            let p = t * (palette.len() - 1) as f32;
            let lo = (p.floor().max(0.0) as usize).min(palette.len() - 2);
            let frac = (p - lo as f32).clamp(0.0, 1.0);
            interpolate_color(palette[lo], palette[lo + 1], frac)
        }
    }
}

/// Normalized 1-D Gaussian weights. A non-positive sigma is derived
/// from the kernel size.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample (`dcb|abcd|cba`).
fn reflect_101(index: i64, len: i64) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = index.rem_euclid(period);
    (if i >= len { period - i } else { i }) as usize
}

/// Separable Gaussian blur, horizontal then vertical.
pub fn gaussian_blur(img: &RgbImage, kernel_size: u32, sigma: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || kernel_size <= 1 {
        return img.clone();
    }

    let kernel = gaussian_kernel(kernel_size, sigma);
    let radius = (kernel_size / 2) as i64;

    let mut horizontal = vec![[0.0f32; 3]; width as usize * height as usize];
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as i64 + k as i64 - radius, width as i64);
                let pixel = img.get_pixel(sx as u32, y);
                for c in 0..3 {
                    acc[c] += pixel[c] as f32 * weight;
                }
            }
            horizontal[y as usize * width as usize + x as usize] = acc;
        }
    }

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0.0f32; 3];
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect_101(y as i64 + k as i64 - radius, height as i64);
            let sample = horizontal[sy * width as usize + x as usize];
            for c in 0..3 {
                acc[c] += sample[c] * weight;
            }
        }
        Rgb([
            clamp_channel(acc[0]),
            clamp_channel(acc[1]),
            clamp_channel(acc[2]),
        ])
    })
}
