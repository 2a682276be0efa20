use crate::colors::Color;

use anyhow::{bail, Context, Result};

pub fn hex_to_color(hex: &str) -> Result<Color> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("'{}' is not a #rrggbb color", hex);
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .with_context(|| format!("'{}' is not a #rrggbb color", hex))
    };

    Ok(Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> [f32; 3] {
    let a = color1.channels();
    let b = color2.channels();
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

pub fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
