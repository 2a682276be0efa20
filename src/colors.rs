use palette::{FromColor, Hsv, Srgb};

/// An 8-bit RGB color. Equality is exact, no two distinct triples are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn hsv(self) -> Hsv {
        let rgb: Srgb<f32> = Srgb::new(self.red, self.green, self.blue).into_format();
        Hsv::from_color(rgb)
    }

    /// HSV value channel on the 0-255 scale.
    pub fn brightness(self) -> u8 {
        (self.hsv().value * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Hue in degrees, `[0, 360)`. Greys report 0.
    pub fn hue(self) -> f32 {
        self.hsv().hue.into_positive_degrees()
    }

    pub fn channels(self) -> [f32; 3] {
        [self.red as f32, self.green as f32, self.blue as f32]
    }
}

impl From<[u8; 3]> for Color {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self::new(red, green, blue)
    }
}

pub const PASTEL: [Color; 3] = [
    Color::new(255, 200, 220),
    Color::new(200, 220, 255),
    Color::new(220, 255, 200),
];

pub fn builtin_palette(name: &str) -> Option<Vec<Color>> {
    match name {
        "pastel" => Some(PASTEL.to_vec()),
        _ => None,
    }
}
