use crate::colors::{Color, PASTEL};
use crate::constants::*;

use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteOrdering {
    /// Lightest first, so the top of the canvas is the lightest.
    #[default]
    Brightness,
    /// Hue ascending, ties broken lightest first.
    Hue,
}

impl FromStr for PaletteOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brightness" | "lightness" => Ok(PaletteOrdering::Brightness),
            "hue" => Ok(PaletteOrdering::Hue),
            other => Err(format!(
                "Unknown ordering '{}' (expected 'brightness' or 'hue')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    pub clusters_per_image: usize,
    pub brightness_threshold: u8,
    pub kmeans_restarts: usize,
    pub kmeans_iterations: usize,
    pub sample_edge: u32,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            clusters_per_image: DEFAULT_CLUSTERS_PER_IMAGE,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            kmeans_restarts: DEFAULT_KMEANS_RESTARTS,
            kmeans_iterations: DEFAULT_KMEANS_ITERATIONS,
            sample_edge: DEFAULT_SAMPLE_EDGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurSettings {
    pub kernel: u32,
    pub sigma: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub noise_range: u8,
    pub fade_strength: f32,
    pub blur: Option<BlurSettings>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            noise_range: DEFAULT_NOISE_RANGE,
            fade_strength: DEFAULT_FADE_STRENGTH,
            blur: Some(BlurSettings {
                kernel: DEFAULT_BLUR_KERNEL,
                sigma: DEFAULT_BLUR_SIGMA,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub image_folder: PathBuf,
    pub output_path: PathBuf,
    pub extract: ExtractSettings,
    pub ordering: PaletteOrdering,
    pub render: RenderSettings,
    pub fallback_palette: Vec<Color>,
    pub dpi: Option<u16>,
    pub jpeg_quality: u8,
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let image_folder = PathBuf::from(DEFAULT_IMAGE_FOLDER);
        Self {
            output_path: image_folder.join(OUTPUT_FILE_NAME),
            image_folder,
            extract: ExtractSettings::default(),
            ordering: PaletteOrdering::default(),
            render: RenderSettings::default(),
            fallback_palette: PASTEL.to_vec(),
            dpi: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpandConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub scale_y: u32,
    pub repeat_x: u32,
    pub dpi: Option<u16>,
    pub jpeg_quality: u8,
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Generate(AppConfig),
    Expand(ExpandConfig),
}
