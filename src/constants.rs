pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_DIR: &str = ".config/book-background";
pub const OUTPUT_FILE_NAME: &str = "background.jpg";
pub const SOURCE_EXTENSION: &str = ".jpg";

/// k-means seed, fixed so palettes are reproducible between runs.
pub const KMEANS_SEED: u64 = 42;

pub const DEFAULT_IMAGE_FOLDER: &str = "book_compilation";
pub const DEFAULT_BRIGHTNESS_THRESHOLD: u8 = 50;
pub const DEFAULT_CLUSTERS_PER_IMAGE: usize = 5;
pub const DEFAULT_KMEANS_RESTARTS: usize = 10;
pub const DEFAULT_KMEANS_ITERATIONS: usize = 100;
pub const DEFAULT_SAMPLE_EDGE: u32 = 128;
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 1200;
pub const DEFAULT_NOISE_RANGE: u8 = 10;
pub const DEFAULT_FADE_STRENGTH: f32 = 0.3;
pub const DEFAULT_BLUR_KERNEL: u32 = 15;
pub const DEFAULT_BLUR_SIGMA: f32 = 5.0;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
/// Largest width or height a baseline JPEG can store.
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;
pub const DEFAULT_FALLBACK_PALETTE: &str = "pastel";

pub const DEFAULT_SCALE_Y: u32 = 10;
pub const DEFAULT_REPEAT_X: u32 = 10;
