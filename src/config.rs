use crate::colors::{builtin_palette, Color};
use crate::constants::*;
use crate::types::{
    AppConfig, BlurSettings, Command, ExpandConfig, ExtractSettings, PaletteOrdering,
    RenderSettings,
};
use crate::utils::hex_to_color;

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgMatches, Command as Cli};
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use serde_derive::Deserialize;

pub type AppError = anyhow::Error;

#[derive(Debug, Deserialize)]
struct SerializedAppConfig {
    image_folder: String,
    output_path: Option<String>,
    brightness_threshold: u8,
    clusters_per_image: usize,
    kmeans_restarts: usize,
    kmeans_iterations: usize,
    sample_edge: u32,
    output_width: u32,
    output_height: u32,
    noise_range: u8,
    fade_strength: f32,
    blur_kernel: u32,
    blur_sigma: f32,
    dpi: Option<u16>,
    jpeg_quality: u8,
    ordering: String,
    fallback_palette: String,
    seed: Option<u64>,
    scale_y: u32,
    repeat_x: u32,
}

#[derive(Debug, Deserialize)]
struct PaletteFile {
    colors: Vec<String>,
}

fn load_config(
    user_config: Option<&Path>,
    config_path: Option<&str>,
) -> Result<SerializedAppConfig, config::ConfigError> {
    let mut builder = ConfigBuilder::default();

    builder = builder
        .set_default("image_folder", DEFAULT_IMAGE_FOLDER)?
        .set_default("brightness_threshold", DEFAULT_BRIGHTNESS_THRESHOLD as i64)?
        .set_default("clusters_per_image", DEFAULT_CLUSTERS_PER_IMAGE as i64)?
        .set_default("kmeans_restarts", DEFAULT_KMEANS_RESTARTS as i64)?
        .set_default("kmeans_iterations", DEFAULT_KMEANS_ITERATIONS as i64)?
        .set_default("sample_edge", DEFAULT_SAMPLE_EDGE as i64)?
        .set_default("output_width", DEFAULT_WIDTH as i64)?
        .set_default("output_height", DEFAULT_HEIGHT as i64)?
        .set_default("noise_range", DEFAULT_NOISE_RANGE as i64)?
        .set_default("fade_strength", DEFAULT_FADE_STRENGTH as f64)?
        .set_default("blur_kernel", DEFAULT_BLUR_KERNEL as i64)?
        .set_default("blur_sigma", DEFAULT_BLUR_SIGMA as f64)?
        .set_default("jpeg_quality", DEFAULT_JPEG_QUALITY as i64)?
        .set_default("ordering", "brightness")?
        .set_default("fallback_palette", DEFAULT_FALLBACK_PALETTE)?
        .set_default("scale_y", DEFAULT_SCALE_Y as i64)?
        .set_default("repeat_x", DEFAULT_REPEAT_X as i64)?;

    if let Some(path) = user_config.filter(|path| path.exists()) {
        builder = ConfigBuilder::<DefaultState>::add_source(
            builder,
            File::from(path.to_path_buf()).required(false),
        );
    }

    if let Some(path) = config_path {
        builder = builder.add_source(File::with_name(path).required(true));
    }

    let config = builder.build()?;

    config.try_deserialize()
}

/// Resolves `fallback_palette`: a built-in name, a comma separated list of
/// `#rrggbb` colors, or the name of a `<name>.toml` file in `config_dir`.
fn load_palette(source: &str, config_dir: &Path) -> Result<Vec<Color>> {
    if let Some(colors) = builtin_palette(source) {
        return Ok(colors);
    }

    let colors = if source.contains('#') || source.contains(',') {
        source.split(',')
            .map(hex_to_color)
            .collect::<Result<Vec<_>>>()?
    } else {
        let palette_path = config_dir.join(format!("{}.toml", source));
        if !palette_path.exists() {
            bail!("Palette '{}' not found", source);
        }
        let palette_str = fs::read_to_string(&palette_path)
            .with_context(|| format!("Failed to read {}", palette_path.display()))?;
        let palette: PaletteFile = toml::from_str(&palette_str)
            .with_context(|| format!("Failed to parse {}", palette_path.display()))?;
        palette
            .colors
            .iter()
            .map(|hex| hex_to_color(hex))
            .collect::<Result<Vec<_>>>()?
    };

    if colors.is_empty() {
        bail!("Palette '{}' has no colors", source);
    }
    Ok(colors)
}

fn parse_override<T>(matches: &ArgMatches, name: &str, fallback: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match matches.value_of(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Failed to parse {}: {}", name, e)),
        None => Ok(fallback),
    }
}

fn parse_optional<T>(matches: &ArgMatches, name: &str, fallback: Option<T>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match matches.value_of(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Failed to parse {}: {}", name, e)),
        None => Ok(fallback),
    }
}

fn value_arg(id: &'static str, long: &'static str, value_name: &'static str) -> Arg<'static> {
    Arg::new(id)
        .long(long)
        .value_name(value_name)
        .takes_value(true)
}

pub fn build_cli() -> Cli<'static> {
    Cli::new("Book Background")
        .version(VERSION)
        .author("Taylor Beeston")
        .about("Builds soft gradient backgrounds from the colors of a photo folder")
        .after_help("Settings are read from ~/.config/book-background/config.toml when it exists, then from --config, then from flags. fallback_palette may name a built-in palette ('pastel'), list colors ('#ffc8dc,#c8dcff'), or name a TOML file with a `colors` array in the config directory.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("/path/to/config.toml")
                .help("Sets a custom config file")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            Cli::new("generate")
                .about("Generates a gradient background from the images in a folder")
                .arg(
                    value_arg("image_folder", "folder", "DIR")
                        .short('f')
                        .help("Folder of .jpg source images"),
                )
                .arg(
                    value_arg("output_path", "output", "FILE")
                        .short('o')
                        .help("Output JPEG [default: <folder>/background.jpg]"),
                )
                .arg(
                    value_arg("brightness_threshold", "brightness-threshold", "VALUE")
                        .help("[0-255] Colors at or below this HSV value are dropped"),
                )
                .arg(
                    value_arg("clusters_per_image", "clusters", "K")
                        .short('k')
                        .help("Number of k-means clusters per image"),
                )
                .arg(value_arg("output_width", "width", "PIXELS").help("Canvas width"))
                .arg(value_arg("output_height", "height", "PIXELS").help("Canvas height"))
                .arg(
                    value_arg("noise_range", "noise", "AMOUNT")
                        .help("[0-255] Per-row noise is drawn from -AMOUNT..=AMOUNT"),
                )
                .arg(
                    value_arg("fade_strength", "fade", "STRENGTH")
                        .help("[0.0-1.0] How much darker the bottom row gets, 0 disables"),
                )
                .arg(
                    value_arg("blur_kernel", "blur-kernel", "SIZE")
                        .help("Odd Gaussian kernel size, 0 or 1 disables the blur"),
                )
                .arg(value_arg("blur_sigma", "blur-sigma", "SIGMA").help("Gaussian spread"))
                .arg(
                    value_arg("ordering", "ordering", "ORDER")
                        .help("Palette ordering: 'brightness' or 'hue'"),
                )
                .arg(
                    value_arg("fallback_palette", "fallback-palette", "PALETTE")
                        .help("Colors to use when no source colors qualify"),
                )
                .arg(value_arg("dpi", "dpi", "DPI").help("Print resolution stored in the JPEG"))
                .arg(value_arg("jpeg_quality", "quality", "QUALITY").help("[1-100] JPEG quality"))
                .arg(value_arg("seed", "seed", "SEED").help("Seed for reproducible noise")),
        )
        .subcommand(
            Cli::new("expand")
                .about("Stretches an image vertically and tiles it horizontally")
                .arg(
                    Arg::new("image_path")
                        .help("Path to the image you'd like to expand")
                        .required(true)
                        .index(1),
                )
                .arg(
                    value_arg("output_path", "output", "FILE")
                        .short('o')
                        .help("Output JPEG [default: overwrite the input]"),
                )
                .arg(value_arg("scale_y", "scale-y", "FACTOR").help("Vertical stretch factor"))
                .arg(value_arg("repeat_x", "repeat-x", "COUNT").help("Horizontal tile count"))
                .arg(value_arg("dpi", "dpi", "DPI").help("Print resolution stored in the JPEG"))
                .arg(value_arg("jpeg_quality", "quality", "QUALITY").help("[1-100] JPEG quality")),
        )
}

fn resolve_generate(
    matches: &ArgMatches,
    config: SerializedAppConfig,
    config_dir: &Path,
) -> Result<AppConfig> {
    let image_folder = PathBuf::from(
        matches
            .value_of("image_folder")
            .unwrap_or(&config.image_folder),
    );
    let output_path = matches
        .value_of("output_path")
        .map(PathBuf::from)
        .or_else(|| config.output_path.as_deref().map(PathBuf::from))
        .unwrap_or_else(|| image_folder.join(OUTPUT_FILE_NAME));

    let extract = ExtractSettings {
        clusters_per_image: parse_override(matches, "clusters_per_image", config.clusters_per_image)?,
        brightness_threshold: parse_override(
            matches,
            "brightness_threshold",
            config.brightness_threshold,
        )?,
        kmeans_restarts: config.kmeans_restarts,
        kmeans_iterations: config.kmeans_iterations,
        sample_edge: config.sample_edge,
    };
    if extract.clusters_per_image == 0 {
        bail!("clusters_per_image must be at least 1");
    }

    let fade_strength: f32 = parse_override(matches, "fade_strength", config.fade_strength)?;
    if !fade_strength.is_finite() || fade_strength < 0.0 {
        bail!("fade_strength must be a non-negative number, got {}", fade_strength);
    }

    let blur_kernel: u32 = parse_override(matches, "blur_kernel", config.blur_kernel)?;
    let blur_sigma: f32 = parse_override(matches, "blur_sigma", config.blur_sigma)?;
    if blur_kernel > 1 && blur_kernel % 2 == 0 {
        bail!("blur_kernel must be odd, got {}", blur_kernel);
    }

    let render = RenderSettings {
        width: parse_override(matches, "output_width", config.output_width)?,
        height: parse_override(matches, "output_height", config.output_height)?,
        noise_range: parse_override(matches, "noise_range", config.noise_range)?,
        fade_strength,
        blur: (blur_kernel > 1).then(|| BlurSettings {
            kernel: blur_kernel,
            sigma: blur_sigma,
        }),
    };
    for (name, size) in [("output_width", render.width), ("output_height", render.height)] {
        if size > MAX_JPEG_DIMENSION {
            bail!(
                "{} must be at most {} pixels for JPEG output, got {}",
                name,
                MAX_JPEG_DIMENSION,
                size
            );
        }
    }

    let ordering: PaletteOrdering = matches
        .value_of("ordering")
        .unwrap_or(&config.ordering)
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let fallback_palette = load_palette(
        matches
            .value_of("fallback_palette")
            .unwrap_or(&config.fallback_palette),
        config_dir,
    )?;

    Ok(AppConfig {
        image_folder,
        output_path,
        extract,
        ordering,
        render,
        fallback_palette,
        dpi: parse_optional(matches, "dpi", config.dpi)?.filter(|&dpi| dpi > 0),
        jpeg_quality: parse_quality(matches, config.jpeg_quality)?,
        seed: parse_optional(matches, "seed", config.seed)?,
    })
}

fn resolve_expand(matches: &ArgMatches, config: SerializedAppConfig) -> Result<ExpandConfig> {
    let input_path = PathBuf::from(
        matches
            .value_of("image_path")
            .context("An image path is required")?,
    );
    let output_path = matches
        .value_of("output_path")
        .map(PathBuf::from)
        .unwrap_or_else(|| input_path.clone());

    Ok(ExpandConfig {
        input_path,
        output_path,
        scale_y: parse_override(matches, "scale_y", config.scale_y)?,
        repeat_x: parse_override(matches, "repeat_x", config.repeat_x)?,
        dpi: parse_optional(matches, "dpi", config.dpi)?.filter(|&dpi| dpi > 0),
        jpeg_quality: parse_quality(matches, config.jpeg_quality)?,
    })
}

fn parse_quality(matches: &ArgMatches, fallback: u8) -> Result<u8> {
    let quality = parse_override(matches, "jpeg_quality", fallback)?;
    if !(1..=100).contains(&quality) {
        bail!("jpeg_quality must be within 1-100, got {}", quality);
    }
    Ok(quality)
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from(""))
        .join(CONFIG_DIR)
}

pub fn from_matches(
    matches: &ArgMatches,
    user_config: Option<&Path>,
    config_dir: &Path,
) -> Result<Command> {
    let (name, sub_matches) = matches
        .subcommand()
        .context("A subcommand is required")?;

    let config = load_config(user_config, sub_matches.value_of("config"))?;

    match name {
        "generate" => Ok(Command::Generate(resolve_generate(
            sub_matches,
            config,
            config_dir,
        )?)),
        "expand" => Ok(Command::Expand(resolve_expand(sub_matches, config)?)),
        other => bail!("Unknown subcommand '{}'", other),
    }
}

pub fn init() -> Result<Command> {
    let matches = build_cli().get_matches();
    let config_dir = config_dir();
    let user_config = config_dir.join("config.toml");

    from_matches(&matches, Some(&user_config), &config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::PASTEL;

    fn resolve(args: &[&str], config_dir: &Path) -> Result<Command> {
        let mut argv = vec!["book-background"];
        argv.extend_from_slice(args);
        let matches = build_cli().try_get_matches_from(argv)?;
        from_matches(&matches, None, config_dir)
    }

    fn generate(args: &[&str], config_dir: &Path) -> AppConfig {
        match resolve(args, config_dir).unwrap() {
            Command::Generate(config) => config,
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn defaults_match_builtin_settings() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(generate(&["generate"], dir.path()), AppConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = generate(
            &[
                "generate", "--folder", "photos", "--width", "100", "--height", "300",
                "-k", "1", "--dpi", "350", "--ordering", "hue", "--seed", "7", "--noise",
                "0", "--blur-kernel", "0",
            ],
            dir.path(),
        );

        assert_eq!(config.image_folder, PathBuf::from("photos"));
        assert_eq!(config.output_path, PathBuf::from("photos").join("background.jpg"));
        assert_eq!((config.render.width, config.render.height), (100, 300));
        assert_eq!(config.extract.clusters_per_image, 1);
        assert_eq!(config.dpi, Some(350));
        assert_eq!(config.ordering, PaletteOrdering::Hue);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.render.noise_range, 0);
        assert_eq!(config.render.blur, None);
    }

    #[test]
    fn config_file_sits_between_defaults_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "clusters_per_image = 3\noutput_width = 640\nfallback_palette = \"#112233,#445566\"\noutput_path = \"out/bg.jpg\"\n",
        )
        .unwrap();
        let path = path.to_str().unwrap();

        let config = generate(&["generate", "-c", path, "--width", "320"], dir.path());
        assert_eq!(config.extract.clusters_per_image, 3);
        assert_eq!(config.render.width, 320);
        assert_eq!(config.output_path, PathBuf::from("out/bg.jpg"));
        assert_eq!(
            config.fallback_palette,
            vec![Color::new(0x11, 0x22, 0x33), Color::new(0x44, 0x55, 0x66)]
        );
    }

    #[test]
    fn missing_custom_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(resolve(&["generate", "-c", missing.to_str().unwrap()], dir.path()).is_err());
    }

    #[test]
    fn named_palette_file_is_loaded_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("sunset.toml"),
            "colors = [\"#ffd1a6\", \"#ffb3c1\"]\n",
        )
        .unwrap();

        let config = generate(&["generate", "--fallback-palette", "sunset"], dir.path());
        assert_eq!(
            config.fallback_palette,
            vec![Color::new(0xff, 0xd1, 0xa6), Color::new(0xff, 0xb3, 0xc1)]
        );
        assert_eq!(
            generate(&["generate", "--fallback-palette", "pastel"], dir.path()).fallback_palette,
            PASTEL.to_vec()
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for args in [
            &["generate", "--blur-kernel", "14"][..],
            &["generate", "--width", "65536"][..],
            &["generate", "--height", "70000"][..],
            &["generate", "--ordering", "random"][..],
            &["generate", "--fallback-palette", "missing"][..],
            &["generate", "--fallback-palette", "#12345"][..],
            &["generate", "--width", "wide"][..],
            &["generate", "-k", "0"][..],
            &["generate", "--quality", "0"][..],
            &["generate", "--fade", "-1"][..],
        ] {
            assert!(resolve(args, dir.path()).is_err(), "{:?} should fail", args);
        }
    }

    #[test]
    fn largest_jpeg_canvas_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let config = generate(&["generate", "--width", "65535", "--height", "1"], dir.path());
        assert_eq!((config.render.width, config.render.height), (65535, 1));
    }

    #[test]
    fn zero_dpi_means_no_tag() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(generate(&["generate", "--dpi", "0"], dir.path()).dpi, None);
    }

    #[test]
    fn expand_defaults_to_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let command = resolve(&["expand", "bg.jpg", "--scale-y", "3"], dir.path()).unwrap();
        assert_eq!(
            command,
            Command::Expand(ExpandConfig {
                input_path: PathBuf::from("bg.jpg"),
                output_path: PathBuf::from("bg.jpg"),
                scale_y: 3,
                repeat_x: DEFAULT_REPEAT_X,
                dpi: None,
                jpeg_quality: DEFAULT_JPEG_QUALITY,
            })
        );
    }

    #[test]
    fn subcommand_is_required() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve(&[], dir.path()).is_err());
    }
}
