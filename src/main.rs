mod aggregate;
mod colors;
mod config;
mod constants;
mod expand;
mod extract;
mod gradient;
mod order;
mod types;
mod utils;
mod writer;

use crate::aggregate::aggregate;
use crate::config::{init, AppError};
use crate::expand::expand_file;
use crate::gradient::render_gradient;
use crate::order::order_palette;
use crate::types::{AppConfig, Command};
use crate::writer::write_jpeg;

use anyhow::Result;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match init()? {
        Command::Generate(config) => {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"),
            );

            let result = generate_background(&config, &pb);

            if result.is_ok() {
                pb.finish_with_message(format!(
                    "Finished: {} (Saved to: {})",
                    config.image_folder.display(),
                    config.output_path.display()
                ));
            } else {
                pb.finish_with_message(format!("Failed: {}", config.image_folder.display()));
            }

            result
        }
        Command::Expand(config) => expand_file(&config),
    }
}

fn generate_background(config: &AppConfig, pb: &ProgressBar) -> Result<()> {
    let palette = aggregate(
        &config.image_folder,
        &config.output_path,
        &config.extract,
        pb,
    );
    info!("palette: {} colors extracted", palette.len());
    debug!("palette: {:?}", palette.colors());

    let colors = palette.or_fallback(&config.fallback_palette);
    let ordered = order_palette(&colors, config.ordering);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let background = render_gradient(&ordered, &config.render, &mut rng, pb)?;

    write_jpeg(
        &background,
        &config.output_path,
        config.dpi,
        config.jpeg_quality,
    )
}
