use crate::colors::Color;
use crate::constants::SOURCE_EXTENSION;
use crate::extract::extract_colors;
use crate::types::ExtractSettings;

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{info, warn};

/// Colors gathered across every source image of one run.
///
/// Encounter order is preserved and duplicates are kept, so colors that
/// recur across many photos carry more weight in the gradient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I: IntoIterator<Item = Color>>(&mut self, contribution: I) {
        self.colors.extend(contribution);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn or_fallback(self, fallback: &[Color]) -> Vec<Color> {
        if self.is_empty() {
            info!(
                "aggregate: no qualifying colors, using fallback palette of {}",
                fallback.len()
            );
            fallback.to_vec()
        } else {
            self.colors
        }
    }
}

/// `.jpg` files in `folder`, minus the output file itself.
pub fn source_images(folder: &Path, output_path: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("aggregate: cannot read folder {}: {}", folder.display(), err);
            return Vec::new();
        }
    };

    let excluded = output_path.file_name();
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.ends_with(SOURCE_EXTENSION))
        })
        .filter(|path| path.file_name() != excluded)
        .collect();

    paths.sort();
    paths
}

pub fn aggregate(
    folder: &Path,
    output_path: &Path,
    settings: &ExtractSettings,
    pb: &ProgressBar,
) -> Palette {
    let images = source_images(folder, output_path);
    info!(
        "aggregate: {} source images in {}",
        images.len(),
        folder.display()
    );

    pb.set_length(images.len() as u64);
    let mut palette = Palette::new();
    for path in &images {
        pb.set_message(format!("Extracting: {}", path.display()));
        palette.extend(extract_colors(path, settings));
        pb.inc(1);
    }

    palette
}
