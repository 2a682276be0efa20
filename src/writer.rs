use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::RgbImage;
use log::info;
use tempfile::NamedTempFile;

/// Encodes `img` as JPEG and writes it to `path`, replacing any existing file.
///
/// The JPEG is encoded in memory and staged in a sibling temporary file that
/// is renamed over `path` only once fully written, so a failure at any point
/// leaves the previous file untouched and no partial output behind.
pub fn write_jpeg(img: &RgbImage, path: &Path, dpi: Option<u16>, quality: u8) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        bail!(
            "Refusing to write {}: a {}x{} image cannot be encoded as JPEG",
            path.display(),
            img.width(),
            img.height()
        );
    }

    let mut encoded = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
        if let Some(dpi) = dpi {
            encoder.set_pixel_density(PixelDensity::dpi(dpi));
        }
        encoder
            .encode_image(img)
            .with_context(|| format!("Failed to encode {}", path.display()))?;
    }

    replace_file(path, |file| file.write_all(&encoded))?;

    info!(
        "write: saved {}x{} JPEG to {} ({} bytes)",
        img.width(),
        img.height(),
        path.display(),
        encoded.len()
    );
    Ok(())
}

/// Stages `write` into a temporary file beside `path`, then renames it into
/// place. The staged file is removed if writing or renaming fails.
fn replace_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to stage a file in {}", parent.display()))?;
    write(staged.as_file_mut()).with_context(|| format!("Failed to write {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
