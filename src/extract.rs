use crate::colors::Color;
use crate::constants::KMEANS_SEED;
use crate::types::ExtractSettings;
use crate::utils::clamp_channel;

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Point = [f32; 3];

/// Dominant light colors of one image file.
///
/// An image that cannot be opened or decoded contributes nothing; the
/// failure is logged and the run carries on.
pub fn extract_colors(path: &Path, settings: &ExtractSettings) -> Vec<Color> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(err) => {
            warn!(
                "extract: skipping unreadable image {}: {}",
                path.display(),
                err
            );
            return Vec::new();
        }
    };

    let colors = dominant_colors(&img, settings);
    debug!(
        "extract: {} kept {} of {} clusters",
        path.display(),
        colors.len(),
        settings.clusters_per_image
    );
    colors
}

pub fn dominant_colors(img: &DynamicImage, settings: &ExtractSettings) -> Vec<Color> {
    let (width, height) = img.dimensions();
    let edge = settings.sample_edge;
    let rgb = if edge > 0 && width.max(height) > edge {
        // nearest sampling, so every clustered pixel is a real source pixel
        let scale = edge as f64 / width.max(height) as f64;
        let sample_width = ((width as f64 * scale).round() as u32).max(1);
        let sample_height = ((height as f64 * scale).round() as u32).max(1);
        imageops::resize(&img.to_rgb8(), sample_width, sample_height, FilterType::Nearest)
    } else {
        img.to_rgb8()
    };

    let pixels: Vec<Point> = rgb
        .pixels()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    let mut rng = StdRng::seed_from_u64(KMEANS_SEED);
    kmeans(
        &pixels,
        settings.clusters_per_image,
        settings.kmeans_restarts,
        settings.kmeans_iterations,
        &mut rng,
    )
    .into_iter()
    .map(|centroid| Color::from(centroid.map(clamp_channel)))
    .filter(|c| c.brightness() > settings.brightness_threshold)
    .collect()
}

/// k-means with k-means++ seeding. The restart with the lowest inertia wins.
/// Returns at most `k` centroids, fewer only when there are fewer points.
pub fn kmeans<R: Rng>(
    points: &[Point],
    k: usize,
    restarts: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Vec<Point> {
    let k = k.min(points.len());
    if k == 0 {
        return Vec::new();
    }

    let mut best: Option<(f32, Vec<Point>)> = None;
    for _ in 0..restarts.max(1) {
        let mut centroids = seed_centroids(points, k, rng);
        let inertia = refine(points, &mut centroids, max_iterations);
        if best.as_ref().map_or(true, |(lowest, _)| inertia < *lowest) {
            best = Some((inertia, centroids));
        }
    }

    best.map(|(_, centroids)| centroids).unwrap_or_default()
}

fn dist_sq(a: &Point, b: &Point) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn nearest(point: &Point, centroids: &[Point]) -> (usize, f32) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, dist_sq(point, c)))
        .fold((0, f32::MAX), |best, candidate| {
            if candidate.1 < best.1 {
                candidate
            } else {
                best
            }
        })
}

fn seed_centroids<R: Rng>(points: &[Point], k: usize, rng: &mut R) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..points.len())];
    centroids.push(first);

    let mut distances: Vec<f32> = points.iter().map(|p| dist_sq(p, &first)).collect();
    while centroids.len() < k {
        let total: f32 = distances.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            distances
                .iter()
                .position(|&d| {
                    if target < d {
                        true
                    } else {
                        target -= d;
                        false
                    }
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.gen_range(0..points.len())
        };

        let centroid = points[next];
        for (d, p) in distances.iter_mut().zip(points) {
            *d = d.min(dist_sq(p, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Lloyd iterations until assignments settle. Returns the final inertia.
fn refine(points: &[Point], centroids: &mut [Point], max_iterations: usize) -> f32 {
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations {
        let mut changed = false;
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];

        for (p, assigned) in points.iter().zip(assignments.iter_mut()) {
            let (i, _) = nearest(p, centroids);
            if *assigned != i {
                *assigned = i;
                changed = true;
            }
            sums[i][0] += p[0] as f64;
            sums[i][1] += p[1] as f64;
            sums[i][2] += p[2] as f64;
            counts[i] += 1;
        }

        if !changed {
            break;
        }

        for (centroid, (sum, &count)) in centroids.iter_mut().zip(sums.iter().zip(&counts)) {
            // empty clusters keep their previous position
            if count > 0 {
                let n = count as f64;
                *centroid = [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32];
            }
        }
    }

    points.iter().map(|p| nearest(p, centroids).1).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn settings(clusters: usize) -> ExtractSettings {
        ExtractSettings {
            clusters_per_image: clusters,
            ..ExtractSettings::default()
        }
    }

    fn split_image(top: [u8; 3], bottom: [u8; 3]) -> DynamicImage {
        let img = RgbImage::from_fn(20, 10, |_, y| if y < 5 { Rgb(top) } else { Rgb(bottom) });
        DynamicImage::ImageRgb8(img)
    }

    fn ramp_image() -> DynamicImage {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn white_image_with_one_cluster_is_white() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([255, 255, 255])));
        assert_eq!(dominant_colors(&img, &settings(1)), vec![Color::new(255, 255, 255)]);
    }

    #[test]
    fn two_flat_regions_give_both_colors() {
        let img = split_image([240, 180, 200], [120, 200, 250]);
        let mut colors = dominant_colors(&img, &settings(2));
        colors.sort_by_key(|c| c.red);
        assert_eq!(colors, vec![Color::new(120, 200, 250), Color::new(240, 180, 200)]);
    }

    #[test]
    fn dark_clusters_are_dropped() {
        let img = split_image([20, 30, 40], [230, 230, 210]);
        assert_eq!(dominant_colors(&img, &settings(2)), vec![Color::new(230, 230, 210)]);

        let black = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 10, 10])));
        assert!(dominant_colors(&black, &settings(3)).is_empty());
    }

    #[test]
    fn every_kept_color_clears_the_threshold() {
        let settings = ExtractSettings {
            clusters_per_image: 8,
            brightness_threshold: 120,
            ..ExtractSettings::default()
        };
        for color in dominant_colors(&ramp_image(), &settings) {
            assert!(color.brightness() > 120, "{:?} is too dark", color);
        }
    }

    #[test]
    fn never_more_colors_than_clusters() {
        let img = ramp_image();
        assert!(dominant_colors(&img, &settings(1)).len() <= 1);
        assert!(dominant_colors(&img, &settings(3)).len() <= 3);
    }

    #[test]
    fn extraction_is_reproducible() {
        let img = ramp_image();
        assert_eq!(dominant_colors(&img, &settings(5)), dominant_colors(&img, &settings(5)));
    }

    #[test]
    fn large_images_are_downsampled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(600, 400, Rgb([200, 220, 255])));
        assert_eq!(dominant_colors(&img, &settings(2))[0], Color::new(200, 220, 255));
    }

    #[test]
    fn downsampling_never_invents_colors() {
        let light = Rgb([250, 210, 120]);
        let cool = Rgb([120, 200, 250]);
        let checker = RgbImage::from_fn(301, 257, |x, y| if (x + y) % 2 == 0 { light } else { cool });
        let img = DynamicImage::ImageRgb8(checker);

        let colors = dominant_colors(&img, &settings(3));
        assert!(!colors.is_empty());
        for color in colors {
            assert!(
                color == Color::from(light.0) || color == Color::from(cool.0),
                "{:?} is not a source pixel",
                color
            );
        }
    }

    #[test]
    fn unreadable_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(extract_colors(&path, &settings(5)).is_empty());
        assert!(extract_colors(&dir.path().join("missing.jpg"), &settings(5)).is_empty());
    }

    #[test]
    fn kmeans_caps_k_at_point_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(kmeans(&points, 5, 3, 10, &mut rng).len(), 2);
        assert!(kmeans(&[], 5, 3, 10, &mut rng).is_empty());
    }
}
