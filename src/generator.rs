//! Particle generation from a source image.
//!
//! Two strategies, selected by [`AnimationMode`]:
//!
//! | Mode | One particle per | Visual |
//! |------|------------------|--------|
//! | [`AnimationMode::PixelSample`] | sampled pixel | flat sprite in the pixel's color |
//! | [`AnimationMode::TileGrid`] | grid cell | cropped sub-image of the cell |
//!
//! Both are deterministic: the same image, canvas and settings always give
//! the same particles in the same order.
//!
//! The image is fitted into the canvas (aspect preserved), scaled by
//! `image_scale` and centered; home positions live in canvas pixels.

use crate::particle::{Particle, TilePayload};
use crate::settings::{clamp_grid_size, AnimationMode, GenerationSettings, SamplingStrategy};
use crate::source::{self, SourceImage};
use crate::visuals::{average_color, luminance, ParticleShape, Visual};
use glam::Vec2;
use image::imageops;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Pixels with alpha below this never become particles.
pub const ALPHA_CUTOFF: u8 = 10;

/// Maps image pixel coordinates to canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub scale: f32,
    pub offset: Vec2,
}

impl Layout {
    /// Fit an image into the canvas, then apply `image_scale` around the center.
    pub fn fit(image_width: u32, image_height: u32, canvas: Vec2, image_scale: f32) -> Self {
        let iw = image_width.max(1) as f32;
        let ih = image_height.max(1) as f32;
        let scale = (canvas.x / iw).min(canvas.y / ih) * image_scale;
        let offset = (canvas - Vec2::new(iw, ih) * scale) * 0.5;
        Self { scale, offset }
    }

    #[inline]
    pub fn to_canvas(&self, image_point: Vec2) -> Vec2 {
        self.offset + image_point * self.scale
    }
}

/// Builds particle sets for a fixed canvas.
#[derive(Debug, Clone)]
pub struct Generator {
    canvas: Vec2,
    settings: GenerationSettings,
    shape: ParticleShape,
}

impl Generator {
    pub fn new(canvas: Vec2, settings: GenerationSettings, shape: ParticleShape) -> Self {
        Self { canvas, settings, shape }
    }

    /// Generate with the configured mode. A missing image uses the placeholder.
    pub fn generate(&self, image: Option<&SourceImage>) -> Vec<Particle> {
        let image = source::resolve(image);
        let particles = match self.settings.mode {
            AnimationMode::PixelSample => self.generate_from_image(&image, self.settings.particle_density),
            AnimationMode::TileGrid => self.generate_from_tiles(&image, self.settings.grid_size),
        };
        log::debug!(
            "generated {} particles ({:?}) from {}x{} image",
            particles.len(),
            self.settings.mode,
            image.width(),
            image.height()
        );
        particles
    }

    /// Pixel-sample mode: up to `density` particles, one per sampled pixel.
    pub fn generate_from_image(&self, image: &SourceImage, density: u32) -> Vec<Particle> {
        if image.is_empty() || density == 0 {
            return Vec::new();
        }
        let layout = Layout::fit(image.width(), image.height(), self.canvas, self.settings.image_scale);
        let samples = match self.settings.sampling {
            SamplingStrategy::Uniform => uniform_samples(image, density),
            SamplingStrategy::ContentWeighted => weighted_samples(image, density, self.settings.seed),
        };

        let area = image.width() as f32 * image.height() as f32;
        let spacing = (area / density as f32).sqrt().max(1.0);
        let size = if self.settings.particle_size > 0.0 {
            self.settings.particle_size
        } else {
            (spacing * layout.scale).max(1.0)
        };

        samples
            .into_iter()
            .filter_map(|(x, y)| {
                let color = *image.pixels().get_pixel(x, y);
                if color.0[3] < ALPHA_CUTOFF {
                    return None;
                }
                let home = layout.to_canvas(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                Some(Particle::new(home, Visual { color, size, shape: self.shape }))
            })
            .collect()
    }

    /// Tile-grid mode: exactly `grid_size²` particles covering the image.
    ///
    /// `grid_size` is clamped into the supported range first. Tiles are
    /// enumerated row-major.
    pub fn generate_from_tiles(&self, image: &SourceImage, grid_size: u32) -> Vec<Particle> {
        let grid = clamp_grid_size(grid_size);
        let layout = Layout::fit(image.width(), image.height(), self.canvas, self.settings.image_scale);
        let xs = tile_edges(image.width(), grid);
        let ys = tile_edges(image.height(), grid);

        let mut particles = Vec::with_capacity((grid * grid) as usize);
        for row in 0..grid as usize {
            for col in 0..grid as usize {
                let (x0, x1) = (xs[col], xs[col + 1]);
                let (y0, y1) = (ys[row], ys[row + 1]);
                let (w, h) = (x1 - x0, y1 - y0);
                let has_pixels = w > 0 && h > 0;

                let crop = has_pixels
                    .then(|| Arc::new(imageops::crop_imm(image.pixels(), x0, y0, w, h).to_image()));
                let extent = Vec2::new(w as f32, h as f32) * layout.scale;
                let center = Vec2::new(x0 as f32 + w as f32 * 0.5, y0 as f32 + h as f32 * 0.5);
                let visual = Visual {
                    color: average_color(image.pixels(), x0, y0, w, h),
                    size: extent.x.max(extent.y),
                    shape: ParticleShape::Square,
                };

                let particle = Particle::new(layout.to_canvas(center), visual)
                    .with_tile(TilePayload { image: crop, extent, rotation: 0.0 })
                    .with_visible(has_pixels);
                particles.push(particle);
            }
        }
        particles
    }
}

/// Cell boundaries along one axis: `grid + 1` ascending edges from 0 to `len`.
///
/// Cells are `ceil(len / grid)` wide with the remainder in the last cell.
/// When that would leave trailing cells empty (tiny images), boundaries are
/// spread proportionally instead.
pub fn tile_edges(len: u32, grid: u32) -> Vec<u32> {
    let grid = grid.max(1);
    let cell = len.div_ceil(grid);
    if cell > 0 && cell * (grid - 1) < len {
        (0..=grid).map(|k| (k * cell).min(len)).collect()
    } else {
        (0..=grid)
            .map(|k| ((k as u64 * len as u64) / grid as u64) as u32)
            .collect()
    }
}

fn uniform_samples(image: &SourceImage, density: u32) -> Vec<(u32, u32)> {
    let (iw, ih) = (image.width(), image.height());
    let area = iw as f64 * ih as f64;
    let step = (area / density as f64).sqrt().max(1.0);
    let cols = ((iw as f64 / step).floor() as u32).clamp(1, iw);
    let rows = ((ih as f64 / step).floor() as u32).clamp(1, ih);
    let dx = iw as f64 / cols as f64;
    let dy = ih as f64 / rows as f64;

    let mut samples = Vec::with_capacity((cols * rows) as usize);
    for r in 0..rows {
        let y = (((r as f64 + 0.5) * dy) as u32).min(ih - 1);
        for c in 0..cols {
            let x = (((c as f64 + 0.5) * dx) as u32).min(iw - 1);
            samples.push((x, y));
        }
    }
    samples.truncate(density as usize);
    samples
}

fn weighted_samples(image: &SourceImage, density: u32, seed: u64) -> Vec<(u32, u32)> {
    let (iw, ih) = (image.width(), image.height());
    let px = image.pixels();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(density as usize);
    let max_attempts = density as usize * 30;

    for _ in 0..max_attempts {
        if samples.len() >= density as usize {
            break;
        }
        let x = rng.gen_range(0..iw);
        let y = rng.gen_range(0..ih);
        let here = *px.get_pixel(x, y);
        let right = *px.get_pixel((x + 1).min(iw - 1), y);
        let below = *px.get_pixel(x, (y + 1).min(ih - 1));
        let contrast = (luminance(here) - luminance(right)).abs() + (luminance(here) - luminance(below)).abs();
        let weight = (here.0[3] as f32 / 255.0) * (0.25 + contrast * 4.0).min(1.0);
        if rng.gen::<f32>() < weight {
            samples.push((x, y));
        }
    }
    // Stable enumeration: row-major regardless of draw order.
    samples.sort_unstable_by_key(|&(x, y)| (y, x));
    samples.dedup();
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn generator(mode: AnimationMode, canvas: Vec2) -> Generator {
        let settings = GenerationSettings { mode, ..GenerationSettings::default() };
        Generator::new(canvas, settings, ParticleShape::Circle)
    }

    #[test]
    fn test_tile_edges_use_ceil_cells_with_remainder_last() {
        assert_eq!(tile_edges(100, 8), vec![0, 13, 26, 39, 52, 65, 78, 91, 100]);
        assert_eq!(tile_edges(100, 4), vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn test_tile_edges_fall_back_for_tiny_images() {
        let edges = tile_edges(10, 8);
        assert_eq!(edges.len(), 9);
        assert_eq!(edges[0], 0);
        assert_eq!(edges[8], 10);
        assert!(edges.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_tile_grid_count_and_centers() {
        let img = SourceImage::checkerboard(100, 10, [255; 4], [0, 0, 0, 255]);
        let gen = generator(AnimationMode::TileGrid, Vec2::new(100.0, 100.0));
        let particles = gen.generate_from_tiles(&img, 4);
        assert_eq!(particles.len(), 16);
        assert_eq!(particles[0].home(), Vec2::new(12.5, 12.5));
        assert_eq!(particles[5].home(), Vec2::new(37.5, 37.5));
        assert!(particles.iter().all(|p| p.visible && p.tile.is_some()));
    }

    #[test]
    fn test_tile_grid_size_is_clamped() {
        let img = SourceImage::placeholder();
        let gen = generator(AnimationMode::TileGrid, Vec2::new(128.0, 128.0));
        assert_eq!(gen.generate_from_tiles(&img, 1000).len(), 64 * 64);
        assert_eq!(gen.generate_from_tiles(&img, 0).len(), 4);
    }

    #[test]
    fn test_remainder_tiles_are_smaller() {
        let img = SourceImage::placeholder(); // 128 px, grid 10 -> cells of 13, last 11
        let gen = generator(AnimationMode::TileGrid, Vec2::new(128.0, 128.0));
        let particles = gen.generate_from_tiles(&img, 10);
        let last = particles.last().unwrap().tile.as_ref().unwrap();
        let first = particles[0].tile.as_ref().unwrap();
        assert_eq!(first.extent, Vec2::new(13.0, 13.0));
        assert_eq!(last.extent, Vec2::new(11.0, 11.0));
        assert_eq!(last.image.as_ref().unwrap().dimensions(), (11, 11));
    }

    #[test]
    fn test_tile_color_is_cell_average() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        for y in 0..2 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgba([200, 100, 50, 255]));
            }
        }
        let gen = generator(AnimationMode::TileGrid, Vec2::new(4.0, 4.0));
        let particles = gen.generate_from_tiles(&SourceImage::new(img), 2);
        assert_eq!(particles[0].visual.color, Rgba([200, 100, 50, 255]));
        assert_eq!(particles[3].visual.color, Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_pixel_sample_respects_density() {
        let img = SourceImage::placeholder();
        let gen = generator(AnimationMode::PixelSample, Vec2::new(256.0, 256.0));
        let particles = gen.generate_from_image(&img, 500);
        assert!(!particles.is_empty());
        assert!(particles.len() <= 500);
        // Scaled 2x into the canvas.
        assert!(particles.iter().all(|p| p.home().x >= 0.0 && p.home().x <= 256.0));
    }

    #[test]
    fn test_pixel_sample_skips_transparent_pixels() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        for y in 0..10 {
            for x in 0..5 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        let gen = generator(AnimationMode::PixelSample, Vec2::new(10.0, 10.0));
        let particles = gen.generate_from_image(&SourceImage::new(img), 100);
        assert_eq!(particles.len(), 50);
        assert!(particles.iter().all(|p| p.home().x > 5.0));
    }

    #[test]
    fn test_generation_is_repeatable() {
        let img = SourceImage::noise(64, 48, 7);
        for sampling in [SamplingStrategy::Uniform, SamplingStrategy::ContentWeighted] {
            let settings = GenerationSettings { sampling, ..GenerationSettings::default() };
            let gen = Generator::new(Vec2::new(320.0, 240.0), settings, ParticleShape::Square);
            let a = gen.generate_from_image(&img, 800);
            let b = gen.generate_from_image(&img, 800);
            assert_eq!(a.len(), b.len());
            assert!(a.iter().zip(&b).all(|(p, q)| p.home() == q.home()));
        }
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        let gen = generator(AnimationMode::TileGrid, Vec2::new(128.0, 128.0));
        assert_eq!(gen.generate(None).len(), 16 * 16);
    }

    #[test]
    fn test_layout_centers_letterboxed_image() {
        let layout = Layout::fit(100, 50, Vec2::new(200.0, 200.0), 1.0);
        assert_eq!(layout.scale, 2.0);
        assert_eq!(layout.offset, Vec2::new(0.0, 50.0));
    }
}
