//! Source images for particle generation.
//!
//! The engine never decodes files. Hosts decode images themselves and hand
//! over RGBA pixel buffers; this module wraps those buffers and provides a
//! few procedural images, including the placeholder used when no image is
//! loaded.
//!
//! # Quick Start
//!
//! ```ignore
//! use ipre::source::SourceImage;
//!
//! // From a host-decoded buffer
//! let img = SourceImage::from_rgba(bytes, 640, 480).expect("size mismatch");
//!
//! // Procedural
//! let checker = SourceImage::checkerboard(64, 8, [255, 255, 255, 255], [0, 0, 0, 255]);
//! ```

use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Edge length of the placeholder image.
pub const PLACEHOLDER_SIZE: u32 = 128;

/// A decoded image shared between the engine and recordings.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    /// Wrap an already decoded image.
    pub fn new(image: RgbaImage) -> Self {
        Self { pixels: Arc::new(image) }
    }

    /// Create an image from raw RGBA data (4 bytes per pixel, row-major).
    ///
    /// Returns `None` if `data` does not hold exactly `width * height` pixels.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // 2x2 checkerboard
    /// let data = vec![
    ///     255, 255, 255, 255,  0, 0, 0, 255,
    ///     0, 0, 0, 255,        255, 255, 255, 255,
    /// ];
    /// let img = SourceImage::from_rgba(data, 2, 2).unwrap();
    /// ```
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::new)
    }

    /// Deterministic stand-in used when no image has been supplied.
    ///
    /// A diagonal color gradient with a soft light disc in the middle, so
    /// both generation modes produce varied, recognizable particles.
    pub fn placeholder() -> Self {
        let size = PLACEHOLDER_SIZE;
        let center = (size as f32 - 1.0) * 0.5;
        let img = RgbaImage::from_fn(size, size, |x, y| {
            let t = (x + y) as f32 / (2 * (size - 1)) as f32;
            let mut r = lerp_u8(40, 220, t) as f32;
            let mut g = lerp_u8(90, 60, t) as f32;
            let mut b = lerp_u8(200, 80, t) as f32;
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let d = (dx * dx + dy * dy).sqrt() / (size as f32 * 0.3);
            if d < 1.0 {
                let k = 1.0 - d * d;
                r += (255.0 - r) * k;
                g += (255.0 - g) * k;
                b += (255.0 - b) * k;
            }
            Rgba([r as u8, g as u8, b as u8, 255])
        });
        Self::new(img)
    }

    /// Horizontal gradient from `start` to `end`, `height` rows tall.
    pub fn gradient(width: u32, height: u32, start: [u8; 4], end: [u8; 4]) -> Self {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1).max(1) as f32;
            Rgba([
                lerp_u8(start[0], end[0], t),
                lerp_u8(start[1], end[1], t),
                lerp_u8(start[2], end[2], t),
                lerp_u8(start[3], end[3], t),
            ])
        });
        Self::new(img)
    }

    /// Checkerboard of `cell_size` squares.
    pub fn checkerboard(size: u32, cell_size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let cell_size = cell_size.max(1);
        let img = RgbaImage::from_fn(size, size, |x, y| {
            if (x / cell_size + y / cell_size) % 2 == 0 {
                Rgba(color1)
            } else {
                Rgba(color2)
            }
        });
        Self::new(img)
    }

    /// Grayscale hash noise.
    pub fn noise(width: u32, height: u32, seed: u32) -> Self {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let v = hash_noise(x, y, seed);
            Rgba([v, v, v, 255])
        });
        Self::new(img)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether the image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether two handles share the same buffer.
    pub fn ptr_eq(&self, other: &SourceImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl From<RgbaImage> for SourceImage {
    fn from(image: RgbaImage) -> Self {
        SourceImage::new(image)
    }
}

/// Resolve an optional image to something generation can use.
///
/// Missing or empty images fall back to [`SourceImage::placeholder`].
pub fn resolve(image: Option<&SourceImage>) -> SourceImage {
    match image {
        Some(img) if !img.is_empty() => img.clone(),
        Some(_) => {
            log::warn!("source image is empty, using placeholder");
            SourceImage::placeholder()
        }
        None => SourceImage::placeholder(),
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round() as u8
}

fn hash_noise(x: u32, y: u32, seed: u32) -> u8 {
    let mut n = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(seed.wrapping_mul(1013904223));
    n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    n ^= n >> 16;
    (n & 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_size() {
        assert!(SourceImage::from_rgba(vec![0; 16], 2, 2).is_some());
        assert!(SourceImage::from_rgba(vec![0; 15], 2, 2).is_none());
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        let a = SourceImage::placeholder();
        let b = SourceImage::placeholder();
        assert_eq!(a.width(), PLACEHOLDER_SIZE);
        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
    }

    #[test]
    fn test_resolve_falls_back_to_placeholder() {
        let empty = SourceImage::new(RgbaImage::new(0, 0));
        assert_eq!(resolve(Some(&empty)).width(), PLACEHOLDER_SIZE);
        assert_eq!(resolve(None).width(), PLACEHOLDER_SIZE);
        let checker = SourceImage::checkerboard(8, 2, [255; 4], [0, 0, 0, 255]);
        assert!(resolve(Some(&checker)).ptr_eq(&checker));
    }

    #[test]
    fn test_checkerboard_pattern() {
        let img = SourceImage::checkerboard(4, 2, [255; 4], [0, 0, 0, 255]);
        assert_eq!(img.pixels().get_pixel(0, 0).0, [255; 4]);
        assert_eq!(img.pixels().get_pixel(2, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.pixels().get_pixel(2, 2).0, [255; 4]);
    }

    #[test]
    fn test_gradient_endpoints() {
        let img = SourceImage::gradient(5, 1, [0, 0, 0, 255], [200, 100, 50, 255]);
        assert_eq!(img.pixels().get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.pixels().get_pixel(4, 0).0, [200, 100, 50, 255]);
    }
}
