//! Drawing particles onto surfaces.
//!
//! The engine never owns a window or a GPU context. It draws through the
//! [`DrawSurface`] trait, implemented by whatever the host renders into;
//! [`RasterSurface`] is the CPU implementation over an [`RgbaImage`], used
//! for offline export and tests.
//!
//! ```ignore
//! let mut surface = RasterSurface::new(1920, 1080)?;
//! engine.draw_with(&mut surface, Viewport::fit(engine.canvas(), surface.size()));
//! let frame: RgbaImage = surface.snapshot();
//! ```
//!
//! Draw order is particle index order. Hidden particles and particles
//! outside the visible fraction are skipped.

use crate::adaptive::is_selected;
use crate::error::SurfaceError;
use crate::particle::Particle;
use crate::recording::SampledParticle;
use crate::visuals::{blend_over, ParticleShape};
use glam::Vec2;
use image::{Rgba, RgbaImage};

/// Default largest surface edge a [`RasterSurfaceFactory`] hands out.
pub const DEFAULT_MAX_SURFACE_DIMENSION: u32 = 8192;

/// Something particles can be drawn onto.
pub trait DrawSurface {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Fill the whole surface.
    fn clear(&mut self, color: Rgba<u8>);

    /// Fill a sprite of edge length `size` centered at `center`.
    fn fill_shape(&mut self, center: Vec2, size: f32, shape: ParticleShape, color: Rgba<u8>);

    /// Draw an image tile scaled to `extent` and rotated by `rotation` radians.
    fn draw_tile(&mut self, center: Vec2, extent: Vec2, rotation: f32, tile: &RgbaImage);

    /// Copy of the current contents.
    fn snapshot(&self) -> RgbaImage;
}

/// Acquires offscreen surfaces for export.
pub trait SurfaceFactory {
    type Surface: DrawSurface;

    fn acquire(&mut self, width: u32, height: u32) -> Result<Self::Surface, SurfaceError>;
}

/// Uniform scale plus offset from canvas space to surface space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Viewport {
    pub const IDENTITY: Viewport = Viewport { scale: 1.0, offset: Vec2::ZERO };

    /// Fit `canvas` inside a `surface` of the given size, centered, keeping
    /// the aspect ratio.
    pub fn fit(canvas: Vec2, surface: (u32, u32)) -> Self {
        let target = Vec2::new(surface.0 as f32, surface.1 as f32);
        if canvas.x <= 0.0 || canvas.y <= 0.0 {
            return Self::IDENTITY;
        }
        let scale = (target.x / canvas.x).min(target.y / canvas.y);
        Self { scale, offset: (target - canvas * scale) * 0.5 }
    }

    #[inline]
    pub fn to_surface(&self, point: Vec2) -> Vec2 {
        point * self.scale + self.offset
    }
}

/// Draw `particles` with `fraction` of them selected, after clearing to
/// `background`.
pub fn draw_particles<S: DrawSurface + ?Sized>(
    surface: &mut S,
    particles: &[Particle],
    fraction: f32,
    viewport: Viewport,
    background: Rgba<u8>,
) {
    surface.clear(background);
    for (index, particle) in particles.iter().enumerate() {
        if !particle.visible || !is_selected(index, fraction) {
            continue;
        }
        let center = viewport.to_surface(particle.position);
        let size = particle.visual.size * viewport.scale;
        match &particle.tile {
            Some(tile) => match &tile.image {
                Some(image) => surface.draw_tile(center, tile.extent * viewport.scale, tile.rotation, image),
                None => surface.fill_shape(center, size, ParticleShape::Square, particle.visual.color),
            },
            None => surface.fill_shape(center, size, particle.visual.shape, particle.visual.color),
        }
    }
}

/// Draw a recorded state sample. Tiles are drawn as flat squares in their
/// average color, since samples carry no bitmaps.
pub fn draw_samples<S: DrawSurface + ?Sized>(
    surface: &mut S,
    samples: &[SampledParticle],
    viewport: Viewport,
    background: Rgba<u8>,
) {
    surface.clear(background);
    for sample in samples.iter().filter(|s| s.visible != 0) {
        surface.fill_shape(
            viewport.to_surface(Vec2::new(sample.x, sample.y)),
            sample.size * viewport.scale,
            ParticleShape::from_code(sample.shape),
            Rgba(sample.color),
        );
    }
}

/// CPU raster surface.
#[derive(Clone, Debug)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::ZeroSize { width, height });
        }
        Ok(Self { image: RgbaImage::new(width, height) })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Pixel range covering `[lo, hi)` on one axis, clipped to the surface.
    fn span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
        let start = lo.floor().max(0.0);
        let end = hi.ceil().min(limit as f32);
        if !(start < end) {
            return 0..0;
        }
        start as u32..end as u32
    }
}

impl DrawSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    fn fill_shape(&mut self, center: Vec2, size: f32, shape: ParticleShape, color: Rgba<u8>) {
        if !center.is_finite() || !size.is_finite() {
            return;
        }
        let (width, height) = self.image.dimensions();
        let half = size.max(1.0) * 0.5;
        for y in Self::span(center.y - half, center.y + half, height) {
            for x in Self::span(center.x - half, center.x + half, width) {
                let uv = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center) / half;
                if shape.covers(uv) {
                    blend_over(self.image.get_pixel_mut(x, y), color);
                }
            }
        }
    }

    fn draw_tile(&mut self, center: Vec2, extent: Vec2, rotation: f32, tile: &RgbaImage) {
        if !center.is_finite() || !extent.is_finite() || tile.width() == 0 || tile.height() == 0 {
            return;
        }
        let (width, height) = self.image.dimensions();
        let half = extent * 0.5;
        let reach = half.length();
        // Inverse rotation maps surface pixels back into tile space.
        let unrotate = Vec2::from_angle(-rotation);
        let texel = Vec2::new(tile.width() as f32, tile.height() as f32) / extent.max(Vec2::splat(1e-3));

        for y in Self::span(center.y - reach, center.y + reach, height) {
            for x in Self::span(center.x - reach, center.x + reach, width) {
                let local = unrotate.rotate(Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center);
                if local.x < -half.x || local.x >= half.x || local.y < -half.y || local.y >= half.y {
                    continue;
                }
                let src = (local + half) * texel;
                let sx = (src.x as u32).min(tile.width() - 1);
                let sy = (src.y as u32).min(tile.height() - 1);
                blend_over(self.image.get_pixel_mut(x, y), *tile.get_pixel(sx, sy));
            }
        }
    }

    fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }
}

/// Hands out [`RasterSurface`]s up to a maximum edge length.
#[derive(Clone, Copy, Debug)]
pub struct RasterSurfaceFactory {
    pub max_dimension: u32,
}

impl Default for RasterSurfaceFactory {
    fn default() -> Self {
        Self { max_dimension: DEFAULT_MAX_SURFACE_DIMENSION }
    }
}

impl RasterSurfaceFactory {
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl SurfaceFactory for RasterSurfaceFactory {
    type Surface = RasterSurface;

    fn acquire(&mut self, width: u32, height: u32) -> Result<RasterSurface, SurfaceError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(SurfaceError::TooLarge { width, height, max: self.max_dimension });
        }
        RasterSurface::new(width, height)
    }
}
