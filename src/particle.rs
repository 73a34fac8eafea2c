//! Particle records and the store that owns them.
//!
//! A particle's home position is fixed when it is generated; only its
//! position, velocity and tile rotation evolve while the simulation runs.
//! The store is replaced wholesale on regeneration; there is no incremental
//! add or remove.

use crate::visuals::Visual;
use glam::Vec2;
use image::RgbaImage;
use std::sync::Arc;

/// Image payload carried by particles generated in tile mode.
#[derive(Debug, Clone)]
pub struct TilePayload {
    /// Cropped sub-image. `None` when the tile has no pixels.
    pub image: Option<Arc<RgbaImage>>,
    /// Width and height of the tile in canvas pixels.
    pub extent: Vec2,
    /// Current rotation in radians.
    pub rotation: f32,
}

impl TilePayload {
    /// Longest side of the tile in canvas pixels.
    pub fn edge(&self) -> f32 {
        self.extent.x.max(self.extent.y)
    }
}

/// A single simulated particle.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Current position in canvas pixels.
    pub position: Vec2,
    /// Current velocity in canvas pixels per second.
    pub velocity: Vec2,
    /// Color, size and shape.
    pub visual: Visual,
    /// Hidden particles are simulated but never drawn.
    pub visible: bool,
    /// Present only for tile-mode particles.
    pub tile: Option<TilePayload>,
    home: Vec2,
}

impl Particle {
    /// Create a particle resting at its home position.
    pub fn new(home: Vec2, visual: Visual) -> Self {
        Self {
            position: home,
            velocity: Vec2::ZERO,
            visual,
            visible: true,
            tile: None,
            home,
        }
    }

    /// Attach a tile payload.
    pub fn with_tile(mut self, tile: TilePayload) -> Self {
        self.tile = Some(tile);
        self
    }

    /// Set the visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// The position the restoration spring pulls toward.
    #[inline]
    pub fn home(&self) -> Vec2 {
        self.home
    }

    /// Distance from the home position.
    #[inline]
    pub fn displacement(&self) -> f32 {
        self.position.distance(self.home)
    }

    /// Put the particle back at home with zero velocity.
    pub fn reset(&mut self) {
        self.position = self.home;
        self.velocity = Vec2::ZERO;
        if let Some(tile) = &mut self.tile {
            tile.rotation = 0.0;
        }
    }
}

/// Owns the particle array.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Wrap a freshly generated particle set.
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    /// Replace every particle at once.
    pub fn replace(&mut self, particles: Vec<Particle>) {
        self.particles = particles;
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Average sprite diameter, or `None` for an empty store.
    pub fn mean_size(&self) -> Option<f32> {
        if self.particles.is_empty() {
            return None;
        }
        let total: f32 = self.particles.iter().map(|p| p.visual.size).sum();
        Some(total / self.particles.len() as f32)
    }

    /// Largest distance of any particle from its home.
    ///
    /// A particle with a non-finite position counts as infinitely far.
    pub fn max_displacement(&self) -> f32 {
        self.particles
            .iter()
            .map(|p| {
                let d = p.displacement();
                if d.is_finite() {
                    d
                } else {
                    f32::INFINITY
                }
            })
            .fold(0.0, f32::max)
    }

    /// Send every particle home.
    pub fn reset_all(&mut self) {
        self.particles.iter_mut().for_each(Particle::reset);
    }
}
