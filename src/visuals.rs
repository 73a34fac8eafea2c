//! Visual attributes of particles.
//!
//! This module holds what a particle looks like, separate from how it moves:
//! its shape, color and size, plus a couple of color helpers used by the
//! generator.

use glam::Vec2;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Shape used when a particle is drawn as a flat sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticleShape {
    /// Filled circle (default).
    #[default]
    Circle,

    /// Axis-aligned square.
    Square,

    /// Equilateral triangle pointing up.
    Triangle,
}

impl ParticleShape {
    /// Whether a point inside the sprite quad is covered by this shape.
    ///
    /// `uv` is in `[-1, 1]` on both axes, `y` pointing down as on screen.
    pub fn covers(&self, uv: Vec2) -> bool {
        match self {
            ParticleShape::Circle => uv.length_squared() <= 1.0,
            ParticleShape::Square => uv.x.abs() <= 1.0 && uv.y.abs() <= 1.0,
            ParticleShape::Triangle => {
                // Apex at (0, -1), base along y = 1.
                if uv.y < -1.0 || uv.y > 1.0 {
                    return false;
                }
                let half_width = (uv.y + 1.0) * 0.5;
                uv.x.abs() <= half_width
            }
        }
    }

    /// Stable numeric code, used by the packed state samples.
    pub fn code(&self) -> u32 {
        match self {
            ParticleShape::Circle => 0,
            ParticleShape::Square => 1,
            ParticleShape::Triangle => 2,
        }
    }

    /// Inverse of [`ParticleShape::code`]; unknown codes fall back to circles.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ParticleShape::Square,
            2 => ParticleShape::Triangle,
            _ => ParticleShape::Circle,
        }
    }
}

/// How a single particle is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    /// Fill color (straight alpha).
    pub color: Rgba<u8>,
    /// Edge length of the sprite in canvas pixels.
    pub size: f32,
    /// Sprite shape.
    pub shape: ParticleShape,
}

impl Visual {
    /// Half the sprite size; the radius used for collisions and walls.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }
}

/// Average color of a rectangular region, alpha included.
///
/// Returns transparent black for an empty region.
pub fn average_color(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Rgba<u8> {
    let x_end = (x + width).min(img.width());
    let y_end = (y + height).min(img.height());
    let mut sum = [0u64; 4];
    let mut count = 0u64;
    for py in y..y_end {
        for px in x..x_end {
            let p = img.get_pixel(px, py).0;
            for c in 0..4 {
                sum[c] += p[c] as u64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
        (sum[3] / count) as u8,
    ])
}

/// Relative luminance in `[0, 1]` (Rec. 709 weights, alpha ignored).
pub fn luminance(color: Rgba<u8>) -> f32 {
    let [r, g, b, _] = color.0;
    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0
}

/// Blend `src` over `dst` with straight alpha.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src.0[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        *dst = src;
        return;
    }
    let inv = 255 - sa;
    for c in 0..3 {
        dst.0[c] = ((src.0[c] as u32 * sa + dst.0[c] as u32 * inv) / 255) as u8;
    }
    dst.0[3] = (sa + dst.0[3] as u32 * inv / 255).min(255) as u8;
}
