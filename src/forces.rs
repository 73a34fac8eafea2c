//! Ambient forces and the noise field they share with pulses.
//!
//! Ambient forces persist for as long as they are enabled in
//! [`ForceSettings`]. Each returns an acceleration in canvas pixels per
//! second squared; the kernel sums them with pulses, restoration and walls.
//!
//! | Family | Effect |
//! |--------|--------|
//! | attraction | pull toward a point, linear falloff to `radius` |
//! | repulsion | push away from a point, linear falloff to `radius` |
//! | vortex | tangential swirl around a center |
//! | collider | hard push out of a disc |
//! | turbulence | time-evolving noise field |

use crate::settings::{ColliderForce, ForceSettings, PointForce, TurbulenceForce, VortexForce};
use glam::Vec2;

/// Multiplier turning a settings `strength` into pixels per second squared.
pub const FORCE_SCALE: f32 = 10.0;

/// Positions closer than this to a force center get no directional push.
const MIN_DISTANCE: f32 = 0.001;

/// Canvas-space frame shared by all force evaluations in one tick.
#[derive(Debug, Clone, Copy)]
pub struct ForceFrame {
    pub canvas: Vec2,
    /// Logical simulation time in seconds.
    pub time: f32,
}

impl ForceFrame {
    /// Convert a normalized point to canvas pixels.
    #[inline]
    pub fn point(&self, normalized: Vec2) -> Vec2 {
        normalized * self.canvas
    }

    /// Convert a radius given as a fraction of the shorter side to pixels.
    #[inline]
    pub fn radius(&self, fraction: f32) -> f32 {
        fraction * self.canvas.min_element()
    }
}

/// Sum of every enabled ambient force at `position`.
pub fn ambient_force(forces: &ForceSettings, frame: &ForceFrame, position: Vec2) -> Vec2 {
    let mut total = Vec2::ZERO;
    if forces.attraction.enabled {
        total -= point_force(&forces.attraction, frame, position);
    }
    if forces.repulsion.enabled {
        total += point_force(&forces.repulsion, frame, position);
    }
    if forces.vortex.enabled {
        total += vortex_force(&forces.vortex, frame, position);
    }
    if forces.collider.enabled {
        total += collider_force(&forces.collider, frame, position);
    }
    if forces.turbulence.enabled {
        total += turbulence_force(&forces.turbulence, frame, position);
    }
    total
}

/// Outward push from the force point; attraction negates it.
fn point_force(force: &PointForce, frame: &ForceFrame, position: Vec2) -> Vec2 {
    let center = frame.point(force.point);
    let radius = frame.radius(force.radius);
    let offset = position - center;
    let dist = offset.length();
    if dist < MIN_DISTANCE || dist >= radius {
        return Vec2::ZERO;
    }
    let falloff = 1.0 - dist / radius;
    offset / dist * force.strength * FORCE_SCALE * falloff
}

fn vortex_force(force: &VortexForce, frame: &ForceFrame, position: Vec2) -> Vec2 {
    let center = frame.point(force.center);
    let radius = frame.radius(force.radius);
    let offset = position - center;
    let dist = offset.length();
    if dist < MIN_DISTANCE || dist >= radius {
        return Vec2::ZERO;
    }
    let falloff = 1.0 - dist / radius;
    tangent(offset / dist, force.clockwise) * force.strength * FORCE_SCALE * falloff
}

fn collider_force(force: &ColliderForce, frame: &ForceFrame, position: Vec2) -> Vec2 {
    let center = frame.point(force.position);
    let radius = frame.radius(force.radius);
    let offset = position - center;
    let dist = offset.length();
    if dist < MIN_DISTANCE || dist >= radius {
        return Vec2::ZERO;
    }
    // Depth-proportional, so particles are shoved out of the disc fast.
    let depth = (radius - dist) / radius.max(MIN_DISTANCE);
    offset / dist * force.strength * FORCE_SCALE * (0.5 + depth * 4.0)
}

fn turbulence_force(force: &TurbulenceForce, frame: &ForceFrame, position: Vec2) -> Vec2 {
    let p = position * force.scale;
    let t = frame.time * force.speed;
    flow(p, t) * force.strength * FORCE_SCALE
}

/// Unit tangent to `radial`. Clockwise on screen (y pointing down).
#[inline]
pub(crate) fn tangent(radial: Vec2, clockwise: bool) -> Vec2 {
    if clockwise {
        Vec2::new(-radial.y, radial.x)
    } else {
        Vec2::new(radial.y, -radial.x)
    }
}

/// Two decorrelated noise channels, each in `[-1, 1]`.
pub(crate) fn flow(p: Vec2, t: f32) -> Vec2 {
    Vec2::new(
        value_noise(p + Vec2::new(t, 0.0), 0),
        value_noise(p + Vec2::new(100.0, t), 1),
    )
}

/// Smooth 2D value noise in `[-1, 1]`.
pub(crate) fn value_noise(p: Vec2, channel: u32) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let (ix, iy) = (cell.x as i32, cell.y as i32);
    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);

    let a = lattice(ix, iy, channel);
    let b = lattice(ix + 1, iy, channel);
    let c = lattice(ix, iy + 1, channel);
    let d = lattice(ix + 1, iy + 1, channel);
    let top = a + (b - a) * u.x;
    let bottom = c + (d - c) * u.x;
    top + (bottom - top) * u.y
}

fn lattice(x: i32, y: i32, channel: u32) -> f32 {
    hash01(hash3(x as u32, y as u32, channel)) * 2.0 - 1.0
}

/// Integer hash of three values.
pub(crate) fn hash3(a: u32, b: u32, c: u32) -> u32 {
    let mut n = a
        .wrapping_mul(374761393)
        .wrapping_add(b.wrapping_mul(668265263))
        .wrapping_add(c.wrapping_mul(1013904223));
    n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    n ^ (n >> 16)
}

/// Map a hash to `[0, 1]`.
#[inline]
pub(crate) fn hash01(h: u32) -> f32 {
    (h & 0x00ff_ffff) as f32 / 0x00ff_ffff as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ForceFrame {
        ForceFrame { canvas: Vec2::new(200.0, 100.0), time: 0.0 }
    }

    #[test]
    fn test_disabled_forces_do_nothing() {
        let forces = ForceSettings::default();
        assert_eq!(ambient_force(&forces, &frame(), Vec2::new(40.0, 40.0)), Vec2::ZERO);
    }

    #[test]
    fn test_attraction_pulls_and_repulsion_pushes() {
        let mut forces = ForceSettings::default();
        forces.attraction.enabled = true;
        let left_of_center = Vec2::new(90.0, 50.0);
        assert!(ambient_force(&forces, &frame(), left_of_center).x > 0.0);

        forces.attraction.enabled = false;
        forces.repulsion.enabled = true;
        assert!(ambient_force(&forces, &frame(), left_of_center).x < 0.0);
    }

    #[test]
    fn test_point_force_has_finite_reach() {
        let mut forces = ForceSettings::default();
        forces.repulsion.enabled = true;
        // radius 0.3 of the 100px side = 30px
        assert_eq!(ambient_force(&forces, &frame(), Vec2::new(100.0, 85.0)), Vec2::ZERO);
        assert_ne!(ambient_force(&forces, &frame(), Vec2::new(100.0, 75.0)), Vec2::ZERO);
    }

    #[test]
    fn test_vortex_is_tangential() {
        let mut forces = ForceSettings::default();
        forces.vortex.enabled = true;
        let pos = Vec2::new(120.0, 50.0);
        let f = ambient_force(&forces, &frame(), pos);
        let radial = (pos - Vec2::new(100.0, 50.0)).normalize();
        assert!(f.dot(radial).abs() < 1e-3);
        assert!(f.length() > 0.0);

        forces.vortex.clockwise = false;
        let g = ambient_force(&forces, &frame(), pos);
        assert!((f + g).length() < 1e-3);
    }

    #[test]
    fn test_collider_pushes_out_of_disc() {
        let mut forces = ForceSettings::default();
        forces.collider.enabled = true;
        let inside = Vec2::new(105.0, 50.0);
        assert!(ambient_force(&forces, &frame(), inside).x > 0.0);
    }

    #[test]
    fn test_noise_is_bounded_and_deterministic() {
        for i in 0..200 {
            let p = Vec2::new(i as f32 * 0.37, i as f32 * 0.11);
            let n = value_noise(p, 0);
            assert!((-1.0..=1.0).contains(&n));
            assert_eq!(n, value_noise(p, 0));
        }
    }

    #[test]
    fn test_noise_is_continuous() {
        let mut prev = value_noise(Vec2::ZERO, 3);
        for i in 1..1000 {
            let n = value_noise(Vec2::new(i as f32 * 0.005, 0.3), 3);
            assert!((n - prev).abs() < 0.05);
            prev = n;
        }
    }
}
