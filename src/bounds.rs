//! Canvas walls.
//!
//! Two modes, chosen globally by [`WallSettings::mode`]:
//!
//! - **Bounce** keeps the whole sprite inside the canvas: the center is
//!   clamped inward by the particle's half-size and the normal velocity is
//!   reflected, scaled by `restitution`. Particles whose sprite is larger
//!   than their tile footprint (remainder tiles on the last row or column)
//!   rest slightly inward of their home under this mode.
//! - **Confine** clamps the center to the canvas edge itself and zeroes the
//!   velocity on that axis. Home positions inside the canvas are never
//!   disturbed.
//!
//! Edge repulsion is an extra inward force near the edges that applies in
//! either mode.

use crate::forces::FORCE_SCALE;
use crate::particle::Particle;
use crate::settings::{EdgeRepulsion, WallMode, WallSettings};
use glam::Vec2;

/// Inward force from edge repulsion at `position`.
pub fn edge_force(repulsion: &EdgeRepulsion, canvas: Vec2, position: Vec2) -> Vec2 {
    if !repulsion.enabled || repulsion.margin <= 0.0 {
        return Vec2::ZERO;
    }
    let push = |d: f32| -> f32 {
        if d < repulsion.margin {
            repulsion.strength * FORCE_SCALE * (1.0 - d.max(0.0) / repulsion.margin)
        } else {
            0.0
        }
    };
    Vec2::new(
        push(position.x) - push(canvas.x - position.x),
        push(position.y) - push(canvas.y - position.y),
    )
}

/// Apply the wall mode to a particle after integration.
///
/// Returns whether the particle touched a wall.
pub fn constrain(walls: &WallSettings, canvas: Vec2, particle: &mut Particle) -> bool {
    if !walls.enabled {
        return false;
    }
    match walls.mode {
        WallMode::Bounce => {
            let half = particle.visual.radius();
            let hit_x = bounce_axis(&mut particle.position.x, &mut particle.velocity.x, half, canvas.x, walls.restitution);
            let hit_y = bounce_axis(&mut particle.position.y, &mut particle.velocity.y, half, canvas.y, walls.restitution);
            hit_x | hit_y
        }
        WallMode::Confine => {
            let hit_x = confine_axis(&mut particle.position.x, &mut particle.velocity.x, canvas.x);
            let hit_y = confine_axis(&mut particle.position.y, &mut particle.velocity.y, canvas.y);
            hit_x | hit_y
        }
    }
}

fn bounce_axis(position: &mut f32, velocity: &mut f32, half: f32, extent: f32, restitution: f32) -> bool {
    let (lo, hi) = if half * 2.0 > extent { (extent * 0.5, extent * 0.5) } else { (half, extent - half) };
    if *position < lo {
        *position = lo;
        *velocity = velocity.abs() * restitution;
        true
    } else if *position > hi {
        *position = hi;
        *velocity = -velocity.abs() * restitution;
        true
    } else {
        false
    }
}

fn confine_axis(position: &mut f32, velocity: &mut f32, extent: f32) -> bool {
    if *position < 0.0 {
        *position = 0.0;
        *velocity = 0.0;
        true
    } else if *position > extent {
        *position = extent;
        *velocity = 0.0;
        true
    } else {
        false
    }
}
