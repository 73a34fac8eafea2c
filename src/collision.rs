//! Particle-particle collisions.
//!
//! Contacts are found through a [`SpatialGrid`] whose cell size is the
//! mean contact distance. Particles larger than that query the grid over
//! their own reach, so one oversized tile cannot coarsen the whole grid.
//! Pairs are then resolved one by one in a fixed order:
//!
//! 1. Positional correction: each particle moves `overlap × strength / 2`
//!    apart along the contact normal.
//! 2. Normal impulse for approaching pairs, with restitution `elasticity`.
//! 3. Tangential blend of the relative velocity, scaled by `friction`.
//!
//! The result is soft and stylized, not a rigid-body solver.

use crate::forces::{hash01, hash3};
use crate::particle::Particle;
use crate::settings::{CollisionSettings, MaterialSettings};
use crate::spatial::SpatialGrid;
use glam::Vec2;
use std::f32::consts::TAU;

/// Resolves contacts between a subset of particles.
#[derive(Debug, Default)]
pub struct CollisionSolver {
    grid: SpatialGrid,
    pairs: Vec<(u32, u32)>,
    nearby: Vec<u32>,
}

impl CollisionSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve contacts among `active` particles. Returns the contact count.
    pub fn resolve(
        &mut self,
        particles: &mut [Particle],
        active: &[u32],
        canvas: Vec2,
        collisions: &CollisionSettings,
        material: &MaterialSettings,
    ) -> usize {
        if active.len() < 2 {
            return 0;
        }
        let multiplier = collisions.radius_multiplier;
        let (mut total, mut max_radius) = (0.0f32, 0.0f32);
        for &i in active {
            let radius = particles[i as usize].visual.radius();
            total += radius;
            max_radius = max_radius.max(radius);
        }
        let mean_reach = multiplier * 2.0 * total / active.len() as f32;
        if !mean_reach.is_finite() || mean_reach <= 0.0 {
            return 0;
        }

        self.grid
            .rebuild(canvas, mean_reach, active.iter().map(|&i| (i, particles[i as usize].position)));
        self.grid.candidate_pairs(&mut self.pairs);

        // Adjacent cells only cover contacts up to one cell size.
        let cell = self.grid.cell_size();
        for &i in active {
            let p = &particles[i as usize];
            let radius = p.visual.radius();
            if multiplier * 2.0 * radius <= cell {
                continue;
            }
            self.grid
                .query_radius(p.position, multiplier * (radius + max_radius), &mut self.nearby);
            self.pairs
                .extend(self.nearby.iter().filter(|&&j| j != i).map(|&j| (i.min(j), i.max(j))));
        }
        // Index order keeps resolution deterministic regardless of cell layout.
        self.pairs.sort_unstable();
        self.pairs.dedup();

        let mut contacts = 0;
        for &(i, j) in &self.pairs {
            let (a, b) = pair_mut(particles, i as usize, j as usize);
            if resolve_pair(a, b, i, j, multiplier, collisions.strength, material) {
                contacts += 1;
            }
        }
        contacts
    }
}

fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    debug_assert!(i < j);
    let (head, tail) = particles.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

fn resolve_pair(
    a: &mut Particle,
    b: &mut Particle,
    i: u32,
    j: u32,
    multiplier: f32,
    strength: f32,
    material: &MaterialSettings,
) -> bool {
    let contact = multiplier * (a.visual.radius() + b.visual.radius());
    let delta = b.position - a.position;
    let dist = delta.length();
    if dist >= contact {
        return false;
    }
    let normal = if dist > 1e-4 {
        delta / dist
    } else {
        // Coincident centers: pick a stable direction for this pair.
        Vec2::from_angle(hash01(hash3(i, j, 0xc011)) * TAU)
    };

    let correction = normal * (contact - dist) * 0.5 * strength;
    a.position -= correction;
    b.position += correction;

    let relative = b.velocity - a.velocity;
    let vn = relative.dot(normal);
    if vn < 0.0 {
        let impulse = -(1.0 + material.elasticity) * vn * 0.5;
        a.velocity -= normal * impulse;
        b.velocity += normal * impulse;

        let tangential = relative - normal * vn;
        let blend = tangential * material.friction * 0.5;
        a.velocity += blend;
        b.velocity -= blend;
    }
    true
}
