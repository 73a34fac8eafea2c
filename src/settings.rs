//! Engine settings.
//!
//! Settings are owned by the host application and read by the engine once
//! per tick. They serialize to camelCase JSON so the host's config layer can
//! persist them as-is; every field has a default, so partial documents load.
//!
//! ```ignore
//! let settings = Settings::from_json(r#"{ "viscosity": 4.0, "walls": { "mode": "confine" } }"#)?;
//! engine.set_settings(settings);
//! ```
//!
//! The engine assumes settings are already validated. [`Settings::sanitized`]
//! is the clamp pass a config layer can run before handing them over.

use crate::error::SettingsError;
use crate::visuals::ParticleShape;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Smallest tile grid accepted by the generator.
pub const MIN_GRID_SIZE: u32 = 2;
/// Largest tile grid accepted by the generator.
pub const MAX_GRID_SIZE: u32 = 64;
/// Upper bound on pixel-sample particles.
pub const MAX_PARTICLE_DENSITY: u32 = 200_000;

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Persistent ambient forces.
    pub forces: ForceSettings,
    /// Spring constant pulling particles home.
    pub restoration_force: f32,
    /// Velocity damping per second.
    pub viscosity: f32,
    pub walls: WallSettings,
    pub collisions: CollisionSettings,
    pub material: MaterialSettings,
    pub healing: HealingSettings,
    pub performance: PerformanceSettings,
    pub generation: GenerationSettings,
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forces: ForceSettings::default(),
            restoration_force: 0.15,
            viscosity: 8.0,
            walls: WallSettings::default(),
            collisions: CollisionSettings::default(),
            material: MaterialSettings::default(),
            healing: HealingSettings::default(),
            performance: PerformanceSettings::default(),
            generation: GenerationSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Copy of these settings with every field clamped into its valid range.
    pub fn sanitized(&self) -> Self {
        let mut s = self.clone();
        s.restoration_force = clamp_field("restorationForce", s.restoration_force, 0.0, 10.0, 0.15);
        s.viscosity = clamp_field("viscosity", s.viscosity, 0.0, 60.0, 8.0);

        for (name, f) in [("attraction", &mut s.forces.attraction), ("repulsion", &mut s.forces.repulsion)] {
            f.strength = clamp_field(name, f.strength, 0.0, 1000.0, 0.0);
            f.radius = clamp_field(name, f.radius, 0.0, 4.0, 0.3);
        }
        s.forces.vortex.strength = clamp_field("vortex.strength", s.forces.vortex.strength, 0.0, 1000.0, 0.0);
        s.forces.vortex.radius = clamp_field("vortex.radius", s.forces.vortex.radius, 0.0, 4.0, 0.5);
        s.forces.collider.strength =
            clamp_field("collider.strength", s.forces.collider.strength, 0.0, 1000.0, 0.0);
        s.forces.collider.radius = clamp_field("collider.radius", s.forces.collider.radius, 0.0, 4.0, 0.1);
        s.forces.turbulence.strength =
            clamp_field("turbulence.strength", s.forces.turbulence.strength, 0.0, 1000.0, 0.0);
        s.forces.turbulence.scale = clamp_field("turbulence.scale", s.forces.turbulence.scale, 0.0001, 1.0, 0.02);

        s.walls.restitution = clamp_field("walls.restitution", s.walls.restitution, 0.0, 1.0, 0.6);
        s.walls.edge_repulsion.margin =
            clamp_field("walls.edgeRepulsion.margin", s.walls.edge_repulsion.margin, 0.0, 1000.0, 20.0);

        s.collisions.strength = clamp_field("collisions.strength", s.collisions.strength, 0.0, 1.0, 0.5);
        s.collisions.radius_multiplier =
            clamp_field("collisions.radiusMultiplier", s.collisions.radius_multiplier, 0.1, 4.0, 1.0);
        s.material.elasticity = clamp_field("material.elasticity", s.material.elasticity, 0.0, 1.0, 0.5);
        s.material.friction = clamp_field("material.friction", s.material.friction, 0.0, 1.0, 0.1);

        s.healing.fast_fraction = clamp_field("healing.fastFraction", s.healing.fast_fraction, 0.0, 1.0, 0.3);
        s.healing.speed_multiplier =
            clamp_field("healing.speedMultiplier", s.healing.speed_multiplier, 1.0, 20.0, 2.5);

        s.performance.target_fps = clamp_field("performance.targetFps", s.performance.target_fps, 1.0, 240.0, 60.0);
        s.performance.min_visible_fraction = clamp_field(
            "performance.minVisibleFraction",
            s.performance.min_visible_fraction,
            0.01,
            1.0,
            0.25,
        );
        s.performance.adjust_step = clamp_field("performance.adjustStep", s.performance.adjust_step, 0.001, 1.0, 0.05);
        s.performance.observation_frames = s.performance.observation_frames.clamp(1, 600);

        s.generation.grid_size = clamp_grid_size(s.generation.grid_size);
        s.generation.particle_density = s.generation.particle_density.clamp(1, MAX_PARTICLE_DENSITY);
        s.generation.image_scale = clamp_field("generation.imageScale", s.generation.image_scale, 0.05, 10.0, 1.0);
        s.generation.particle_size = clamp_field("generation.particleSize", s.generation.particle_size, 0.0, 256.0, 0.0);
        s
    }
}

/// Clamp a grid size into `[MIN_GRID_SIZE, MAX_GRID_SIZE]`.
pub fn clamp_grid_size(grid_size: u32) -> u32 {
    let clamped = grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE);
    if clamped != grid_size {
        log::warn!("grid size {grid_size} out of range, using {clamped}");
    }
    clamped
}

fn clamp_field(name: &str, value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("{name} is not finite, using {fallback}");
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{name} = {value} out of range, clamped to {clamped}");
    }
    clamped
}

/// Ambient force families, each independently enabled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSettings {
    pub attraction: PointForce,
    pub repulsion: PointForce,
    pub vortex: VortexForce,
    pub collider: ColliderForce,
    pub turbulence: TurbulenceForce,
}

/// Force toward or away from a point.
///
/// `point` is normalized to the canvas (`(0.5, 0.5)` is the center) and
/// `radius` is a fraction of the shorter canvas side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointForce {
    pub enabled: bool,
    pub strength: f32,
    pub radius: f32,
    pub point: Vec2,
}

impl Default for PointForce {
    fn default() -> Self {
        Self { enabled: false, strength: 20.0, radius: 0.3, point: Vec2::splat(0.5) }
    }
}

/// Tangential swirl around a center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VortexForce {
    pub enabled: bool,
    pub strength: f32,
    pub radius: f32,
    pub center: Vec2,
    pub clockwise: bool,
}

impl Default for VortexForce {
    fn default() -> Self {
        Self { enabled: false, strength: 20.0, radius: 0.5, center: Vec2::splat(0.5), clockwise: true }
    }
}

/// Circular obstacle that pushes particles out of its disc.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderForce {
    pub enabled: bool,
    pub strength: f32,
    pub radius: f32,
    pub position: Vec2,
}

impl Default for ColliderForce {
    fn default() -> Self {
        Self { enabled: false, strength: 60.0, radius: 0.1, position: Vec2::splat(0.5) }
    }
}

/// Time-evolving noise field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurbulenceForce {
    pub enabled: bool,
    pub strength: f32,
    /// Spatial frequency in cycles per canvas pixel.
    pub scale: f32,
    /// How fast the field evolves, in noise units per second.
    pub speed: f32,
}

impl Default for TurbulenceForce {
    fn default() -> Self {
        Self { enabled: false, strength: 10.0, scale: 0.02, speed: 0.5 }
    }
}

/// Boundary behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WallMode {
    /// Reflect velocity and keep the whole sprite inside the canvas.
    #[default]
    Bounce,
    /// Clamp the center to the canvas and stop motion on that axis.
    Confine,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WallSettings {
    pub enabled: bool,
    pub mode: WallMode,
    /// Fraction of the normal velocity kept after a bounce.
    pub restitution: f32,
    pub edge_repulsion: EdgeRepulsion,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: WallMode::Bounce,
            restitution: 0.6,
            edge_repulsion: EdgeRepulsion::default(),
        }
    }
}

/// Inward push near the canvas edges, independent of the wall mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeRepulsion {
    pub enabled: bool,
    pub strength: f32,
    /// Distance from the edge, in canvas pixels, where the push starts.
    pub margin: f32,
}

impl Default for EdgeRepulsion {
    fn default() -> Self {
        Self { enabled: false, strength: 40.0, margin: 20.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionSettings {
    pub enabled: bool,
    /// Fraction of the overlap resolved per tick.
    pub strength: f32,
    /// Contact distance is `radius_multiplier × (r1 + r2)`.
    pub radius_multiplier: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self { enabled: false, strength: 0.5, radius_multiplier: 1.0 }
    }
}

/// Particle-particle contact material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialSettings {
    /// 0 = sticky, 1 = fully elastic.
    pub elasticity: f32,
    /// Tangential damping on contact.
    pub friction: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self { elasticity: 0.5, friction: 0.1 }
    }
}

/// Partial healing: a random subset returns home faster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealingSettings {
    pub enabled: bool,
    pub fast_fraction: f32,
    pub speed_multiplier: f32,
    /// Seed for choosing the fast subset.
    pub seed: u64,
}

impl Default for HealingSettings {
    fn default() -> Self {
        Self { enabled: false, fast_fraction: 0.3, speed_multiplier: 2.5, seed: 0x1b873593 }
    }
}

/// Adaptive performance controller parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub enabled: bool,
    pub target_fps: f32,
    pub min_visible_fraction: f32,
    pub adjust_step: f32,
    /// Frames the FPS condition must hold before the fraction changes.
    pub observation_frames: u32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_fps: 60.0,
            min_visible_fraction: 0.25,
            adjust_step: 0.05,
            observation_frames: 10,
        }
    }
}

/// Particle generation strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationMode {
    /// One particle per sampled pixel.
    #[default]
    PixelSample,
    /// One particle per image tile.
    TileGrid,
}

/// Where pixel-sample mode places its samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplingStrategy {
    /// Regular lattice over the image.
    #[default]
    Uniform,
    /// Seeded random picks, favoring opaque high-contrast pixels.
    ContentWeighted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    pub mode: AnimationMode,
    /// Maximum number of pixel-sample particles.
    pub particle_density: u32,
    pub sampling: SamplingStrategy,
    /// Image scale relative to fitting the canvas.
    pub image_scale: f32,
    /// Sprite size in canvas pixels; `0` derives it from the sample spacing.
    pub particle_size: f32,
    /// Tiles per side in tile-grid mode.
    pub grid_size: u32,
    /// Seed for content-weighted sampling.
    pub seed: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            mode: AnimationMode::PixelSample,
            particle_density: 4000,
            sampling: SamplingStrategy::Uniform,
            image_scale: 1.0,
            particle_size: 0.0,
            grid_size: 16,
            seed: 0x85ebca6b,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderSettings {
    pub shape: ParticleShape,
    /// Background color (RGBA).
    pub background: [u8; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self { shape: ParticleShape::Circle, background: [0, 0, 0, 255] }
    }
}
