//! Transient force pulses.
//!
//! A [`ForcePulse`] is a short-lived force layered on top of the ambient
//! forces. Every pulse carries the same envelope fields (strength, duration,
//! hold, easing, mode) plus a [`PulseKind`] that holds only the parameters
//! its kind needs:
//!
//! | Family | Kinds |
//! |--------|-------|
//! | Directional | `push`, `gust`, `shear`, `stretch`, `squeeze`, `split` |
//! | Rotational | `swirl`, `twist`, `whirlpool` |
//! | Radial | `burst`, `implode`, `ring`, `shockwave`, `breathe`, `magnet` |
//! | Wave | `wave`, `ripple`, `zigzag` |
//! | Spiral | `spiral`, `galaxy` |
//! | Chaos | `jitter`, `turbulence`, `scatter`, `earthquake`, `glitch` |
//! | Composite | `randomize` |
//!
//! Pulses serialize as flat camelCase JSON keyed by `kind`:
//!
//! ```ignore
//! let pulse = ForcePulse::from_json(r#"{
//!     "kind": "burst",
//!     "origin": [0.5, 0.5],
//!     "radius": 1.0,
//!     "strength": 30.0,
//!     "durationMs": 1000.0,
//!     "easeIn": 0.2,
//!     "easeOut": 0.2
//! }"#)?;
//! let id = engine.enqueue_pulse(pulse);
//! ```
//!
//! # Lifecycle
//!
//! Impulse pulses run `queued → ramping-in → holding → ramping-out →
//! expired` purely on elapsed time and are removed once expired.
//! Continuous pulses ramp in and then hold until cancelled by id.
//!
//! # Coordinates
//!
//! Origins are normalized to the canvas (`[0.5, 0.5]` is the center).
//! Radii are fractions of the shorter canvas side. Angles are in degrees,
//! `0` pointing right and `90` pointing down.

use crate::easing::{Easing, Envelope, Phase};
use crate::error::PulseError;
use crate::forces::{flow, hash01, hash3, tangent, value_noise};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;

/// Multiplier turning a pulse `strength` into pixels per second squared.
pub const PULSE_FORCE_SCALE: f32 = 10.0;

const MIN_DISTANCE: f32 = 0.001;

/// Identifier assigned to a pulse when it is enqueued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulseId(pub u64);

impl fmt::Display for PulseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pulse#{}", self.0)
    }
}

/// How a pulse ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PulseMode {
    /// Expires on its own after `durationMs + holdTimeMs`.
    #[default]
    Impulse,
    /// Persists until cancelled.
    Continuous,
}

/// Parameters for straight-line kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DirectionParams {
    /// Direction in degrees.
    pub angle: f32,
}

impl Default for DirectionParams {
    fn default() -> Self {
        Self { angle: 0.0 }
    }
}

impl DirectionParams {
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.angle.to_radians())
    }
}

/// Parameters for [`PulseKind::Gust`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GustParams {
    pub angle: f32,
    /// Gusts per second.
    pub frequency: f32,
    /// Sideways wobble, 0 to 1.
    pub chaos: f32,
}

impl Default for GustParams {
    fn default() -> Self {
        Self { angle: 0.0, frequency: 2.0, chaos: 0.3 }
    }
}

/// Parameters for kinds acting around an origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialParams {
    pub origin: Vec2,
    pub radius: f32,
    /// Rotation sense for rotational kinds; ignored by the others.
    pub clockwise: bool,
}

impl Default for RadialParams {
    fn default() -> Self {
        Self { origin: Vec2::splat(0.5), radius: 1.0, clockwise: true }
    }
}

/// Parameters for band-shaped kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RingParams {
    pub origin: Vec2,
    /// Ring radius (for `shockwave`, the final radius of the front).
    pub radius: f32,
    /// Band thickness, as a fraction of the shorter canvas side.
    pub width: f32,
}

impl Default for RingParams {
    fn default() -> Self {
        Self { origin: Vec2::splat(0.5), radius: 0.35, width: 0.12 }
    }
}

/// Parameters for [`PulseKind::Breathe`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreatheParams {
    pub origin: Vec2,
    pub radius: f32,
    /// Breaths per second.
    pub frequency: f32,
}

impl Default for BreatheParams {
    fn default() -> Self {
        Self { origin: Vec2::splat(0.5), radius: 1.0, frequency: 1.0 }
    }
}

/// Parameters for traveling waves along a direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveParams {
    /// Direction of travel in degrees.
    pub angle: f32,
    pub frequency: f32,
    /// Wavelengths across the longer canvas side.
    pub wave_count: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self { angle: 0.0, frequency: 1.5, wave_count: 3.0 }
    }
}

/// Parameters for [`PulseKind::Ripple`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RippleParams {
    pub origin: Vec2,
    pub frequency: f32,
    pub wave_count: f32,
}

impl Default for RippleParams {
    fn default() -> Self {
        Self { origin: Vec2::splat(0.5), frequency: 1.5, wave_count: 4.0 }
    }
}

/// Parameters for spiral kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpiralParams {
    pub origin: Vec2,
    pub radius: f32,
    /// Spiral turns; for `galaxy`, also the number of arms.
    pub turns: f32,
    pub clockwise: bool,
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self { origin: Vec2::splat(0.5), radius: 1.0, turns: 2.0, clockwise: true }
    }
}

/// Parameters for noise and chaos kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChaosParams {
    /// How often the pattern changes, per second.
    pub frequency: f32,
    /// Magnitude of the random component, 0 to 1.
    pub chaos: f32,
}

impl Default for ChaosParams {
    fn default() -> Self {
        Self { frequency: 8.0, chaos: 0.5 }
    }
}

/// Parameters for [`PulseKind::Randomize`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomizeParams {
    /// Share of the lifetime spent scattering, in percent.
    pub scatter_percent: f32,
    /// Share of the lifetime spent pulling home, in percent.
    pub return_percent: f32,
}

impl Default for RandomizeParams {
    fn default() -> Self {
        Self { scatter_percent: 30.0, return_percent: 40.0 }
    }
}

/// What a pulse does, with the parameters that kind needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PulseKind {
    /// Uniform force in one direction.
    Push(DirectionParams),
    /// Push that rises and falls in gusts, with sideways wobble.
    Gust(GustParams),
    /// Opposite halves of the canvas slide in opposite directions.
    Shear(DirectionParams),
    /// Pull apart along the direction axis.
    Stretch(DirectionParams),
    /// Press toward the direction axis.
    Squeeze(DirectionParams),
    /// Tear apart across the direction axis.
    Split(DirectionParams),
    /// Tangential force strongest at the origin.
    Swirl(RadialParams),
    /// Tangential force growing with distance, like turning a disc.
    Twist(RadialParams),
    /// Swirl plus an inward drain.
    Whirlpool(RadialParams),
    /// Outward explosion with linear falloff.
    Burst(RadialParams),
    /// Inward collapse with linear falloff.
    Implode(RadialParams),
    /// Outward push on a band at a fixed radius.
    Ring(RingParams),
    /// Outward push on a band that expands over the pulse lifetime.
    ///
    /// # Fields
    ///
    /// - `origin` - Center of the wave
    /// - `radius` - Radius the front reaches at the end of the lifetime
    /// - `width` - Thickness of the front
    Shockwave(RingParams),
    /// Oscillating expand and contract.
    ///
    /// # Fields
    ///
    /// - `origin` - Center of the breath
    /// - `radius` - Effect radius
    /// - `frequency` - Breaths per second
    Breathe(BreatheParams),
    /// Inward pull that strengthens toward the origin.
    Magnet(RadialParams),
    /// Transverse sine wave traveling along a direction.
    Wave(WaveParams),
    /// Concentric waves from an origin.
    Ripple(RippleParams),
    /// Transverse triangle wave.
    Zigzag(WaveParams),
    /// Outward spiral.
    Spiral(SpiralParams),
    /// Rotation concentrated on spiral arms.
    Galaxy(SpiralParams),
    /// Random direction per particle, re-rolled `frequency` times a second.
    Jitter(ChaosParams),
    /// Smooth evolving noise field.
    Turbulence(ChaosParams),
    /// Fixed random direction per particle, biased outward.
    Scatter(ChaosParams),
    /// Whole-canvas shake with per-particle tremor.
    Earthquake(ChaosParams),
    /// Random horizontal band displacement.
    Glitch(ChaosParams),
    /// Scatter, drift, then pull home.
    ///
    /// # Fields
    ///
    /// - `scatter_percent` - Leading share of the lifetime spent scattering
    /// - `return_percent` - Trailing share of the lifetime spent pulling home
    Randomize(RandomizeParams),
}

impl Default for PulseKind {
    fn default() -> Self {
        PulseKind::Burst(RadialParams::default())
    }
}

/// Canvas and timing context for one pulse during one step.
#[derive(Clone, Copy, Debug)]
pub struct PulseFrame {
    pub canvas: Vec2,
    /// Seconds since the pulse started.
    pub elapsed: f32,
    /// Position within the pulse cycle, `[0, 1)`.
    pub cycle: f32,
    /// Per-pulse seed for the random kinds.
    pub seed: u32,
}

/// The particle state a pulse shape reads.
#[derive(Clone, Copy, Debug)]
pub struct PulseSample {
    pub index: u32,
    pub position: Vec2,
    pub home: Vec2,
}

impl PulseKind {
    /// Every kind tag, in declaration order.
    pub const NAMES: [&'static str; 26] = [
        "push", "gust", "shear", "stretch", "squeeze", "split", "swirl", "twist", "whirlpool", "burst",
        "implode", "ring", "shockwave", "breathe", "magnet", "wave", "ripple", "zigzag", "spiral", "galaxy",
        "jitter", "turbulence", "scatter", "earthquake", "glitch", "randomize",
    ];

    /// The JSON `kind` tag.
    pub fn name(&self) -> &'static str {
        let index = match self {
            PulseKind::Push(_) => 0,
            PulseKind::Gust(_) => 1,
            PulseKind::Shear(_) => 2,
            PulseKind::Stretch(_) => 3,
            PulseKind::Squeeze(_) => 4,
            PulseKind::Split(_) => 5,
            PulseKind::Swirl(_) => 6,
            PulseKind::Twist(_) => 7,
            PulseKind::Whirlpool(_) => 8,
            PulseKind::Burst(_) => 9,
            PulseKind::Implode(_) => 10,
            PulseKind::Ring(_) => 11,
            PulseKind::Shockwave(_) => 12,
            PulseKind::Breathe(_) => 13,
            PulseKind::Magnet(_) => 14,
            PulseKind::Wave(_) => 15,
            PulseKind::Ripple(_) => 16,
            PulseKind::Zigzag(_) => 17,
            PulseKind::Spiral(_) => 18,
            PulseKind::Galaxy(_) => 19,
            PulseKind::Jitter(_) => 20,
            PulseKind::Turbulence(_) => 21,
            PulseKind::Scatter(_) => 22,
            PulseKind::Earthquake(_) => 23,
            PulseKind::Glitch(_) => 24,
            PulseKind::Randomize(_) => 25,
        };
        Self::NAMES[index]
    }

    /// Unscaled force direction and falloff at one particle.
    ///
    /// Magnitudes are roughly within `[0, 1]`; the caller multiplies by
    /// strength and envelope weight.
    pub fn shape(&self, frame: &PulseFrame, sample: &PulseSample) -> Vec2 {
        let canvas = frame.canvas;
        let min_side = canvas.min_element().max(1.0);
        let half = min_side * 0.5;
        let center = canvas * 0.5;
        let p = sample.position;
        let t = frame.elapsed;

        match self {
            PulseKind::Push(d) => d.direction(),
            PulseKind::Gust(g) => {
                let dir = Vec2::from_angle(g.angle.to_radians());
                let along = p.dot(dir) / min_side;
                let gust = 0.6 + 0.4 * (TAU * (g.frequency * t - along)).sin();
                let wobble = value_noise(p / min_side * 4.0 + Vec2::new(t * g.frequency, 0.0), frame.seed);
                dir * gust + dir.perp() * wobble * g.chaos
            }
            PulseKind::Shear(d) => {
                let dir = d.direction();
                let across = (p - center).dot(dir.perp()) / half;
                dir * across.clamp(-1.0, 1.0)
            }
            PulseKind::Stretch(d) => {
                let dir = d.direction();
                let along = (p - center).dot(dir) / half;
                dir * along.clamp(-1.0, 1.0)
            }
            PulseKind::Squeeze(d) => {
                let normal = d.direction().perp();
                let across = (p - center).dot(normal) / half;
                -normal * across.clamp(-1.0, 1.0)
            }
            PulseKind::Split(d) => {
                let normal = d.direction().perp();
                normal * (p - center).dot(normal).signum()
            }
            PulseKind::Swirl(r) => around(r, frame, p, |dir, falloff, _| tangent(dir, r.clockwise) * falloff),
            PulseKind::Twist(r) => around(r, frame, p, |dir, falloff, _| {
                tangent(dir, r.clockwise) * (1.0 - falloff)
            }),
            PulseKind::Whirlpool(r) => around(r, frame, p, |dir, falloff, _| {
                (tangent(dir, r.clockwise) - dir * 0.5) * falloff
            }),
            PulseKind::Burst(r) => around(r, frame, p, |dir, falloff, _| dir * falloff),
            PulseKind::Implode(r) => around(r, frame, p, |dir, falloff, _| -dir * falloff),
            PulseKind::Magnet(r) => {
                let Some((dir, dist)) = offset(canvas * r.origin, p) else {
                    return Vec2::ZERO;
                };
                let reach = (r.radius * min_side).max(MIN_DISTANCE);
                let q = dist / reach;
                -dir / (1.0 + q * q)
            }
            PulseKind::Ring(r) => band(r, frame, p, r.radius),
            PulseKind::Shockwave(r) => band(r, frame, p, r.radius * frame.cycle),
            PulseKind::Breathe(b) => {
                let Some((dir, dist)) = offset(canvas * b.origin, p) else {
                    return Vec2::ZERO;
                };
                let radius = b.radius * min_side;
                if dist >= radius {
                    return Vec2::ZERO;
                }
                dir * (TAU * b.frequency * t).sin() * (1.0 - dist / radius)
            }
            PulseKind::Wave(w) => {
                let dir = Vec2::from_angle(w.angle.to_radians());
                dir.perp() * (traveling_phase(w, canvas, p, dir, t)).sin()
            }
            PulseKind::Zigzag(w) => {
                let dir = Vec2::from_angle(w.angle.to_radians());
                let phase = traveling_phase(w, canvas, p, dir, t);
                dir.perp() * (phase.sin().asin() * 2.0 / std::f32::consts::PI)
            }
            PulseKind::Ripple(r) => {
                let Some((dir, dist)) = offset(canvas * r.origin, p) else {
                    return Vec2::ZERO;
                };
                let reach = canvas.length().max(1.0);
                let k = TAU * r.wave_count / reach;
                dir * (k * dist - TAU * r.frequency * t).sin() * (1.0 - dist / reach).max(0.0)
            }
            PulseKind::Spiral(s) => {
                let Some((dir, dist)) = offset(canvas * s.origin, p) else {
                    return Vec2::ZERO;
                };
                let radius = s.radius * min_side;
                if dist >= radius {
                    return Vec2::ZERO;
                }
                let swirl = tangent(dir, s.clockwise) + dir / s.turns.max(0.25);
                swirl.normalize_or_zero() * (1.0 - dist / radius)
            }
            PulseKind::Galaxy(s) => {
                let Some((dir, dist)) = offset(canvas * s.origin, p) else {
                    return Vec2::ZERO;
                };
                let radius = s.radius * min_side;
                if dist >= radius {
                    return Vec2::ZERO;
                }
                let arms = s.turns.round().max(1.0);
                let theta = dir.y.atan2(dir.x);
                let arm = 0.5 + 0.5 * (arms * theta - TAU * s.turns * dist / radius).cos();
                (tangent(dir, s.clockwise) - dir * 0.3) * arm * (1.0 - dist / radius)
            }
            PulseKind::Jitter(c) => {
                let bucket = (t * c.frequency).max(0.0) as u32;
                random_unit(hash3(sample.index, bucket, frame.seed))
            }
            PulseKind::Turbulence(c) => {
                let scale = 2.0 + 6.0 * c.chaos;
                flow(p / min_side * scale + Vec2::splat(frame.seed as f32 * 0.001), t * c.frequency)
            }
            PulseKind::Scatter(c) => {
                let outward = (p - center).normalize_or_zero();
                let random = random_unit(hash3(sample.index, 0x5ca7, frame.seed));
                (outward * (1.0 - c.chaos) + random * c.chaos).normalize_or_zero()
            }
            PulseKind::Earthquake(c) => {
                let shake = Vec2::new(
                    (TAU * c.frequency * t).sin(),
                    0.35 * (TAU * c.frequency * 1.7 * t + 1.3).sin(),
                );
                let bucket = (t * c.frequency * 2.0).max(0.0) as u32;
                shake + random_unit(hash3(sample.index, bucket, frame.seed)) * c.chaos * 0.3
            }
            PulseKind::Glitch(c) => {
                let band_height = (canvas.y / 16.0).max(1.0);
                let band = (p.y / band_height).max(0.0) as u32;
                let bucket = (t * c.frequency).max(0.0) as u32;
                let h = hash3(band, bucket, frame.seed);
                if hash01(h) >= c.chaos {
                    return Vec2::ZERO;
                }
                let side = if h & 1 == 0 { 1.0 } else { -1.0 };
                Vec2::new(side * (0.5 + hash01(h.rotate_left(8))), 0.0)
            }
            PulseKind::Randomize(r) => {
                let scatter = (r.scatter_percent / 100.0).clamp(0.0, 1.0);
                let ret = (r.return_percent / 100.0).clamp(0.0, 1.0);
                if frame.cycle < scatter {
                    random_unit(hash3(sample.index, 0x7a4d, frame.seed))
                } else if frame.cycle >= 1.0 - ret {
                    ((sample.home - p) / (min_side * 0.1)).clamp_length_max(1.0) * 2.0
                } else {
                    Vec2::ZERO
                }
            }
        }
    }
}

/// Direction and distance from `origin` to `p`; `None` at the origin itself.
fn offset(origin: Vec2, p: Vec2) -> Option<(Vec2, f32)> {
    let delta = p - origin;
    let dist = delta.length();
    (dist >= MIN_DISTANCE).then(|| (delta / dist, dist))
}

/// Evaluate `f(dir, falloff, dist)` inside the radius of a radial kind.
fn around(r: &RadialParams, frame: &PulseFrame, p: Vec2, f: impl Fn(Vec2, f32, f32) -> Vec2) -> Vec2 {
    let Some((dir, dist)) = offset(frame.canvas * r.origin, p) else {
        return Vec2::ZERO;
    };
    let radius = r.radius * frame.canvas.min_element();
    if dist >= radius {
        return Vec2::ZERO;
    }
    f(dir, 1.0 - dist / radius, dist)
}

/// Outward push on a band of `width` centered at `ring_radius`.
fn band(r: &RingParams, frame: &PulseFrame, p: Vec2, ring_radius: f32) -> Vec2 {
    let Some((dir, dist)) = offset(frame.canvas * r.origin, p) else {
        return Vec2::ZERO;
    };
    let min_side = frame.canvas.min_element();
    let width = (r.width * min_side).max(MIN_DISTANCE);
    let gap = (dist - ring_radius * min_side).abs();
    if gap >= width {
        return Vec2::ZERO;
    }
    dir * (1.0 - gap / width)
}

fn traveling_phase(w: &WaveParams, canvas: Vec2, p: Vec2, dir: Vec2, t: f32) -> f32 {
    let k = TAU * w.wave_count / canvas.max_element().max(1.0);
    k * p.dot(dir) - TAU * w.frequency * t
}

fn random_unit(h: u32) -> Vec2 {
    Vec2::from_angle(hash01(h) * TAU)
}

/// A transient force event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcePulse {
    #[serde(flatten)]
    pub kind: PulseKind,
    #[serde(default = "default_strength")]
    pub strength: f32,
    #[serde(default = "default_duration")]
    pub duration_ms: f32,
    #[serde(default)]
    pub hold_time_ms: f32,
    #[serde(default)]
    pub ease_type: Easing,
    #[serde(default = "default_ramp")]
    pub ease_in: f32,
    #[serde(default = "default_ramp")]
    pub ease_out: f32,
    #[serde(default)]
    pub mode: PulseMode,
}

fn default_strength() -> f32 {
    20.0
}

fn default_duration() -> f32 {
    1000.0
}

fn default_ramp() -> f32 {
    0.2
}

impl Default for ForcePulse {
    fn default() -> Self {
        Self::new(PulseKind::default())
    }
}

impl ForcePulse {
    /// A one-second impulse of `kind` with default envelope settings.
    pub fn new(kind: PulseKind) -> Self {
        Self {
            kind,
            strength: default_strength(),
            duration_ms: default_duration(),
            hold_time_ms: 0.0,
            ease_type: Easing::default(),
            ease_in: default_ramp(),
            ease_out: default_ramp(),
            mode: PulseMode::Impulse,
        }
    }

    /// Radial explosion from a normalized origin.
    pub fn burst(origin: Vec2, radius: f32) -> Self {
        Self::new(PulseKind::Burst(RadialParams { origin, radius, clockwise: true }))
    }

    /// Straight push in a direction given in degrees.
    pub fn push(angle: f32) -> Self {
        Self::new(PulseKind::Push(DirectionParams { angle }))
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_duration(mut self, duration_ms: f32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_hold(mut self, hold_time_ms: f32) -> Self {
        self.hold_time_ms = hold_time_ms;
        self
    }

    /// Set the easing curve and the ramp fractions of the duration.
    pub fn with_easing(mut self, ease_type: Easing, ease_in: f32, ease_out: f32) -> Self {
        self.ease_type = ease_type;
        self.ease_in = ease_in;
        self.ease_out = ease_out;
        self
    }

    /// Make this a continuous pulse that lasts until cancelled.
    pub fn continuous(mut self) -> Self {
        self.mode = PulseMode::Continuous;
        self
    }

    /// The weight envelope this pulse runs under.
    pub fn envelope(&self) -> Envelope {
        match self.mode {
            PulseMode::Impulse => Envelope::impulse(
                self.duration_ms,
                self.hold_time_ms,
                self.ease_in,
                self.ease_out,
                self.ease_type,
            ),
            PulseMode::Continuous => Envelope::sustained(self.duration_ms, self.ease_in, self.ease_type),
        }
    }

    /// Parse a pulse from UI-supplied JSON.
    ///
    /// Unknown kinds are reported separately from malformed payloads so the
    /// caller can ignore them with a precise warning.
    pub fn from_json(json: &str) -> Result<Self, PulseError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value.get("kind").and_then(serde_json::Value::as_str).ok_or(PulseError::MissingKind)?;
        if !PulseKind::NAMES.contains(&kind) {
            return Err(PulseError::UnknownKind(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, PulseError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A pulse that has been enqueued and not yet removed.
#[derive(Clone, Debug)]
pub struct ActivePulse {
    pub id: PulseId,
    pub pulse: ForcePulse,
    envelope: Envelope,
    started_ms: f64,
}

impl ActivePulse {
    /// Milliseconds since the pulse started (negative while queued).
    pub fn elapsed_ms(&self, now_ms: f64) -> f32 {
        (now_ms - self.started_ms) as f32
    }

    pub fn phase(&self, now_ms: f64) -> Phase {
        self.envelope.phase(self.elapsed_ms(now_ms))
    }

    pub fn weight(&self, now_ms: f64) -> f32 {
        self.envelope.weight(self.elapsed_ms(now_ms))
    }

    pub fn started_ms(&self) -> f64 {
        self.started_ms
    }

    fn cycle(&self, elapsed_ms: f32) -> f32 {
        match self.pulse.mode {
            PulseMode::Impulse => self.envelope.progress(elapsed_ms),
            PulseMode::Continuous => {
                let period = self.pulse.duration_ms.max(1.0);
                (elapsed_ms.max(0.0) / period).fract()
            }
        }
    }
}

/// A pulse evaluated for one step: shape parameters plus its scaled gain.
#[derive(Clone, Copy, Debug)]
pub struct LivePulse<'a> {
    pub kind: &'a PulseKind,
    pub frame: PulseFrame,
    /// `strength × PULSE_FORCE_SCALE × weight`.
    pub gain: f32,
}

impl LivePulse<'_> {
    /// Force on one particle in pixels per second squared.
    #[inline]
    pub fn force(&self, sample: &PulseSample) -> Vec2 {
        self.kind.shape(&self.frame, sample) * self.gain
    }
}

/// Active pulses, in enqueue order.
#[derive(Clone, Debug, Default)]
pub struct PulseQueue {
    active: Vec<ActivePulse>,
    next_id: u64,
}

impl PulseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pulse starting at `start_ms` and return its new id.
    pub fn enqueue(&mut self, pulse: ForcePulse, start_ms: f64) -> PulseId {
        let id = PulseId(self.next_id);
        self.insert(id, pulse, start_ms);
        id
    }

    /// Add a pulse under a caller-chosen id.
    ///
    /// Later ids handed out by [`enqueue`](Self::enqueue) skip past it.
    pub fn insert(&mut self, id: PulseId, pulse: ForcePulse, start_ms: f64) {
        self.next_id = self.next_id.max(id.0 + 1);
        let envelope = pulse.envelope();
        self.active.push(ActivePulse { id, pulse, envelope, started_ms: start_ms });
    }

    /// Remove a continuous pulse. Returns whether anything was removed.
    pub fn cancel(&mut self, id: PulseId) -> bool {
        let Some(index) = self.active.iter().position(|a| a.id == id) else {
            return false;
        };
        if self.active[index].pulse.mode != PulseMode::Continuous {
            log::warn!("{id} is an impulse pulse and cannot be cancelled");
            return false;
        }
        self.active.remove(index);
        true
    }

    /// Drop expired impulse pulses; returns how many were removed.
    pub fn retire(&mut self, now_ms: f64) -> usize {
        let before = self.active.len();
        self.active.retain(|a| a.phase(now_ms) != Phase::Expired);
        before - self.active.len()
    }

    /// Pulses with non-zero weight at `now_ms`, ready to apply.
    pub fn evaluate(&self, now_ms: f64, canvas: Vec2) -> Vec<LivePulse<'_>> {
        self.active
            .iter()
            .filter_map(|a| {
                let elapsed = a.elapsed_ms(now_ms);
                let weight = a.envelope.weight(elapsed);
                if weight <= 0.0 {
                    return None;
                }
                Some(LivePulse {
                    kind: &a.pulse.kind,
                    frame: PulseFrame {
                        canvas,
                        elapsed: elapsed / 1000.0,
                        cycle: a.cycle(elapsed),
                        seed: hash3(a.id.0 as u32, (a.id.0 >> 32) as u32, 0x9e37_79b9),
                    },
                    gain: a.pulse.strength * PULSE_FORCE_SCALE * weight,
                })
            })
            .collect()
    }

    pub fn get(&self, id: PulseId) -> Option<&ActivePulse> {
        self.active.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivePulse> {
        self.active.iter()
    }

    /// Drop every pulse. Ids keep counting up.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Vec2 = Vec2::new(100.0, 100.0);

    fn frame(elapsed: f32, cycle: f32) -> PulseFrame {
        PulseFrame { canvas: CANVAS, elapsed, cycle, seed: 7 }
    }

    fn at(x: f32, y: f32) -> PulseSample {
        PulseSample { index: 3, position: Vec2::new(x, y), home: Vec2::new(50.0, 50.0) }
    }

    fn every_kind() -> Vec<PulseKind> {
        vec![
            PulseKind::Push(Default::default()),
            PulseKind::Gust(Default::default()),
            PulseKind::Shear(Default::default()),
            PulseKind::Stretch(Default::default()),
            PulseKind::Squeeze(Default::default()),
            PulseKind::Split(Default::default()),
            PulseKind::Swirl(Default::default()),
            PulseKind::Twist(Default::default()),
            PulseKind::Whirlpool(Default::default()),
            PulseKind::Burst(Default::default()),
            PulseKind::Implode(Default::default()),
            PulseKind::Ring(Default::default()),
            PulseKind::Shockwave(Default::default()),
            PulseKind::Breathe(Default::default()),
            PulseKind::Magnet(Default::default()),
            PulseKind::Wave(Default::default()),
            PulseKind::Ripple(Default::default()),
            PulseKind::Zigzag(Default::default()),
            PulseKind::Spiral(Default::default()),
            PulseKind::Galaxy(Default::default()),
            PulseKind::Jitter(Default::default()),
            PulseKind::Turbulence(Default::default()),
            PulseKind::Scatter(Default::default()),
            PulseKind::Earthquake(Default::default()),
            PulseKind::Glitch(Default::default()),
            PulseKind::Randomize(Default::default()),
        ]
    }

    #[test]
    fn test_names_match_serde_tags() {
        let kinds = every_kind();
        assert_eq!(kinds.len(), PulseKind::NAMES.len());
        for (kind, name) in kinds.iter().zip(PulseKind::NAMES) {
            assert_eq!(kind.name(), name);
            let json = ForcePulse::new(kind.clone()).to_json().unwrap();
            assert!(json.contains(&format!("\"kind\":\"{name}\"")), "{json}");
        }
    }

    #[test]
    fn test_every_kind_parses_back() {
        for kind in every_kind() {
            let pulse = ForcePulse::new(kind).with_strength(12.0).continuous();
            let back = ForcePulse::from_json(&pulse.to_json().unwrap()).unwrap();
            assert_eq!(back, pulse);
        }
    }

    #[test]
    fn test_every_kind_is_finite_everywhere() {
        for kind in every_kind() {
            for &(x, y) in &[(50.0, 50.0), (0.0, 0.0), (100.0, 37.0), (12.5, 87.5)] {
                for &t in &[0.0, 0.3, 2.0] {
                    let f = kind.shape(&frame(t, 0.5), &at(x, y));
                    assert!(f.is_finite(), "{} at ({x}, {y}) t={t}", kind.name());
                }
            }
        }
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let pulse = ForcePulse::from_json(r#"{ "kind": "burst" }"#).unwrap();
        assert_eq!(pulse, ForcePulse::default());
        assert_eq!(pulse.mode, PulseMode::Impulse);
    }

    #[test]
    fn test_json_fields_are_camel_case() {
        let pulse = ForcePulse::from_json(
            r#"{ "kind": "randomize", "scatterPercent": 50, "holdTimeMs": 250, "easeType": "cubicIn" }"#,
        )
        .unwrap();
        assert_eq!(pulse.hold_time_ms, 250.0);
        assert_eq!(pulse.ease_type, Easing::CubicIn);
        match pulse.kind {
            PulseKind::Randomize(r) => {
                assert_eq!(r.scatter_percent, 50.0);
                assert_eq!(r.return_percent, RandomizeParams::default().return_percent);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_missing_kinds_are_distinguished() {
        assert!(matches!(
            ForcePulse::from_json(r#"{ "kind": "levitate" }"#),
            Err(PulseError::UnknownKind(k)) if k == "levitate"
        ));
        assert!(matches!(ForcePulse::from_json(r#"{ "strength": 3 }"#), Err(PulseError::MissingKind)));
        assert!(matches!(ForcePulse::from_json("[1, 2"), Err(PulseError::Malformed(_))));
        assert!(matches!(
            ForcePulse::from_json(r#"{ "kind": "burst", "radius": "wide" }"#),
            Err(PulseError::Malformed(_))
        ));
    }

    #[test]
    fn test_burst_points_away_from_origin_with_falloff() {
        let burst = PulseKind::Burst(RadialParams::default());
        let near = burst.shape(&frame(0.1, 0.1), &at(60.0, 50.0));
        let far = burst.shape(&frame(0.1, 0.1), &at(80.0, 50.0));
        assert!(near.x > far.x && far.x > 0.0);
        assert_eq!(near.y, 0.0);
        assert_eq!(burst.shape(&frame(0.1, 0.1), &at(50.0, 50.0)), Vec2::ZERO);
    }

    #[test]
    fn test_implode_and_magnet_pull_inward() {
        let implode = PulseKind::Implode(RadialParams::default());
        let magnet = PulseKind::Magnet(RadialParams::default());
        assert!(implode.shape(&frame(0.0, 0.0), &at(70.0, 50.0)).x < 0.0);
        assert!(magnet.shape(&frame(0.0, 0.0), &at(50.0, 90.0)).y < 0.0);
    }

    #[test]
    fn test_shockwave_front_expands() {
        let shock = PulseKind::Shockwave(RingParams { origin: Vec2::splat(0.5), radius: 0.4, width: 0.05 });
        let p = at(80.0, 50.0);
        assert_eq!(shock.shape(&frame(0.0, 0.1), &p), Vec2::ZERO);
        assert!(shock.shape(&frame(0.0, 0.75), &p).x > 0.0);
    }

    #[test]
    fn test_swirl_direction_follows_rotation_sense() {
        let cw = PulseKind::Swirl(RadialParams { clockwise: true, ..Default::default() });
        let ccw = PulseKind::Swirl(RadialParams { clockwise: false, ..Default::default() });
        let a = cw.shape(&frame(0.0, 0.0), &at(70.0, 50.0));
        let b = ccw.shape(&frame(0.0, 0.0), &at(70.0, 50.0));
        assert!(a.x.abs() < 1e-6 && a.y > 0.0);
        assert!((a + b).length() < 1e-6);
    }

    #[test]
    fn test_split_pushes_halves_apart() {
        let split = PulseKind::Split(DirectionParams { angle: 0.0 });
        let above = split.shape(&frame(0.0, 0.0), &at(50.0, 20.0));
        let below = split.shape(&frame(0.0, 0.0), &at(50.0, 80.0));
        assert!(above.y < 0.0 && below.y > 0.0);
    }

    #[test]
    fn test_jitter_is_reproducible() {
        let jitter = PulseKind::Jitter(ChaosParams::default());
        let a = jitter.shape(&frame(0.2, 0.0), &at(10.0, 10.0));
        let b = jitter.shape(&frame(0.2, 0.0), &at(10.0, 10.0));
        assert_eq!(a, b);
        assert!((a.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_randomize_scatters_then_returns() {
        let randomize = PulseKind::Randomize(RandomizeParams::default());
        let sample = at(70.0, 50.0);
        assert!(randomize.shape(&frame(0.0, 0.1), &sample).length() > 0.9);
        assert_eq!(randomize.shape(&frame(0.0, 0.45), &sample), Vec2::ZERO);
        assert!(randomize.shape(&frame(0.0, 0.9), &sample).x < 0.0);
    }

    #[test]
    fn test_queue_lifecycle() {
        let mut queue = PulseQueue::new();
        let a = queue.enqueue(ForcePulse::push(0.0).with_duration(100.0), 0.0);
        let b = queue.enqueue(ForcePulse::push(90.0).continuous(), 0.0);
        assert_ne!(a, b);
        assert_eq!(queue.get(a).unwrap().phase(-1.0), Phase::Queued);
        assert_eq!(queue.get(a).unwrap().phase(10.0), Phase::RampingIn);
        assert_eq!(queue.get(a).unwrap().phase(50.0), Phase::Holding);
        assert_eq!(queue.get(a).unwrap().phase(90.0), Phase::RampingOut);

        assert_eq!(queue.retire(100.0), 1);
        assert!(queue.get(a).is_none());
        assert_eq!(queue.retire(1.0e9), 0);

        assert!(!queue.cancel(a));
        assert!(queue.cancel(b));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_impulse_pulses_ignore_cancel() {
        let mut queue = PulseQueue::new();
        let id = queue.enqueue(ForcePulse::push(0.0), 0.0);
        assert!(!queue.cancel(id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_insert_keeps_ids_unique() {
        let mut queue = PulseQueue::new();
        queue.insert(PulseId(41), ForcePulse::default(), 0.0);
        assert_eq!(queue.enqueue(ForcePulse::default(), 0.0), PulseId(42));
    }

    #[test]
    fn test_evaluate_skips_zero_weight_and_sums_gain() {
        let mut queue = PulseQueue::new();
        queue.enqueue(ForcePulse::push(0.0).with_strength(3.0), 0.0);
        queue.enqueue(ForcePulse::push(0.0).with_strength(5.0), 200.0);
        assert!(queue.evaluate(0.0, CANVAS).is_empty());

        let live = queue.evaluate(500.0, CANVAS);
        assert_eq!(live.len(), 2);
        let total: Vec2 = live.iter().map(|l| l.force(&at(10.0, 10.0))).sum();
        assert!((total.x - 8.0 * PULSE_FORCE_SCALE).abs() < 1e-3);
    }

    #[test]
    fn test_continuous_envelope_holds() {
        let mut queue = PulseQueue::new();
        let id = queue.enqueue(ForcePulse::push(0.0).continuous().with_duration(100.0), 0.0);
        assert_eq!(queue.retire(1.0e6), 0);
        assert_eq!(queue.get(id).unwrap().weight(1.0e6), 1.0);
    }
}
