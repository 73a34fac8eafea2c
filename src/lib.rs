//! # IPRE - Image Particle Restoration Engine
//!
//! Turn an image into particles, knock them around with forces, and watch
//! them heal back into the picture.
//!
//! IPRE is the simulation core only: it consumes decoded pixels and a
//! settings snapshot, and draws onto a surface the host provides. Decoding,
//! UI, persistence and video encoding belong to the surrounding
//! application.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ipre::prelude::*;
//!
//! let mut settings = Settings::default();
//! settings.generation.mode = AnimationMode::TileGrid;
//! settings.generation.grid_size = 16;
//!
//! let mut engine = Engine::new(640, 480)
//!     .with_settings(settings)
//!     .with_image(SourceImage::new(decoded_rgba), Some("photo.png"));
//!
//! engine.enqueue_pulse(ForcePulse::burst(Vec2::splat(0.5), 1.0).with_strength(30.0));
//!
//! let mut surface = RasterSurface::new(640, 480)?;
//! for _ in 0..120 {
//!     engine.tick(1000.0 / 60.0);
//!     engine.draw(&mut surface);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! Every [`Particle`] has a fixed home position taken from the image. The
//! [`Generator`] builds particles in one of two modes:
//!
//! - **pixel sample**: one flat sprite per sampled pixel
//! - **tile grid**: one cropped sub-image per grid cell
//!
//! ### Forces and pulses
//!
//! Each tick sums ambient forces from [`Settings`], every active
//! [`ForcePulse`] scaled by its eased envelope, and a spring pulling each
//! particle home. Pulses come in 26 kinds:
//!
//! ```ignore
//! engine.enqueue_pulse(ForcePulse::push(90.0).with_duration(500.0));
//! let id = engine.enqueue_pulse(ForcePulse::new(PulseKind::Swirl(Default::default())).continuous());
//! // later
//! engine.cancel_continuous(id);
//! ```
//!
//! ### Walls
//!
//! | Mode | Clamp | Velocity |
//! |------|-------|----------|
//! | bounce | inward by the sprite's half size | reflected × restitution |
//! | confine | to the canvas edge | zeroed on that axis |
//!
//! ### Recording and export
//!
//! Two recorders can run side by side:
//!
//! - state sampling ([`Engine::start_state_recording`]) keeps cheap
//!   snapshots of what was drawn, for a quick preview export
//! - input recording ([`Engine::begin_input_recording`]) keeps every pulse
//!   with its timestamp, so [`render_recording`] can re-simulate the session
//!   exactly at any frame rate
//!
//! ## Logging
//!
//! IPRE logs through the [`log`] facade and installs no logger. Regeneration
//! and controller changes go to `debug`, recording and export lifecycle to
//! `info`, and ignored input to `warn`.

pub mod adaptive;
pub mod bounds;
pub mod collision;
pub mod easing;
mod engine;
pub mod error;
pub mod forces;
pub mod generator;
pub mod healing;
pub mod particle;
pub mod pulse;
pub mod recording;
pub mod render;
pub mod replay;
pub mod settings;
pub mod source;
pub mod spatial;
pub mod time;
pub mod visuals;

pub use bytemuck;
pub use engine::{Engine, MAX_STEP_SECONDS, MAX_SUBSTEPS, RESTORATION_SCALE};
pub use error::{PulseError, RecordingError, RenderError, SettingsError, SurfaceError};
pub use generator::Generator;
pub use glam::Vec2;
pub use image;
pub use particle::{Particle, ParticleStore, TilePayload};
pub use pulse::{ForcePulse, PulseId, PulseKind, PulseMode};
pub use recording::{AnimationRecording, RecordedFrame, SampledParticle};
pub use render::{DrawSurface, RasterSurface, RasterSurfaceFactory, SurfaceFactory, Viewport};
pub use replay::{
    render_recording, render_sampled_frames, AbortSignal, ComposedFrame, ExportOptions, RenderOutcome, ReplaySession,
    MAX_EXPORT_FRAMES,
};
pub use settings::Settings;
pub use source::SourceImage;
pub use visuals::{ParticleShape, Visual};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use ipre::prelude::*;
/// ```
///
/// This imports:
/// - [`Engine`] - the live simulation
/// - [`Settings`] and its sub-structs
/// - [`ForcePulse`], [`PulseKind`] and the per-kind parameter structs
/// - [`SourceImage`] and the raster surface types
/// - the export entry points
/// - [`Vec2`] - glam vector type
pub mod prelude {
    pub use crate::easing::Easing;
    pub use crate::engine::Engine;
    pub use crate::error::{RenderError, SurfaceError};
    pub use crate::pulse::{
        BreatheParams, ChaosParams, DirectionParams, ForcePulse, GustParams, PulseId, PulseKind, PulseMode,
        RadialParams, RandomizeParams, RingParams, RippleParams, SpiralParams, WaveParams,
    };
    pub use crate::recording::{AnimationRecording, RecordedFrame};
    pub use crate::render::{DrawSurface, RasterSurface, RasterSurfaceFactory, SurfaceFactory, Viewport};
    pub use crate::replay::{
        render_recording, render_sampled_frames, AbortSignal, ComposedFrame, ExportOptions, RenderOutcome,
        ReplaySession,
    };
    pub use crate::settings::{AnimationMode, SamplingStrategy, Settings, WallMode};
    pub use crate::source::SourceImage;
    pub use crate::time::FrameClock;
    pub use crate::visuals::ParticleShape;
    pub use crate::Vec2;
}
