//! The live engine: particle store, force kernel and everything around it.
//!
//! One [`Engine`] owns one particle set. A host drives it once per animation
//! callback:
//!
//! ```ignore
//! use ipre::prelude::*;
//!
//! let mut engine = Engine::new(800, 600)
//!     .with_settings(settings)
//!     .with_image(SourceImage::new(decoded), Some("photo.png"));
//!
//! // UI button handler:
//! engine.enqueue_pulse(ForcePulse::burst(Vec2::splat(0.5), 1.0).with_strength(30.0));
//!
//! // Animation callback:
//! let dt_ms = clock.update();
//! engine.observe_frame_time(clock.raw_delta_ms());
//! engine.tick(dt_ms);
//! engine.draw(&mut surface);
//! ```
//!
//! UI code holds the engine (or a handle to it) and calls methods directly;
//! there is no global instance.
//!
//! # Kernel
//!
//! Each step, for every selected particle:
//!
//! ```text
//! F  = ambient + edge repulsion + Σ pulse × weight
//! k  = restorationForce × RESTORATION_SCALE × healing multiplier
//! c  = max(viscosity, 2√k)
//! v' = (v + dt·(F + k·(home - x))) / (1 + c·dt + k·dt²)
//! x' = x + v'·dt
//! ```
//!
//! followed by collisions (when enabled) and the wall mode. The spring and
//! damping terms are integrated implicitly, so any stiffness and step length
//! stay finite. Damping never drops below critical, so a particle left alone
//! approaches home without overshooting.

use crate::adaptive::{is_selected, PerformanceController};
use crate::bounds::{constrain, edge_force};
use crate::collision::CollisionSolver;
use crate::forces::{ambient_force, ForceFrame};
use crate::generator::Generator;
use crate::healing::HealingController;
use crate::particle::{Particle, ParticleStore};
use crate::pulse::{ForcePulse, PulseId, PulseQueue, PulseSample};
use crate::recording::{AnimationRecording, InputRecorder, RecordedFrame, StartSnapshot, StateRecorder};
use crate::render::{draw_particles, DrawSurface, Viewport};
use crate::settings::Settings;
use crate::source::SourceImage;
use glam::Vec2;
use image::Rgba;

/// Multiplier turning `restorationForce` into a spring constant (1/s²).
pub const RESTORATION_SCALE: f32 = 100.0;
/// Largest simulated step; longer ticks are split.
pub const MAX_STEP_SECONDS: f32 = 1.0 / 15.0;
/// Most sub-steps a single tick may take.
pub const MAX_SUBSTEPS: u32 = 8;
/// Tile tilt in radians per pixel/second of horizontal speed.
pub const TILT_PER_SPEED: f32 = 0.0015;
/// Largest tile tilt in radians.
pub const MAX_TILT: f32 = 0.6;

/// A running particle restoration simulation.
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    canvas: Vec2,
    source: Option<SourceImage>,
    source_label: Option<String>,
    store: ParticleStore,
    pulses: PulseQueue,
    healing: HealingController,
    performance: PerformanceController,
    collisions: CollisionSolver,
    active: Vec<u32>,
    state_recorder: StateRecorder,
    input_recorder: InputRecorder,
    time_ms: f64,
    tick_count: u64,
}

impl Engine {
    /// Create an engine for a `width × height` canvas showing the
    /// placeholder image with default settings.
    pub fn new(width: u32, height: u32) -> Self {
        Self::build(canvas_size(width, height), Settings::default(), None, None)
    }

    /// Rebuild the initial state of a recorded session.
    ///
    /// The particle layout is regenerated from the snapshot's image, canvas
    /// and settings, exactly as the live session generated it.
    pub fn from_snapshot(snapshot: &StartSnapshot) -> Self {
        Self::build(
            snapshot.canvas.max(Vec2::ONE),
            snapshot.settings.clone(),
            snapshot.source.clone(),
            snapshot.source_label.clone(),
        )
    }

    fn build(canvas: Vec2, settings: Settings, source: Option<SourceImage>, source_label: Option<String>) -> Self {
        let mut engine = Self {
            settings: settings.sanitized(),
            canvas,
            source,
            source_label,
            store: ParticleStore::default(),
            pulses: PulseQueue::new(),
            healing: HealingController::new(),
            performance: PerformanceController::new(),
            collisions: CollisionSolver::new(),
            active: Vec::new(),
            state_recorder: StateRecorder::new(),
            input_recorder: InputRecorder::new(),
            time_ms: 0.0,
            tick_count: 0,
        };
        engine.regenerate();
        engine
    }

    /// Replace the settings and regenerate.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings.sanitized();
        self.regenerate();
        self
    }

    /// Use `image` as the source and regenerate.
    pub fn with_image(mut self, image: SourceImage, label: Option<&str>) -> Self {
        self.load_image(image, label);
        self
    }

    /// Apply new settings.
    ///
    /// Forces, walls, collisions and the controllers pick them up on the next
    /// step. Particles are regenerated only when a generation parameter or
    /// the sprite shape changed.
    pub fn set_settings(&mut self, settings: Settings) {
        let settings = settings.sanitized();
        let regenerate = settings.generation != self.settings.generation
            || settings.render.shape != self.settings.render.shape;
        if !settings.performance.enabled && self.settings.performance.enabled {
            self.performance.reset();
        }
        self.settings = settings;
        if regenerate {
            self.regenerate();
        }
    }

    /// Use a new source image. `label` is kept in recordings so the host can
    /// find the image again.
    pub fn load_image(&mut self, image: SourceImage, label: Option<&str>) {
        if image.is_empty() {
            log::warn!("ignoring empty source image");
            return;
        }
        self.source = Some(image);
        self.source_label = label.map(str::to_owned);
        self.regenerate();
    }

    /// Drop the source image and fall back to the placeholder.
    pub fn clear_image(&mut self) {
        self.source = None;
        self.source_label = None;
        self.regenerate();
    }

    /// Change the canvas size and regenerate.
    pub fn resize(&mut self, width: u32, height: u32) {
        let canvas = canvas_size(width, height);
        if canvas != self.canvas {
            self.canvas = canvas;
            self.regenerate();
        }
    }

    /// Rebuild every particle from the current image, canvas and settings.
    ///
    /// Active pulses are kept; the healing subset is drawn again.
    pub fn regenerate(&mut self) {
        let particles = self.generator().generate(self.source.as_ref());
        log::debug!(
            "regenerated {} particles for {}x{} canvas",
            particles.len(),
            self.canvas.x,
            self.canvas.y
        );
        self.store.replace(particles);
        self.healing.reset();
    }

    /// Generator configured with the current canvas and settings.
    pub fn generator(&self) -> Generator {
        Generator::new(self.canvas, self.settings.generation.clone(), self.settings.render.shape)
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    ///
    /// Ticks longer than [`MAX_STEP_SECONDS`] are split into equal sub-steps,
    /// at most [`MAX_SUBSTEPS`] of them; time beyond that is dropped.
    pub fn tick(&mut self, dt_ms: f32) {
        if !dt_ms.is_finite() || dt_ms <= 0.0 {
            return;
        }
        let budget = MAX_STEP_SECONDS * MAX_SUBSTEPS as f32;
        let mut dt = dt_ms / 1000.0;
        if dt > budget {
            log::warn!("tick of {dt_ms:.1} ms exceeds {:.0} ms, dropping the rest", budget * 1000.0);
            dt = budget;
        }
        let steps = ((dt / MAX_STEP_SECONDS).ceil() as u32).clamp(1, MAX_SUBSTEPS);
        let h = dt / steps as f32;
        for _ in 0..steps {
            self.step(h);
        }
        self.tick_count += 1;

        let fraction = self.visible_fraction();
        self.state_recorder.observe(self.time_ms, self.store.as_slice(), fraction);
    }

    fn step(&mut self, dt: f32) {
        let canvas = self.canvas;
        let count = self.store.len();
        self.healing.sync(&self.settings.healing, count);

        let fraction = self.visible_fraction();
        self.active.clear();
        self.active.extend((0..count).filter(|&i| is_selected(i, fraction)).map(|i| i as u32));

        let settings = &self.settings;
        let live = self.pulses.evaluate(self.time_ms, canvas);
        let frame = ForceFrame { canvas, time: (self.time_ms / 1000.0) as f32 };
        let stiffness = settings.restoration_force * RESTORATION_SCALE;
        let particles = self.store.as_mut_slice();

        for &index in &self.active {
            let p = &mut particles[index as usize];
            let home = p.home();
            let sample = PulseSample { index, position: p.position, home };

            let mut force = ambient_force(&settings.forces, &frame, p.position)
                + edge_force(&settings.walls.edge_repulsion, canvas, p.position);
            for pulse in &live {
                force += pulse.force(&sample);
            }
            let k = stiffness * self.healing.multiplier(index as usize);
            let c = settings.viscosity.max(2.0 * k.sqrt());
            force += (home - p.position) * k;

            p.velocity = (p.velocity + force * dt) / (1.0 + c * dt + k * dt * dt);
            p.position += p.velocity * dt;
        }

        if settings.collisions.enabled {
            self.collisions
                .resolve(particles, &self.active, canvas, &settings.collisions, &settings.material);
        }
        for &index in &self.active {
            let p = &mut particles[index as usize];
            constrain(&settings.walls, canvas, p);
            tilt(p);
        }

        self.time_ms += dt as f64 * 1000.0;
        self.pulses.retire(self.time_ms);
    }

    /// Start a pulse now. Recorded when input recording is on.
    pub fn enqueue_pulse(&mut self, pulse: ForcePulse) -> PulseId {
        let id = self.pulses.enqueue(pulse, self.time_ms);
        if self.input_recorder.is_recording() {
            if let Some(active) = self.pulses.get(id) {
                self.input_recorder.record_pulse(id, &active.pulse, self.time_ms);
            }
        }
        log::trace!("{id} enqueued at {:.1} ms", self.time_ms);
        id
    }

    /// Parse a pulse from UI JSON and start it. Bad input is logged and
    /// ignored.
    pub fn enqueue_pulse_json(&mut self, json: &str) -> Option<PulseId> {
        match ForcePulse::from_json(json) {
            Ok(pulse) => Some(self.enqueue_pulse(pulse)),
            Err(err) => {
                log::warn!("ignoring pulse: {err}");
                None
            }
        }
    }

    /// Stop a continuous pulse. Recorded when input recording is on.
    pub fn cancel_continuous(&mut self, id: PulseId) -> bool {
        let cancelled = self.pulses.cancel(id);
        if cancelled {
            self.input_recorder.record_cancel(id, self.time_ms);
        }
        cancelled
    }

    /// Start a pulse under a fixed id at an arbitrary time. Replay only.
    pub(crate) fn schedule_pulse(&mut self, id: PulseId, pulse: ForcePulse, start_ms: f64) {
        self.pulses.insert(id, pulse, start_ms);
    }

    /// Remove every pulse.
    pub fn clear_pulses(&mut self) {
        self.pulses.clear();
    }

    /// Send every particle home at once.
    pub fn reset_particles(&mut self) {
        self.store.reset_all();
    }

    /// Draw onto `surface`, scaled to fit.
    pub fn draw<S: DrawSurface + ?Sized>(&self, surface: &mut S) {
        let viewport = Viewport::fit(self.canvas, surface.size());
        self.draw_with(surface, viewport);
    }

    /// Draw onto `surface` through an explicit viewport.
    pub fn draw_with<S: DrawSurface + ?Sized>(&self, surface: &mut S, viewport: Viewport) {
        draw_particles(
            surface,
            self.store.as_slice(),
            self.visible_fraction(),
            viewport,
            Rgba(self.settings.render.background),
        );
    }

    /// Feed the wall-clock duration of the last frame to the performance
    /// controller. Returns the new visible fraction.
    pub fn observe_frame_time(&mut self, frame_ms: f32) -> f32 {
        self.performance.observe(&self.settings.performance, frame_ms)
    }

    /// Fraction of particles simulated and drawn; always 1 while adaptive
    /// performance is off.
    pub fn visible_fraction(&self) -> f32 {
        if self.settings.performance.enabled {
            self.performance.visible_fraction()
        } else {
            1.0
        }
    }

    pub fn performance(&self) -> &PerformanceController {
        &self.performance
    }

    /// Start sampling particle state at `sample_fps`.
    pub fn start_state_recording(&mut self, sample_fps: f32) {
        self.state_recorder.start(sample_fps, self.time_ms);
    }

    /// Stop sampling; returns the number of frames captured.
    pub fn stop_state_recording(&mut self) -> usize {
        self.state_recorder.stop()
    }

    pub fn is_state_recording(&self) -> bool {
        self.state_recorder.is_recording()
    }

    pub fn recorded_frames(&self) -> &[RecordedFrame] {
        self.state_recorder.frames()
    }

    pub fn take_recorded_frames(&mut self) -> Vec<RecordedFrame> {
        self.state_recorder.take_frames()
    }

    /// Start logging pulse input for deterministic replay.
    ///
    /// The snapshot holds the image, canvas and settings; replay regenerates
    /// the layout from them, so particles start at home.
    pub fn begin_input_recording(&mut self) {
        let snapshot = self.snapshot();
        self.input_recorder.begin(self.time_ms, snapshot);
    }

    /// Stop logging input and return the recording.
    pub fn end_input_recording(&mut self) -> Option<AnimationRecording> {
        self.input_recorder.end(self.time_ms)
    }

    pub fn is_input_recording(&self) -> bool {
        self.input_recorder.is_recording()
    }

    /// Image, canvas and settings needed to rebuild this engine's layout.
    pub fn snapshot(&self) -> StartSnapshot {
        StartSnapshot {
            source_label: self.source_label.clone(),
            source: self.source.clone(),
            canvas: self.canvas,
            settings: self.settings.clone(),
        }
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// Direct access for hosts that drag or nudge particles.
    ///
    /// Home positions stay fixed; only position, velocity and tile state
    /// can be changed.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        self.store.as_mut_slice()
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    /// Logical simulation time in milliseconds.
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn pulses(&self) -> &PulseQueue {
        &self.pulses
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable settings for the replay driver.
    pub(crate) fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

fn canvas_size(width: u32, height: u32) -> Vec2 {
    Vec2::new(width.max(1) as f32, height.max(1) as f32)
}

/// Tiles lean into horizontal motion and straighten at rest.
fn tilt(particle: &mut Particle) {
    let vx = particle.velocity.x;
    if let Some(tile) = &mut particle.tile {
        tile.rotation = (vx * TILT_PER_SPEED).clamp(-MAX_TILT, MAX_TILT);
    }
}
