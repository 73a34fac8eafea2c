//! Capturing a live session.
//!
//! Two independent recorders observe the live loop:
//!
//! - [`StateRecorder`] samples what the particles *look like* at a reduced
//!   rate. Its [`RecordedFrame`]s are only ever drawn back, never
//!   simulated, which makes them a cheap preview path.
//! - [`InputRecorder`] logs what the user *did*: every pulse and
//!   cancellation with its timestamp, plus a [`StartSnapshot`] of the image,
//!   canvas and settings. The resulting [`AnimationRecording`] is replayed
//!   through the simulation by [`crate::replay`] to produce an exact,
//!   repeatable frame sequence.
//!
//! Both can run at the same time; each only appends to its own buffer.

use crate::adaptive::is_selected;
use crate::error::RecordingError;
use crate::particle::Particle;
use crate::pulse::{ForcePulse, PulseId};
use crate::settings::Settings;
use crate::source::SourceImage;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Default state sampling rate, about half a typical display rate.
pub const DEFAULT_SAMPLE_FPS: f32 = 30.0;

/// Render attributes of one particle in a state sample.
///
/// Packed so a whole frame can be handed to the host as bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SampledParticle {
    pub x: f32,
    pub y: f32,
    /// Straight-alpha RGBA.
    pub color: [u8; 4],
    /// Sprite edge length in canvas pixels.
    pub size: f32,
    /// [`ParticleShape::code`](crate::visuals::ParticleShape::code).
    pub shape: u32,
    /// 1 when drawn, 0 otherwise.
    pub visible: u32,
}

impl SampledParticle {
    fn capture(particle: &Particle, drawn: bool) -> Self {
        Self {
            x: particle.position.x,
            y: particle.position.y,
            color: particle.visual.color.0,
            size: particle.visual.size,
            shape: particle.visual.shape.code(),
            visible: drawn as u32,
        }
    }
}

/// One state sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    /// Milliseconds since recording started.
    pub timestamp_ms: f64,
    /// Every particle, in store order.
    pub particles: Vec<SampledParticle>,
}

impl RecordedFrame {
    /// The particle records as a flat byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }
}

/// Lightweight sampler of particle render state.
#[derive(Clone, Debug, Default)]
pub struct StateRecorder {
    recording: bool,
    interval_ms: f64,
    started_ms: f64,
    next_sample_ms: f64,
    frames: Vec<RecordedFrame>,
}

impl StateRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start sampling at `sample_fps`, discarding earlier frames.
    pub fn start(&mut self, sample_fps: f32, now_ms: f64) {
        let fps = if sample_fps.is_finite() && sample_fps > 0.0 {
            sample_fps
        } else {
            log::warn!("invalid sample rate {sample_fps}, using {DEFAULT_SAMPLE_FPS}");
            DEFAULT_SAMPLE_FPS
        };
        self.recording = true;
        self.interval_ms = 1000.0 / fps as f64;
        self.started_ms = now_ms;
        self.next_sample_ms = now_ms;
        self.frames.clear();
        log::info!("state recording started at {fps} samples/s");
    }

    /// Stop sampling. Frames are kept until the next start.
    pub fn stop(&mut self) -> usize {
        if self.recording {
            log::info!("state recording stopped with {} frames", self.frames.len());
        }
        self.recording = false;
        self.frames.len()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Take a sample if one is due at `now_ms`.
    pub fn observe(&mut self, now_ms: f64, particles: &[Particle], fraction: f32) -> bool {
        if !self.recording || now_ms < self.next_sample_ms {
            return false;
        }
        let samples = particles
            .iter()
            .enumerate()
            .map(|(i, p)| SampledParticle::capture(p, p.visible && is_selected(i, fraction)))
            .collect();
        self.frames.push(RecordedFrame { timestamp_ms: now_ms - self.started_ms, particles: samples });
        // Skip missed slots rather than bursting to catch up.
        while self.next_sample_ms <= now_ms {
            self.next_sample_ms += self.interval_ms;
        }
        true
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn take_frames(&mut self) -> Vec<RecordedFrame> {
        std::mem::take(&mut self.frames)
    }
}

/// State needed to rebuild the initial particle layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSnapshot {
    /// Host-provided name of the source image, for re-attaching it later.
    #[serde(default)]
    pub source_label: Option<String>,
    /// The image itself. Not serialized; see [`AnimationRecording::with_source`].
    #[serde(skip)]
    pub source: Option<SourceImage>,
    pub canvas: Vec2,
    pub settings: Settings,
}

/// A recorded user input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    Pulse { id: PulseId, pulse: ForcePulse },
    Cancel { id: PulseId },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEvent {
    /// Milliseconds since recording started.
    pub timestamp_ms: f64,
    pub event: InputEvent,
}

/// Deterministic input log of a live session.
///
/// Events are in non-decreasing timestamp order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationRecording {
    pub snapshot: StartSnapshot,
    pub events: Vec<TimedEvent>,
    pub total_duration_ms: f64,
}

impl AnimationRecording {
    /// Whether there is anything to replay.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of recorded pulses (cancellations excluded).
    pub fn pulse_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e.event, InputEvent::Pulse { .. })).count()
    }

    /// Attach the source image, e.g. after loading a persisted recording.
    pub fn with_source(mut self, image: SourceImage) -> Self {
        self.snapshot.source = Some(image);
        self
    }

    pub fn to_json(&self) -> Result<String, RecordingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a persisted recording. The source image must be re-attached.
    pub fn from_json(json: &str) -> Result<Self, RecordingError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Debug)]
struct InputSession {
    started_ms: f64,
    snapshot: StartSnapshot,
    events: Vec<TimedEvent>,
}

/// Logs pulse inputs for deterministic replay.
#[derive(Clone, Debug, Default)]
pub struct InputRecorder {
    session: Option<InputSession>,
}

impl InputRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new recording, dropping any unfinished one.
    pub fn begin(&mut self, now_ms: f64, snapshot: StartSnapshot) {
        if self.session.is_some() {
            log::warn!("input recording restarted; unfinished recording discarded");
        }
        self.session = Some(InputSession { started_ms: now_ms, snapshot, events: Vec::new() });
        log::info!("input recording started");
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Log a pulse enqueued at engine time `now_ms`.
    pub fn record_pulse(&mut self, id: PulseId, pulse: &ForcePulse, now_ms: f64) {
        self.push(now_ms, InputEvent::Pulse { id, pulse: pulse.clone() });
    }

    /// Log a cancellation at engine time `now_ms`.
    pub fn record_cancel(&mut self, id: PulseId, now_ms: f64) {
        self.push(now_ms, InputEvent::Cancel { id });
    }

    fn push(&mut self, now_ms: f64, event: InputEvent) {
        let Some(session) = &mut self.session else {
            return;
        };
        let relative = (now_ms - session.started_ms).max(0.0);
        let floor = session.events.last().map_or(0.0, |e| e.timestamp_ms);
        session.events.push(TimedEvent { timestamp_ms: relative.max(floor), event });
    }

    /// Finish and return the recording, if one was running.
    pub fn end(&mut self, now_ms: f64) -> Option<AnimationRecording> {
        let session = self.session.take()?;
        let last = session.events.last().map_or(0.0, |e| e.timestamp_ms);
        let total_duration_ms = (now_ms - session.started_ms).max(last);
        log::info!(
            "input recording finished: {} events over {:.0} ms",
            session.events.len(),
            total_duration_ms
        );
        Some(AnimationRecording { snapshot: session.snapshot, events: session.events, total_duration_ms })
    }
}
