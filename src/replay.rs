//! Offline export.
//!
//! Two export paths, matching the two recorders:
//!
//! | Source | Driver | Re-simulates | Output |
//! |--------|--------|--------------|--------|
//! | [`AnimationRecording`] | [`ReplaySession`] / [`render_recording`] | yes | exact, repeatable |
//! | [`RecordedFrame`]s | [`render_sampled_frames`] | no | quick preview |
//!
//! Deterministic replay rebuilds the engine from the recording's snapshot,
//! switches the performance controller off and steps logical time by
//! exactly `1000 / fps` milliseconds per output frame. A frame's tick is
//! split at every recorded event inside it, so pulses start and stop at
//! their recorded timestamps whatever the export rate. Wall-clock time
//! never enters, so the same recording always yields the same frames.
//!
//! Frames are produced strictly in order and handed to a caller-supplied
//! consumer (usually a video encoder). Between frames the driver checks an
//! [`AbortSignal`]; an aborted export returns [`RenderOutcome::Cancelled`]
//! and drops its drawing surface without emitting a partial frame.
//!
//! ```ignore
//! let options = ExportOptions::new(30.0, 1280, 720);
//! let outcome = render_recording(
//!     &recording,
//!     &options,
//!     &mut RasterSurfaceFactory::default(),
//!     |frame| encoder.push(frame.image).map_err(Into::into),
//!     &abort,
//! )?;
//! ```

use crate::engine::Engine;
use crate::error::RenderError;
use crate::pulse::PulseId;
use crate::recording::{AnimationRecording, InputEvent, RecordedFrame, TimedEvent};
use crate::render::{draw_samples, DrawSurface, SurfaceFactory, Viewport};
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type a frame consumer may return.
pub type ConsumerError = Box<dyn Error + Send + Sync>;

/// Most frames a single export may produce.
pub const MAX_EXPORT_FRAMES: u64 = 10_000_000;

/// Events this close to the engine clock apply without splitting the tick.
const EVENT_SLACK_MS: f64 = 1e-3;

/// Output parameters of an export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// Output frames per second.
    pub fps: f32,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Length of the export; `None` uses the recording's own duration.
    pub duration_ms: Option<f64>,
}

impl ExportOptions {
    pub fn new(fps: f32, width: u32, height: u32) -> Self {
        Self { fps, width, height, duration_ms: None }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    fn frame_ms(&self) -> Result<f64, RenderError> {
        if self.fps.is_finite() && self.fps > 0.0 {
            Ok(1000.0 / self.fps as f64)
        } else {
            Err(RenderError::InvalidFrameRate(self.fps))
        }
    }

    /// Frames covering `duration_ms`, rounded by `round`.
    fn frames_for(&self, duration_ms: f64, round: fn(f64) -> f64) -> Result<u64, RenderError> {
        let frames = round(duration_ms * self.fps as f64 / 1000.0);
        if !frames.is_finite() || frames > MAX_EXPORT_FRAMES as f64 {
            return Err(RenderError::InvalidDuration(duration_ms));
        }
        Ok(frames.max(0.0) as u64)
    }
}

fn checked_duration(duration_ms: f64) -> Result<f64, RenderError> {
    if !duration_ms.is_finite() {
        Err(RenderError::InvalidDuration(duration_ms))
    } else {
        Ok(duration_ms)
    }
}

/// Cooperative cancellation flag shared between a UI and an export.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The export stops before its next frame.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How an export ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Every frame was handed to the consumer.
    Completed { frames: u64 },
    /// Stopped by the abort signal. The output is incomplete.
    Cancelled { frames_emitted: u64 },
}

/// One output frame.
#[derive(Clone, Debug)]
pub struct ComposedFrame {
    /// Zero-based output frame number.
    pub index: u64,
    /// Logical time of the frame.
    pub timestamp_ms: f64,
    pub image: RgbaImage,
}

/// Stepwise deterministic replay of an [`AnimationRecording`].
///
/// Each [`next_frame`](Self::next_frame) call advances the simulation by one
/// output frame, so a host can spread an export over async continuations.
/// Frame 0 shows the initial layout.
pub struct ReplaySession<S: DrawSurface> {
    engine: Engine,
    surface: S,
    viewport: Viewport,
    events: Vec<TimedEvent>,
    cursor: usize,
    frame_ms: f64,
    frame_count: u64,
    next_index: u64,
}

impl<S: DrawSurface> ReplaySession<S> {
    /// Prepare a replay.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NothingToRender`] when the recording has no pulses
    ///   or the export duration is zero
    /// - [`RenderError::InvalidDuration`] for a non-finite duration or one
    ///   longer than [`MAX_EXPORT_FRAMES`] frames
    /// - [`RenderError::InvalidFrameRate`] for a non-positive `fps`
    /// - [`RenderError::SurfaceUnavailable`] when `factory` cannot provide
    ///   a surface of the requested size
    pub fn new<F>(recording: &AnimationRecording, options: &ExportOptions, factory: &mut F) -> Result<Self, RenderError>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let duration_ms = checked_duration(options.duration_ms.unwrap_or(recording.total_duration_ms))?;
        if recording.pulse_count() == 0 || duration_ms <= 0.0 {
            return Err(RenderError::NothingToRender);
        }
        let frame_ms = options.frame_ms()?;
        let frame_count = options.frames_for(duration_ms, f64::ceil)?.max(1);
        let surface = factory.acquire(options.width, options.height)?;

        let snapshot = &recording.snapshot;
        if snapshot.source.is_none() {
            if let Some(label) = &snapshot.source_label {
                log::warn!("recording image `{label}` is not attached, replaying over the placeholder");
            }
        }
        let mut engine = Engine::from_snapshot(snapshot);
        engine.settings_mut().performance.enabled = false;
        let viewport = Viewport::fit(engine.canvas(), surface.size());

        log::info!(
            "replaying {} events over {:.0} ms as {} frames at {} fps",
            recording.events.len(),
            duration_ms,
            frame_count,
            options.fps
        );
        Ok(Self {
            engine,
            surface,
            viewport,
            events: recording.events.clone(),
            cursor: 0,
            frame_ms,
            frame_count,
            next_index: 0,
        })
    }

    /// Total number of frames this session produces.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames produced so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_index
    }

    /// The replayed engine, e.g. for inspecting particle state.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Simulate and compose the next frame, or `None` when done.
    pub fn next_frame(&mut self) -> Option<ComposedFrame> {
        if self.next_index >= self.frame_count {
            return None;
        }
        let index = self.next_index;
        let timestamp_ms = index as f64 * self.frame_ms;
        if index > 0 {
            self.advance_to(timestamp_ms);
        }
        self.engine.draw_with(&mut self.surface, self.viewport);
        self.next_index += 1;
        Some(ComposedFrame { index, timestamp_ms, image: self.surface.snapshot() })
    }

    /// Simulate one frame interval, applying every event recorded before
    /// `until_ms` at its own timestamp.
    fn advance_to(&mut self, until_ms: f64) {
        let frame_end = self.engine.time_ms() + self.frame_ms;
        while let Some(timed) = self.events.get(self.cursor) {
            if timed.timestamp_ms >= until_ms {
                break;
            }
            let lead = timed.timestamp_ms.min(frame_end) - self.engine.time_ms();
            if lead > EVENT_SLACK_MS {
                self.engine.tick(lead as f32);
            }
            match &timed.event {
                InputEvent::Pulse { id, pulse } => self.engine.schedule_pulse(*id, pulse.clone(), timed.timestamp_ms),
                InputEvent::Cancel { id } => cancel(&mut self.engine, *id),
            }
            self.cursor += 1;
        }
        let rest = frame_end - self.engine.time_ms();
        if rest > EVENT_SLACK_MS {
            self.engine.tick(rest as f32);
        }
    }
}

fn cancel(engine: &mut Engine, id: PulseId) {
    if !engine.cancel_continuous(id) {
        log::debug!("recorded cancel of {id} had nothing to cancel");
    }
}

/// Replay `recording` and hand every frame to `on_frame`.
///
/// Returns [`RenderOutcome::Cancelled`] if `abort` fires; the consumer has
/// then received only complete frames, but not all of them. A consumer
/// error stops the export with [`RenderError::Encoder`].
pub fn render_recording<F, C>(
    recording: &AnimationRecording,
    options: &ExportOptions,
    factory: &mut F,
    mut on_frame: C,
    abort: &AbortSignal,
) -> Result<RenderOutcome, RenderError>
where
    F: SurfaceFactory,
    C: FnMut(ComposedFrame) -> Result<(), ConsumerError>,
{
    let mut session = ReplaySession::new(recording, options, factory)?;
    let total = session.frame_count();
    drive(total, abort, &mut on_frame, |_| session.next_frame())
}

/// Export a state-sample stream without simulating.
///
/// Each output frame shows the latest sample at or before its timestamp.
/// Tiles appear as flat squares since samples carry no bitmaps.
pub fn render_sampled_frames<F, C>(
    frames: &[RecordedFrame],
    canvas: Vec2,
    background: Rgba<u8>,
    options: &ExportOptions,
    factory: &mut F,
    mut on_frame: C,
    abort: &AbortSignal,
) -> Result<RenderOutcome, RenderError>
where
    F: SurfaceFactory,
    C: FnMut(ComposedFrame) -> Result<(), ConsumerError>,
{
    let Some(last) = frames.last() else {
        return Err(RenderError::NothingToRender);
    };
    let duration_ms = checked_duration(options.duration_ms.unwrap_or(last.timestamp_ms))?.max(0.0);
    let frame_ms = options.frame_ms()?;
    let total = options.frames_for(duration_ms, f64::floor)? + 1;
    let mut surface = factory.acquire(options.width, options.height)?;
    let viewport = Viewport::fit(canvas, surface.size());
    log::info!("exporting {} samples as {} frames at {} fps", frames.len(), total, options.fps);

    let mut cursor = 0;
    drive(total, abort, &mut on_frame, |index| {
        let timestamp_ms = index as f64 * frame_ms;
        while cursor + 1 < frames.len() && frames[cursor + 1].timestamp_ms <= timestamp_ms {
            cursor += 1;
        }
        draw_samples(&mut surface, &frames[cursor].particles, viewport, background);
        Some(ComposedFrame { index, timestamp_ms, image: surface.snapshot() })
    })
}

fn drive<C, P>(total: u64, abort: &AbortSignal, on_frame: &mut C, mut produce: P) -> Result<RenderOutcome, RenderError>
where
    C: FnMut(ComposedFrame) -> Result<(), ConsumerError>,
    P: FnMut(u64) -> Option<ComposedFrame>,
{
    for index in 0..total {
        if abort.is_aborted() {
            log::info!("export cancelled after {index} of {total} frames");
            return Ok(RenderOutcome::Cancelled { frames_emitted: index });
        }
        let Some(frame) = produce(index) else {
            break;
        };
        on_frame(frame).map_err(RenderError::Encoder)?;
    }
    log::info!("export finished: {total} frames");
    Ok(RenderOutcome::Completed { frames: total })
}
