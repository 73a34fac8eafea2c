//! Error types for IPRE.
//!
//! The live simulation never fails: bad settings are clamped and bad pulses
//! are dropped. Errors only surface at the edges, when parsing host input or
//! when driving an offline export.

use thiserror::Error;

/// Errors produced while parsing a pulse handed over by the UI layer.
#[derive(Debug, Error)]
pub enum PulseError {
    /// The `kind` tag names a pulse this engine does not know.
    #[error("unknown pulse kind `{0}`")]
    UnknownKind(String),
    /// The payload has no `kind` tag at all.
    #[error("pulse is missing its `kind` tag")]
    MissingKind,
    /// The payload is not valid pulse JSON.
    #[error("malformed pulse: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors produced while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings document could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors that can occur when acquiring an offscreen drawing surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// One of the requested dimensions is zero.
    #[error("cannot create a {width}x{height} surface")]
    ZeroSize { width: u32, height: u32 },
    /// The requested surface exceeds the factory's limit.
    #[error("{width}x{height} exceeds the maximum surface dimension of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Errors that stop an export before or while it produces frames.
///
/// Cancellation is deliberately absent: an aborted export finishes with
/// [`RenderOutcome::Cancelled`](crate::replay::RenderOutcome::Cancelled).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The recording holds no pulses or sampled frames, or its duration is zero.
    #[error("nothing to render: the recording is empty")]
    NothingToRender,
    /// The requested export frame rate is zero, negative or not finite.
    #[error("invalid export frame rate {0}")]
    InvalidFrameRate(f32),
    /// The export duration is not finite or needs more than
    /// [`MAX_EXPORT_FRAMES`](crate::replay::MAX_EXPORT_FRAMES) frames.
    #[error("invalid export duration {0} ms")]
    InvalidDuration(f64),
    /// No drawing surface could be acquired for the export.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(#[from] SurfaceError),
    /// The frame consumer (usually a video encoder) rejected a frame.
    #[error("frame consumer failed: {0}")]
    Encoder(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors produced while loading a persisted recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// The recording document could not be parsed.
    #[error("failed to parse recording: {0}")]
    Parse(#[from] serde_json::Error),
}
