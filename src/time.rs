//! Frame clock for live hosts.
//!
//! The engine itself only ever sees the milliseconds a host passes to
//! [`Engine::tick`](crate::Engine::tick). This clock is the usual way to
//! produce them in a live loop: it measures wall-clock frame time, applies
//! pause, time scale and an optional fixed delta, and keeps a windowed FPS.
//!
//! # Example
//!
//! ```ignore
//! use ipre::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // In the host's animation callback:
//! let dt_ms = clock.update();
//! engine.observe_frame_time(clock.raw_delta_ms());
//! engine.tick(dt_ms);
//! engine.draw(&mut surface);
//! ```
//!
//! Offline export never uses this clock; it steps logical time directly.

use std::time::{Duration, Instant};

/// Tracks frame timing in milliseconds.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    /// Simulated time since creation (scaled, excludes pauses).
    elapsed_ms: f64,
    /// Simulation delta for the current frame.
    delta_ms: f32,
    /// Unscaled wall-clock time of the current frame.
    raw_delta_ms: f32,
    frame_count: u64,
    fps: f32,
    fps_window_frames: u64,
    fps_window_ms: f32,
    fps_update_interval: Duration,
    paused: bool,
    fixed_delta_ms: Option<f32>,
    time_scale: f32,
}

impl FrameClock {
    /// Create a clock starting now.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed_ms: 0.0,
            delta_ms: 0.0,
            raw_delta_ms: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_window_frames: 0,
            fps_window_ms: 0.0,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta_ms: None,
            time_scale: 1.0,
        }
    }

    /// Measure the time since the previous call. Call once per frame.
    ///
    /// Returns the simulation delta in milliseconds.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        self.advance(raw)
    }

    /// Advance by an externally measured frame time.
    ///
    /// Hosts with their own timestamps (e.g. an animation callback argument)
    /// use this instead of [`update`](Self::update).
    pub fn advance(&mut self, raw_delta_ms: f32) -> f32 {
        let raw = if raw_delta_ms.is_finite() { raw_delta_ms.max(0.0) } else { 0.0 };
        self.raw_delta_ms = raw;
        self.frame_count += 1;

        self.fps_window_frames += 1;
        self.fps_window_ms += raw;
        if self.fps_window_ms >= self.fps_update_interval.as_secs_f32() * 1000.0 {
            self.fps = self.fps_window_frames as f32 * 1000.0 / self.fps_window_ms;
            self.fps_window_frames = 0;
            self.fps_window_ms = 0.0;
        }

        if self.paused {
            self.delta_ms = 0.0;
            return 0.0;
        }
        self.delta_ms = self.fixed_delta_ms.unwrap_or(raw) * self.time_scale;
        self.elapsed_ms += self.delta_ms as f64;
        self.delta_ms
    }

    /// Simulated milliseconds since creation.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Simulation delta of the current frame.
    #[inline]
    pub fn delta_ms(&self) -> f32 {
        self.delta_ms
    }

    /// Wall-clock duration of the current frame, ignoring pause and scale.
    #[inline]
    pub fn raw_delta_ms(&self) -> f32 {
        self.raw_delta_ms
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the last measurement window.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Stop simulated time. Frame timing keeps being measured.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Use a fixed simulation delta instead of measured frame time.
    pub fn set_fixed_delta_ms(&mut self, delta_ms: Option<f32>) {
        self.fixed_delta_ms = delta_ms;
    }

    /// Set the time scale multiplier (`0.5` is slow motion).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        *self = Self {
            fixed_delta_ms: self.fixed_delta_ms,
            time_scale: self.time_scale,
            ..Self::new()
        };
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn test_update_measures_wall_time() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let dt = clock.update();
        assert!(dt >= 10.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_pause_freezes_simulated_time() {
        let mut clock = FrameClock::new();
        clock.advance(16.0);
        clock.pause();
        assert_eq!(clock.advance(16.0), 0.0);
        assert_eq!(clock.elapsed_ms(), 16.0);
        assert_eq!(clock.raw_delta_ms(), 16.0);
        clock.resume();
        clock.advance(16.0);
        assert_eq!(clock.elapsed_ms(), 32.0);
    }

    #[test]
    fn test_scale_and_fixed_delta() {
        let mut clock = FrameClock::new();
        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), 0.0);
        clock.set_time_scale(0.5);
        assert_eq!(clock.advance(20.0), 10.0);

        clock.set_fixed_delta_ms(Some(8.0));
        assert_eq!(clock.advance(100.0), 4.0);
    }

    #[test]
    fn test_fps_window() {
        let mut clock = FrameClock::new();
        for _ in 0..40 {
            clock.advance(12.5);
        }
        assert!((clock.fps() - 80.0).abs() < 0.01);
    }

    #[test]
    fn test_bad_frame_times_are_ignored() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(f32::NAN), 0.0);
        assert_eq!(clock.advance(-5.0), 0.0);
    }
}
