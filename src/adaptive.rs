//! Adaptive performance controller.
//!
//! Sampled once per rendered frame. The controller smooths frame time with
//! an exponential moving average and nudges the visible fraction:
//!
//! - below `targetFps` for `observationFrames` consecutive frames:
//!   fraction -= `adjustStep`
//! - above `targetFps × 1.15` for twice that many frames:
//!   fraction += `adjustStep`
//!
//! The asymmetric windows and the headroom band keep it from flip-flopping
//! around the target. The fraction always stays within
//! `[minVisibleFraction, 1]`.
//!
//! Which particles count as visible is decided by [`is_selected`], a fixed
//! per-index predicate, so the same particles stay selected from frame to
//! frame and raising the fraction only ever adds particles.

use crate::settings::PerformanceSettings;

/// Smoothing factor of the frame-time average.
pub const EMA_ALPHA: f32 = 0.1;
/// Achieved FPS must exceed the target by this factor before scaling up.
pub const HEADROOM: f32 = 1.15;

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_8;

/// Whether particle `index` is simulated and drawn at `fraction`.
///
/// Low-discrepancy sequence: selected particles are spread evenly through
/// the index range, and the selection at a smaller fraction is a subset of
/// the selection at a larger one.
#[inline]
pub fn is_selected(index: usize, fraction: f32) -> bool {
    if fraction >= 1.0 {
        return true;
    }
    ((index as f64 * GOLDEN_RATIO_CONJUGATE).fract() as f32) < fraction
}

/// Hysteretic feedback loop over the visible fraction.
#[derive(Clone, Debug)]
pub struct PerformanceController {
    fraction: f32,
    average_ms: Option<f32>,
    slow_frames: u32,
    fast_frames: u32,
}

impl Default for PerformanceController {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceController {
    pub fn new() -> Self {
        Self { fraction: 1.0, average_ms: None, slow_frames: 0, fast_frames: 0 }
    }

    /// Feed one frame time and return the updated fraction.
    pub fn observe(&mut self, settings: &PerformanceSettings, frame_ms: f32) -> f32 {
        if !settings.enabled {
            self.fraction = 1.0;
            self.slow_frames = 0;
            self.fast_frames = 0;
            return self.fraction;
        }
        let min = settings.min_visible_fraction.clamp(0.01, 1.0);
        if !frame_ms.is_finite() || frame_ms <= 0.0 {
            self.fraction = self.fraction.clamp(min, 1.0);
            return self.fraction;
        }

        let average = match self.average_ms {
            Some(avg) => avg + (frame_ms - avg) * EMA_ALPHA,
            None => frame_ms,
        };
        self.average_ms = Some(average);
        let fps = 1000.0 / average;
        let window = settings.observation_frames.max(1);

        if fps < settings.target_fps && self.fraction > min {
            self.fast_frames = 0;
            self.slow_frames += 1;
            if self.slow_frames >= window {
                self.fraction -= settings.adjust_step;
                self.slow_frames = 0;
                log::debug!("performance: {fps:.1} fps, visible fraction down to {:.2}", self.fraction.max(min));
            }
        } else if fps > settings.target_fps * HEADROOM && self.fraction < 1.0 {
            self.slow_frames = 0;
            self.fast_frames += 1;
            if self.fast_frames >= window * 2 {
                self.fraction += settings.adjust_step;
                self.fast_frames = 0;
                log::debug!("performance: {fps:.1} fps, visible fraction up to {:.2}", self.fraction.min(1.0));
            }
        } else {
            self.slow_frames = 0;
            self.fast_frames = 0;
        }

        self.fraction = self.fraction.clamp(min, 1.0);
        self.fraction
    }

    pub fn visible_fraction(&self) -> f32 {
        self.fraction
    }

    /// Smoothed FPS, if any frame has been observed.
    pub fn achieved_fps(&self) -> Option<f32> {
        self.average_ms.map(|avg| 1000.0 / avg)
    }

    /// Back to full fidelity with no history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PerformanceSettings {
        PerformanceSettings::default()
    }

    #[test]
    fn test_slow_frames_reduce_fraction_after_window() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for _ in 0..s.observation_frames - 1 {
            assert_eq!(ctl.observe(&s, 40.0), 1.0);
        }
        let f = ctl.observe(&s, 40.0);
        assert!((f - (1.0 - s.adjust_step)).abs() < 1e-6);
    }

    #[test]
    fn test_fraction_stays_in_bounds() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for i in 0..5000 {
            let frame_ms = match i % 700 {
                0..=299 => 100.0,
                300..=399 => f32::NAN,
                _ => 2.0,
            };
            let f = ctl.observe(&s, frame_ms);
            assert!(f >= s.min_visible_fraction && f <= 1.0, "frame {i}: {f}");
        }
    }

    #[test]
    fn test_reaches_floor_under_sustained_load() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for _ in 0..1000 {
            ctl.observe(&s, 200.0);
        }
        assert_eq!(ctl.visible_fraction(), s.min_visible_fraction);
    }

    #[test]
    fn test_recovers_when_fast() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for _ in 0..200 {
            ctl.observe(&s, 50.0);
        }
        assert!(ctl.visible_fraction() < 1.0);
        for _ in 0..2000 {
            ctl.observe(&s, 5.0);
        }
        assert_eq!(ctl.visible_fraction(), 1.0);
    }

    #[test]
    fn test_no_change_inside_headroom_band() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for _ in 0..200 {
            ctl.observe(&s, 50.0);
        }
        let settled = ctl.visible_fraction();
        // 65 fps: above target, below target * 1.15
        for _ in 0..500 {
            ctl.observe(&s, 1000.0 / 65.0);
        }
        assert_eq!(ctl.visible_fraction(), settled);
    }

    #[test]
    fn test_disabled_means_full_fidelity() {
        let mut ctl = PerformanceController::new();
        let s = settings();
        for _ in 0..100 {
            ctl.observe(&s, 200.0);
        }
        let off = PerformanceSettings { enabled: false, ..settings() };
        assert_eq!(ctl.observe(&off, 200.0), 1.0);
    }

    #[test]
    fn test_selection_is_nested_and_proportional() {
        let n = 10_000;
        let count = |f: f32| (0..n).filter(|&i| is_selected(i, f)).count();
        assert_eq!(count(1.0), n);
        for &f in &[0.25f32, 0.5, 0.8] {
            let c = count(f) as f32 / n as f32;
            assert!((c - f).abs() < 0.01, "{f}: {c}");
        }
        for i in 0..n {
            if is_selected(i, 0.3) {
                assert!(is_selected(i, 0.6));
            }
        }
    }
}
