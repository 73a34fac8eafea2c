//! Easing curves and pulse envelopes.
//!
//! An [`Easing`] maps progress `t ∈ [0, 1]` to a weight `w ∈ [0, 1]` with
//! `ease(0) = 0` and `ease(1) = 1`. An [`Envelope`] strings three phases
//! together to shape a pulse over its lifetime:
//!
//! ```text
//!  weight
//!   1 |      ___________________
//!     |     /                   \
//!     |    /                     \
//!   0 |___/                       \___
//!        ramp-in     hold      ramp-out
//!       easeIn·D  (rest + H)   easeOut·D
//! ```
//!
//! `D` is the pulse duration and `H` its hold time. The plateau covers the
//! part of the duration not used by either ramp plus the hold time.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Easing curve applied inside a pulse's ramp phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    /// Constant rate.
    Linear,
    /// Sinusoidal, slow start.
    EaseIn,
    /// Sinusoidal, slow finish.
    EaseOut,
    /// Sinusoidal, slow start and finish (default).
    #[default]
    EaseInOut,
    /// `t²`
    QuadIn,
    /// `1 - (1 - t)²`
    QuadOut,
    /// Piecewise quadratic, symmetric around `t = 0.5`.
    QuadInOut,
    /// `t³`
    CubicIn,
    /// `1 - (1 - t)³`
    CubicOut,
    /// Piecewise cubic, symmetric around `t = 0.5`.
    CubicInOut,
}

impl Easing {
    /// Every curve, in declaration order.
    pub const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
    ];

    /// Evaluate the curve. `t` is clamped to `[0, 1]`.
    pub fn ease(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let w = match self {
            Easing::Linear => t,
            Easing::EaseIn => 1.0 - (t * PI * 0.5).cos(),
            Easing::EaseOut => (t * PI * 0.5).sin(),
            Easing::EaseInOut => 0.5 - 0.5 * (t * PI).cos(),
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
        };
        w.clamp(0.0, 1.0)
    }
}

/// Free-function form of [`Easing::ease`].
#[inline]
pub fn ease(easing: Easing, t: f32) -> f32 {
    easing.ease(t)
}

/// Phase of a pulse's envelope at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started yet (negative elapsed time).
    Queued,
    RampingIn,
    Holding,
    RampingOut,
    /// Lifetime is over; the pulse should be removed.
    Expired,
}

/// Three-phase weight envelope of a pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    ramp_in_ms: f32,
    plateau_ms: f32,
    ramp_out_ms: f32,
    easing: Easing,
    sustained: bool,
}

impl Envelope {
    /// Build an envelope for an auto-expiring pulse.
    ///
    /// `ease_in` and `ease_out` are fractions of `duration_ms`. Invalid
    /// fractions are clamped into `[0, 1]` and scaled down together when
    /// their sum exceeds one.
    pub fn impulse(duration_ms: f32, hold_ms: f32, ease_in: f32, ease_out: f32, easing: Easing) -> Self {
        let duration = finite_or(duration_ms, 0.0).max(0.0);
        let hold = finite_or(hold_ms, 0.0).max(0.0);
        let (ease_in, ease_out) = normalize_ramps(ease_in, ease_out);
        let ramp_in_ms = duration * ease_in;
        let ramp_out_ms = duration * ease_out;
        Self {
            ramp_in_ms,
            plateau_ms: duration - ramp_in_ms - ramp_out_ms + hold,
            ramp_out_ms,
            easing,
            sustained: false,
        }
    }

    /// Build an envelope for a continuous pulse: ramp in, then hold forever.
    pub fn sustained(duration_ms: f32, ease_in: f32, easing: Easing) -> Self {
        let duration = finite_or(duration_ms, 0.0).max(0.0);
        let (ease_in, _) = normalize_ramps(ease_in, 0.0);
        Self {
            ramp_in_ms: duration * ease_in,
            plateau_ms: f32::INFINITY,
            ramp_out_ms: 0.0,
            easing,
            sustained: true,
        }
    }

    /// Total lifetime in milliseconds (infinite for sustained envelopes).
    pub fn lifetime_ms(&self) -> f32 {
        if self.sustained {
            f32::INFINITY
        } else {
            self.ramp_in_ms + self.plateau_ms + self.ramp_out_ms
        }
    }

    /// Phase at `elapsed_ms` since the pulse started.
    pub fn phase(&self, elapsed_ms: f32) -> Phase {
        if elapsed_ms < 0.0 {
            return Phase::Queued;
        }
        if elapsed_ms < self.ramp_in_ms {
            return Phase::RampingIn;
        }
        if self.sustained {
            return Phase::Holding;
        }
        let ramp_out_start = self.ramp_in_ms + self.plateau_ms;
        if elapsed_ms < ramp_out_start {
            Phase::Holding
        } else if elapsed_ms < self.lifetime_ms() {
            Phase::RampingOut
        } else {
            Phase::Expired
        }
    }

    /// Instantaneous weight in `[0, 1]`.
    ///
    /// Zero at `elapsed_ms <= 0` and at or after expiry.
    pub fn weight(&self, elapsed_ms: f32) -> f32 {
        if elapsed_ms <= 0.0 {
            return 0.0;
        }
        match self.phase(elapsed_ms) {
            Phase::Queued | Phase::Expired => 0.0,
            Phase::RampingIn => self.easing.ease(elapsed_ms / self.ramp_in_ms),
            Phase::Holding => 1.0,
            Phase::RampingOut => {
                let local = elapsed_ms - self.ramp_in_ms - self.plateau_ms;
                self.easing.ease(1.0 - local / self.ramp_out_ms)
            }
        }
    }

    /// Normalized progress through the lifetime (`0` for sustained envelopes).
    pub fn progress(&self, elapsed_ms: f32) -> f32 {
        let lifetime = self.lifetime_ms();
        if !lifetime.is_finite() || lifetime <= 0.0 {
            return 0.0;
        }
        (elapsed_ms / lifetime).clamp(0.0, 1.0)
    }
}

fn normalize_ramps(ease_in: f32, ease_out: f32) -> (f32, f32) {
    let ease_in = finite_or(ease_in, 0.0).clamp(0.0, 1.0);
    let ease_out = finite_or(ease_out, 0.0).clamp(0.0, 1.0);
    let sum = ease_in + ease_out;
    if sum > 1.0 {
        (ease_in / sum, ease_out / sum)
    } else {
        (ease_in, ease_out)
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curves_hit_endpoints() {
        for easing in Easing::ALL {
            assert!(easing.ease(0.0).abs() < 1e-6, "{easing:?} at 0");
            assert!((easing.ease(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_curves_are_monotonic() {
        for easing in Easing::ALL {
            let mut prev = 0.0;
            for i in 1..=100 {
                let w = easing.ease(i as f32 / 100.0);
                assert!(w + 1e-6 >= prev, "{easing:?} decreases at {i}");
                prev = w;
            }
        }
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        assert_eq!(Easing::CubicIn.ease(-3.0), 0.0);
        assert_eq!(Easing::CubicIn.ease(7.0), 1.0);
        assert_eq!(Easing::Linear.ease(f32::NAN), 0.0);
    }

    #[test]
    fn test_impulse_weight_is_zero_at_both_ends() {
        let env = Envelope::impulse(1000.0, 0.0, 0.2, 0.2, Easing::EaseInOut);
        assert_eq!(env.weight(0.0), 0.0);
        assert_eq!(env.weight(1000.0), 0.0);
        assert_eq!(env.weight(1500.0), 0.0);
        assert_eq!(env.weight(500.0), 1.0);
        assert_eq!(env.phase(1000.0), Phase::Expired);
    }

    #[test]
    fn test_impulse_weight_is_continuous_across_phases() {
        let cases = [(0.2, 0.2, 0.0), (0.5, 0.5, 0.0), (0.1, 0.6, 250.0), (0.0, 0.3, 100.0)];
        for easing in Easing::ALL {
            for &(ease_in, ease_out, hold) in &cases {
                let env = Envelope::impulse(1000.0, hold, ease_in, ease_out, easing);
                let step = 0.25;
                let mut t = step;
                let mut prev = env.weight(t);
                while t < env.lifetime_ms() {
                    t += step;
                    let w = env.weight(t);
                    assert!(
                        (w - prev).abs() < 0.02,
                        "{easing:?} jumps from {prev} to {w} at {t}ms ({ease_in}, {ease_out}, {hold})"
                    );
                    prev = w;
                }
            }
        }
    }

    #[test]
    fn test_hold_extends_the_plateau() {
        let env = Envelope::impulse(1000.0, 500.0, 0.2, 0.2, Easing::Linear);
        assert_eq!(env.lifetime_ms(), 1500.0);
        assert_eq!(env.phase(1200.0), Phase::Holding);
        assert_eq!(env.phase(1400.0), Phase::RampingOut);
        assert!((env.weight(1400.0) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_oversized_ramps_are_rescaled() {
        let env = Envelope::impulse(1000.0, 0.0, 0.9, 0.9, Easing::Linear);
        assert_eq!(env.lifetime_ms(), 1000.0);
        assert!((env.weight(500.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sustained_envelope_never_expires() {
        let env = Envelope::sustained(400.0, 0.5, Easing::Linear);
        assert_eq!(env.weight(0.0), 0.0);
        assert!((env.weight(100.0) - 0.5).abs() < 1e-6);
        assert_eq!(env.weight(1.0e7), 1.0);
        assert_eq!(env.phase(1.0e7), Phase::Holding);
    }
}
