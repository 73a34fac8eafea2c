//! Partial healing.
//!
//! When enabled, a seeded random subset of `fastFraction` of the particles
//! returns home `speedMultiplier` times faster than the rest, so an image
//! reassembles in a staggered way instead of snapping back uniformly.
//!
//! The subset is chosen once per particle set and kept until the particle
//! count or the selection parameters change.

use crate::settings::HealingSettings;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Selection inputs; any change triggers a new draw.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Selection {
    count: usize,
    fast_count: usize,
    seed: u64,
}

/// Tracks which particles heal fast.
#[derive(Clone, Debug, Default)]
pub struct HealingController {
    fast: Vec<bool>,
    selection: Option<Selection>,
    enabled: bool,
    speed_multiplier: f32,
}

impl HealingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the subset in line with `settings` for `count` particles.
    ///
    /// Cheap when nothing changed; call once per tick.
    pub fn sync(&mut self, settings: &HealingSettings, count: usize) {
        self.enabled = settings.enabled;
        self.speed_multiplier = settings.speed_multiplier.max(1.0);
        if !settings.enabled {
            return;
        }
        let fast_count = ((settings.fast_fraction.clamp(0.0, 1.0) * count as f32).round() as usize).min(count);
        let wanted = Selection { count, fast_count, seed: settings.seed };
        if self.selection == Some(wanted) {
            return;
        }

        let mut rng = StdRng::seed_from_u64(settings.seed);
        self.fast.clear();
        self.fast.resize(count, false);
        for index in rand::seq::index::sample(&mut rng, count, fast_count).into_iter() {
            self.fast[index] = true;
        }
        self.selection = Some(wanted);
        log::debug!("healing: {fast_count} of {count} particles heal fast");
    }

    /// Forget the current subset so the next [`sync`](Self::sync) draws again.
    pub fn reset(&mut self) {
        self.selection = None;
        self.fast.clear();
    }

    /// Restoration multiplier for particle `index`.
    #[inline]
    pub fn multiplier(&self, index: usize) -> f32 {
        if self.is_fast(index) {
            self.speed_multiplier
        } else {
            1.0
        }
    }

    pub fn is_fast(&self, index: usize) -> bool {
        self.enabled && self.fast.get(index).copied().unwrap_or(false)
    }

    /// Number of fast particles currently in effect.
    pub fn fast_count(&self) -> usize {
        if self.enabled {
            self.fast.iter().filter(|&&f| f).count()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(fraction: f32) -> HealingSettings {
        HealingSettings { enabled: true, fast_fraction: fraction, ..Default::default() }
    }

    #[test]
    fn test_selects_exact_fraction() {
        let mut healing = HealingController::new();
        healing.sync(&enabled(0.3), 1000);
        assert_eq!(healing.fast_count(), 300);
        let fast: Vec<f32> = (0..1000).map(|i| healing.multiplier(i)).filter(|&m| m > 1.0).collect();
        assert_eq!(fast.len(), 300);
        assert!(fast.iter().all(|&m| m == 2.5));
    }

    #[test]
    fn test_disabled_means_uniform() {
        let mut healing = HealingController::new();
        healing.sync(&enabled(0.5), 100);
        healing.sync(&HealingSettings { enabled: false, ..enabled(0.5) }, 100);
        assert_eq!(healing.fast_count(), 0);
        assert!((0..100).all(|i| healing.multiplier(i) == 1.0));
    }

    #[test]
    fn test_selection_is_stable_and_seeded() {
        let mut a = HealingController::new();
        let mut b = HealingController::new();
        a.sync(&enabled(0.25), 64);
        b.sync(&enabled(0.25), 64);
        let pick = |h: &HealingController| (0..64).filter(|&i| h.is_fast(i)).collect::<Vec<_>>();
        let first = pick(&a);
        assert_eq!(first, pick(&b));

        a.sync(&enabled(0.25), 64);
        assert_eq!(first, pick(&a));
    }

    #[test]
    fn test_count_change_reselects() {
        let mut healing = HealingController::new();
        healing.sync(&enabled(0.5), 10);
        assert_eq!(healing.fast_count(), 5);
        healing.sync(&enabled(0.5), 40);
        assert_eq!(healing.fast_count(), 20);
        assert!(!healing.is_fast(40));
    }

    #[test]
    fn test_speed_multiplier_updates_without_reselecting() {
        let mut healing = HealingController::new();
        healing.sync(&enabled(1.0), 4);
        healing.sync(&HealingSettings { speed_multiplier: 6.0, ..enabled(1.0) }, 4);
        assert_eq!(healing.multiplier(2), 6.0);
    }
}
