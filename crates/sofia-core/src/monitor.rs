//! Adaptive performance monitor.
//!
//! Watches publishing statistics of a live session and maintains a single
//! "degrade" signal. The signal is a periodically recomputed value: the
//! runtime samples statistics on an interval and feeds them in, and the
//! transport may also report CPU pressure directly.
//!
//! # Invariants
//!
//! - A failed sample never changes the signal
//! - The signal flips to degraded only after `constrained_samples`
//!   consecutive constrained samples (or an explicit CPU-constrained report)
//! - Without `recovery_samples`, degraded is sticky for the session

use std::time::{Duration, Instant};

/// Encoder throughput below this fraction of the target counts as
/// constrained.
const FRAMERATE_CONSTRAINED_RATIO: f64 = 0.5;

/// Why the encoder is limiting quality, as reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityLimitation {
    /// No limitation.
    #[default]
    None,
    /// Encoder is CPU bound.
    Cpu,
    /// Encoder is bandwidth bound.
    Bandwidth,
    /// Any other reason.
    Other,
}

/// One sample of local publishing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PublishStats {
    /// Reported quality limitation of the camera encoder.
    pub quality_limitation: QualityLimitation,
    /// Frames encoded per second, if known.
    pub encoded_fps: Option<f64>,
    /// Frame rate the encoder was configured for, if known.
    pub target_fps: Option<f64>,
}

impl PublishStats {
    /// Whether this sample indicates a lack of local headroom.
    pub fn is_constrained(&self) -> bool {
        if self.quality_limitation == QualityLimitation::Cpu {
            return true;
        }

        match (self.encoded_fps, self.target_fps) {
            (Some(encoded), Some(target)) if target > 0.0 => {
                encoded < target * FRAMERATE_CONSTRAINED_RATIO
            },
            _ => false,
        }
    }
}

/// Monitor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How often the runtime samples statistics.
    pub poll_interval: Duration,
    /// Consecutive constrained samples before degrading.
    pub constrained_samples: u32,
    /// Consecutive healthy samples before recovering. `None` keeps the
    /// degraded signal for the rest of the session.
    pub recovery_samples: Option<u32>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(2), constrained_samples: 3, recovery_samples: None }
    }
}

/// Degrade signal derived from publishing statistics.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    config: MonitorConfig,
    degraded: bool,
    constrained_streak: u32,
    healthy_streak: u32,
    last_sample_at: Option<Instant>,
}

impl PerformanceMonitor {
    /// Create a monitor in the non-degraded state.
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, degraded: false, constrained_streak: 0, healthy_streak: 0, last_sample_at: None }
    }

    /// Current degrade signal.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// When the last successful sample was taken.
    pub fn last_sample_at(&self) -> Option<Instant> {
        self.last_sample_at
    }

    /// Feed one statistics sample.
    ///
    /// Returns `true` if the degrade signal changed.
    pub fn observe(&mut self, sample: Option<&PublishStats>, now: Instant) -> bool {
        let Some(stats) = sample else {
            return false;
        };
        self.last_sample_at = Some(now);

        if stats.is_constrained() {
            self.healthy_streak = 0;
            self.constrained_streak = self.constrained_streak.saturating_add(1);
            if !self.degraded && self.constrained_streak >= self.config.constrained_samples {
                self.degraded = true;
                return true;
            }
        } else {
            self.constrained_streak = 0;
            self.healthy_streak = self.healthy_streak.saturating_add(1);
            if let Some(recovery) = self.config.recovery_samples {
                if self.degraded && self.healthy_streak >= recovery {
                    self.degraded = false;
                    return true;
                }
            }
        }

        false
    }

    /// The transport reported that the local encoder is CPU constrained.
    ///
    /// Returns `true` if the degrade signal changed.
    pub fn report_cpu_constrained(&mut self) -> bool {
        self.healthy_streak = 0;
        if self.degraded {
            return false;
        }
        self.degraded = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const CPU: PublishStats =
        PublishStats { quality_limitation: QualityLimitation::Cpu, encoded_fps: None, target_fps: None };
    const HEALTHY: PublishStats = PublishStats {
        quality_limitation: QualityLimitation::None,
        encoded_fps: Some(30.0),
        target_fps: Some(30.0),
    };

    #[test]
    fn degrades_after_streak() {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        let now = Instant::now();

        assert!(!monitor.observe(Some(&CPU), now));
        assert!(!monitor.observe(Some(&CPU), now));
        assert!(monitor.observe(Some(&CPU), now));
        assert!(monitor.degraded());
    }

    #[test]
    fn healthy_sample_resets_streak() {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        let now = Instant::now();

        monitor.observe(Some(&CPU), now);
        monitor.observe(Some(&CPU), now);
        monitor.observe(Some(&HEALTHY), now);
        monitor.observe(Some(&CPU), now);

        assert!(!monitor.degraded());
    }

    #[test]
    fn low_framerate_counts_as_constrained() {
        let stats = PublishStats {
            quality_limitation: QualityLimitation::None,
            encoded_fps: Some(9.0),
            target_fps: Some(30.0),
        };
        assert!(stats.is_constrained());
    }

    #[test]
    fn bandwidth_limitation_is_not_local_pressure() {
        let stats = PublishStats { quality_limitation: QualityLimitation::Bandwidth, ..HEALTHY };
        assert!(!stats.is_constrained());
    }

    #[test]
    fn degraded_is_sticky_by_default() {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        let now = Instant::now();

        assert!(monitor.report_cpu_constrained());
        for _ in 0..50 {
            assert!(!monitor.observe(Some(&HEALTHY), now));
        }
        assert!(monitor.degraded());
    }

    #[test]
    fn recovery_when_configured() {
        let config = MonitorConfig { recovery_samples: Some(2), ..MonitorConfig::default() };
        let mut monitor = PerformanceMonitor::new(config);
        let now = Instant::now();

        monitor.report_cpu_constrained();
        assert!(!monitor.observe(Some(&HEALTHY), now));
        assert!(monitor.observe(Some(&HEALTHY), now));
        assert!(!monitor.degraded());
    }

    #[test]
    fn cpu_report_when_already_degraded_is_not_a_change() {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        assert!(monitor.report_cpu_constrained());
        assert!(!monitor.report_cpu_constrained());
    }

    proptest! {
        #[test]
        fn failed_samples_never_flip_the_signal(
            pattern in prop::collection::vec(any::<Option<bool>>(), 0..64),
        ) {
            let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
            let now = Instant::now();

            for entry in pattern {
                let before = monitor.degraded();
                match entry {
                    None => {
                        prop_assert!(!monitor.observe(None, now));
                        prop_assert_eq!(monitor.degraded(), before);
                    },
                    Some(true) => { monitor.observe(Some(&CPU), now); },
                    Some(false) => { monitor.observe(Some(&HEALTHY), now); },
                }
            }
        }
    }
}
