//! Clock and timing utilities for the tracking loop.
//!
//! Frames are stamped with monotonic nanoseconds relative to an epoch
//! recorded when the loop starts. The blink cooldown, replay pacing, and
//! progress logging all work in that time base.

use std::time::{Duration, Instant};

/// A monotonic clock anchored to the moment tracking started.
#[derive(Debug, Clone)]
pub struct LoopClock {
    /// The instant tracking started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl LoopClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// How long to wait until `target_ns` is reached, if it is still ahead.
    pub fn until(&self, target_ns: u64) -> Option<Duration> {
        let now = self.elapsed_ns();
        (target_ns > now).then(|| Duration::from_nanos(target_ns - now))
    }

    /// Convert a nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert milliseconds to nanoseconds.
    pub fn ms_to_ns(ms: u64) -> u64 {
        ms.saturating_mul(1_000_000)
    }
}

/// How far behind schedule a replayed frame was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingLag {
    /// Trace timestamp the frame was due at (ns).
    pub scheduled_ns: u64,
    /// Clock time the frame was actually delivered at (ns).
    pub delivered_ns: u64,
}

impl PacingLag {
    /// Lag in nanoseconds; zero when delivered early.
    pub fn lag_ns(&self) -> u64 {
        self.delivered_ns.saturating_sub(self.scheduled_ns)
    }

    pub fn lag_ms(&self) -> f64 {
        self.lag_ns() as f64 / 1_000_000.0
    }

    /// Whether the frame was late by more than `limit_ms`.
    pub fn is_late(&self, limit_ms: f64) -> bool {
        self.lag_ms() > limit_ms
    }
}

/// Fixed-interval gate, used to throttle periodic work such as progress logs.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self::with_interval_ns(1_000_000_000 / target_hz.max(1) as u64)
    }

    /// Create a controller with an explicit interval.
    pub fn with_interval_ns(interval_ns: u64) -> Self {
        Self {
            target_interval_ns: interval_ns,
            last_tick_ns: None,
        }
    }

    /// Returns true and records the tick if the interval has elapsed.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last.saturating_add(self.target_interval_ns) => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = LoopClock::start();
        assert!(clock.elapsed_ns() < 1_000_000_000);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_until_past_target_is_none() {
        let clock = LoopClock::start();
        assert!(clock.until(0).is_none());
        assert!(clock.until(60_000_000_000).is_some());
    }

    #[test]
    fn test_unit_conversions() {
        assert!((LoopClock::ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(LoopClock::ms_to_ns(1000), 1_000_000_000);
    }

    #[test]
    fn test_pacing_lag() {
        let lag = PacingLag {
            scheduled_ns: 1_000_000_000,
            delivered_ns: 1_050_000_000,
        };
        assert_eq!(lag.lag_ns(), 50_000_000);
        assert!(lag.is_late(10.0));
        assert!(!lag.is_late(100.0));

        let early = PacingLag {
            scheduled_ns: 2_000,
            delivered_ns: 1_000,
        };
        assert_eq!(early.lag_ns(), 0);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0));
        assert!(!ctrl.should_tick(1_000_000));
        assert!(ctrl.should_tick(17_000_000));
    }

    #[test]
    fn test_rate_controller_explicit_interval() {
        let mut ctrl = RateController::with_interval_ns(5_000_000_000);
        assert!(ctrl.should_tick(100));
        assert!(!ctrl.should_tick(4_000_000_000));
        assert!(ctrl.should_tick(5_000_000_100));
        assert_eq!(ctrl.interval_ns(), 5_000_000_000);
    }
}
