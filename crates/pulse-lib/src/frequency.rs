//! Acquisition-frequency measurement from monotonic microsecond ticks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Length of one measurement period in microseconds.
    pub period_us: u64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            period_us: 1_000_000,
        }
    }
}

/// Counts samples per wall-clock period.
///
/// The first tick opens the period; every later tick is one sample interval.
#[derive(Debug, Clone, Default)]
pub struct FrequencyMeter {
    period_us: u64,
    start_us: Option<u64>,
    count: u64,
    current: Option<f64>,
}

impl FrequencyMeter {
    pub fn new(cfg: &FrequencyConfig) -> Self {
        Self {
            period_us: cfg.period_us.max(1),
            ..Self::default()
        }
    }

    /// Register one sample acquired at `now_us`. Returns the new frequency
    /// when a whole period has elapsed.
    pub fn tick(&mut self, now_us: u64) -> Option<f64> {
        let Some(start) = self.start_us else {
            self.start_us = Some(now_us);
            return None;
        };
        self.count += 1;
        let elapsed = now_us.saturating_sub(start);
        if elapsed + 1 < self.period_us {
            return None;
        }
        let hz = self.count as f64 * 1e6 / elapsed as f64;
        self.start_us = Some(now_us);
        self.count = 0;
        self.current = Some(hz);
        Some(hz)
    }

    /// Most recent measurement, if a period has completed.
    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_regular_ticks() {
        let mut meter = FrequencyMeter::new(&FrequencyConfig::default());
        let mut readings = Vec::new();
        for k in 0..=150u64 {
            if let Some(hz) = meter.tick(k * 20_000) {
                readings.push((k, hz));
            }
        }
        assert_eq!(readings, vec![(50, 50.0), (100, 50.0), (150, 50.0)]);
        assert_eq!(meter.current(), Some(50.0));
    }

    #[test]
    fn accounts_for_overshoot() {
        let mut meter = FrequencyMeter::new(&FrequencyConfig::default());
        meter.tick(0);
        let mut reading = None;
        let mut t = 0;
        while reading.is_none() {
            t += 30_000;
            reading = meter.tick(t);
        }
        // 34 intervals of 30 ms end at 1.02 s
        assert_eq!(t, 1_020_000);
        let hz = reading.unwrap();
        assert!((hz - 34.0 / 1.02).abs() < 1e-9);
    }

    #[test]
    fn nothing_before_first_period() {
        let mut meter = FrequencyMeter::new(&FrequencyConfig::default());
        for k in 0..10u64 {
            assert_eq!(meter.tick(k * 10_000), None);
        }
        assert_eq!(meter.current(), None);
    }
}
