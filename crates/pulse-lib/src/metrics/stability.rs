//! Cross-window debounce for the per-window HR and SpO2 estimates.
//!
//! The estimators are stateless and may fail on any single window. The
//! tracker bridges short gaps with the last accepted value and reports
//! "unknown" (`None`) once the gap, or a suspiciously unchanged reading,
//! lasts too long. Downstream displays rely on `None` to blank the value.

use crate::metrics::hr::HeartRateEstimate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Consecutive failed windows after which HR becomes unknown.
    pub max_misses: u32,
    /// Consecutive identical estimates after which HR is treated as frozen.
    pub max_repeats: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            max_misses: 3,
            max_repeats: 3,
        }
    }
}

/// State carried from one window to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrState {
    pub last_hr: Option<f64>,
    /// Shared miss / repeat counter; cleared whenever a new HR is accepted.
    pub stale: u32,
    pub last_spo2: Option<f64>,
}

/// HR value to report for one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrReport {
    #[serde(rename = "value")]
    pub bpm: Option<f64>,
    pub peaks_index: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    cfg: StabilityConfig,
    state: HrState,
}

impl StabilityTracker {
    pub fn new(cfg: StabilityConfig) -> Self {
        Self {
            cfg,
            state: HrState::default(),
        }
    }

    pub fn state(&self) -> &HrState {
        &self.state
    }

    /// Fold this window's HR outcome into the state and decide what to report.
    pub fn update_hr(&mut self, estimate: Option<&HeartRateEstimate>) -> HrReport {
        let state = &mut self.state;
        let Some(estimate) = estimate else {
            state.stale = state.stale.saturating_add(1);
            let bpm = if state.stale >= self.cfg.max_misses {
                None
            } else {
                state.last_hr
            };
            return HrReport {
                bpm,
                peaks_index: Vec::new(),
            };
        };

        if state.last_hr == Some(estimate.bpm) {
            state.stale = state.stale.saturating_add(1);
            if state.stale >= self.cfg.max_repeats {
                debug!(
                    "HR stuck at {:.1} BPM for {} windows, reporting unknown",
                    estimate.bpm, state.stale
                );
                return HrReport::default();
            }
        } else {
            state.last_hr = Some(estimate.bpm);
            state.stale = 0;
        }
        HrReport {
            bpm: Some(estimate.bpm),
            peaks_index: estimate.peaks.indices(),
        }
    }

    /// Accept a fresh SpO2 value, or fall back to the last accepted one.
    pub fn update_spo2(&mut self, estimate: Option<f64>) -> Option<f64> {
        if let Some(value) = estimate {
            self.state.last_spo2 = Some(value);
        }
        self.state.last_spo2
    }
}
