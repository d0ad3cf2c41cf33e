//! Streaming first-order high-pass + low-pass cascade.
//!
//! One instance runs per optical channel. Filter memory survives window
//! boundaries and is only cleared by [`BandpassFilter::reset`] or a
//! reconfiguration.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How the high-pass stage combines the input difference with its memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighPassForm {
    /// `hp = hp_prev + alpha_hp * (x - x_prev)`, the recurrence the sensor
    /// firmware runs. It tracks the input scaled by `alpha_hp`.
    #[default]
    Incremental,
    /// Classic RC high-pass `hp = (1 - alpha_hp) * (hp_prev + x - x_prev)`,
    /// which decays the baseline towards zero.
    Leaky,
}

/// Cutoffs for the two stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassConfig {
    /// High-pass (baseline removal) cutoff in Hz.
    pub high_pass_hz: f64,
    /// Low-pass (noise smoothing) cutoff in Hz.
    pub low_pass_hz: f64,
    pub high_pass_form: HighPassForm,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            high_pass_hz: 0.5,
            low_pass_hz: 8.0,
            high_pass_form: HighPassForm::Incremental,
        }
    }
}

/// Smoothing coefficient of a first-order RC stage: `dt / (RC + dt)`.
pub fn rc_alpha(fs: f64, cutoff_hz: f64) -> f64 {
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    dt / (rc + dt)
}

#[derive(Debug, Clone)]
pub struct BandpassFilter {
    form: HighPassForm,
    alpha_hp: f64,
    alpha_lp: f64,
    x_prev: f64,
    hp_prev: f64,
    lp_prev: f64,
}

impl BandpassFilter {
    pub fn new(fs: f64, cfg: &BandpassConfig) -> Self {
        let mut filter = Self {
            form: cfg.high_pass_form,
            alpha_hp: 0.0,
            alpha_lp: 0.0,
            x_prev: 0.0,
            hp_prev: 0.0,
            lp_prev: 0.0,
        };
        filter.configure(fs, cfg.high_pass_hz, cfg.low_pass_hz);
        filter
    }

    /// Derive both coefficients for a new sampling frequency.
    ///
    /// Memory computed under the old coefficients is discarded.
    pub fn configure(&mut self, fs: f64, high_pass_hz: f64, low_pass_hz: f64) {
        self.alpha_hp = rc_alpha(fs, high_pass_hz);
        self.alpha_lp = rc_alpha(fs, low_pass_hz);
        self.reset();
    }

    /// Zero all memory, keeping the coefficients.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.hp_prev = 0.0;
        self.lp_prev = 0.0;
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let hp = match self.form {
            HighPassForm::Incremental => self.hp_prev + self.alpha_hp * (x - self.x_prev),
            HighPassForm::Leaky => (1.0 - self.alpha_hp) * (self.hp_prev + x - self.x_prev),
        };
        let lp = self.lp_prev + self.alpha_lp * (hp - self.lp_prev);
        self.x_prev = x;
        self.hp_prev = hp;
        self.lp_prev = lp;
        lp
    }

    /// Run a whole sequence through the filter, continuing from the current memory.
    pub fn filter(&mut self, data: &[f64]) -> Vec<f64> {
        data.iter().map(|&x| self.step(x)).collect()
    }

    /// `(alpha_hp, alpha_lp)`
    pub fn alphas(&self) -> (f64, f64) {
        (self.alpha_hp, self.alpha_lp)
    }
}

/// Per-channel filter that passes samples through until the acquisition
/// frequency is known.
#[derive(Debug, Clone, Default)]
pub enum ChannelFilter {
    #[default]
    Uncalibrated,
    Calibrated(BandpassFilter),
}

impl ChannelFilter {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, ChannelFilter::Calibrated(_))
    }

    /// Switch to filtering at `fs`. Calling this again re-derives the
    /// coefficients, which also clears the memory.
    pub fn calibrate(&mut self, fs: f64, cfg: &BandpassConfig) {
        match self {
            ChannelFilter::Calibrated(filter) => {
                filter.configure(fs, cfg.high_pass_hz, cfg.low_pass_hz)
            }
            ChannelFilter::Uncalibrated => {
                *self = ChannelFilter::Calibrated(BandpassFilter::new(fs, cfg))
            }
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        match self {
            ChannelFilter::Uncalibrated => x,
            ChannelFilter::Calibrated(filter) => filter.step(x),
        }
    }
}
