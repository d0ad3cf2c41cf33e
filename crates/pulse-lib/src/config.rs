//! Pipeline configuration loaded from TOML.
//!
//! Every section is optional; omitted keys take the defaults of the module
//! that owns them. A disabled saturation ceiling is written as
//! `saturation_ceiling = inf`.

use crate::{
    detectors::ppg::PeakDetectorConfig,
    filters::bandpass::BandpassConfig,
    frequency::FrequencyConfig,
    metrics::{hr::HeartRateConfig, spo2::Spo2Config, stability::StabilityConfig},
    pipeline::CalibrationConfig,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Samples per channel in one analysis window.
    pub window_size: usize,
    pub filter: BandpassConfig,
    pub calibration: CalibrationConfig,
    pub frequency: FrequencyConfig,
    pub detector: PeakDetectorConfig,
    pub heart_rate: HeartRateConfig,
    pub stability: StabilityConfig,
    pub spo2: Spo2Config,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            filter: BandpassConfig::default(),
            calibration: CalibrationConfig::default(),
            frequency: FrequencyConfig::default(),
            detector: PeakDetectorConfig::default(),
            heart_rate: HeartRateConfig::default(),
            stability: StabilityConfig::default(),
            spo2: Spo2Config::default(),
        }
    }
}

impl PulseConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: PulseConfig = toml::from_str(text).context("parsing pulse configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("serializing pulse configuration")
    }

    /// Reject settings that would make every window fail.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            anyhow::bail!("window_size must be positive");
        }
        let filter = &self.filter;
        if !(filter.high_pass_hz > 0.0 && filter.low_pass_hz > filter.high_pass_hz) {
            anyhow::bail!(
                "filter cutoffs must satisfy 0 < high_pass_hz < low_pass_hz (got {} / {})",
                filter.high_pass_hz,
                filter.low_pass_hz
            );
        }
        let hr = &self.heart_rate;
        if !(hr.min_bpm > 0.0 && hr.max_bpm > hr.min_bpm) {
            anyhow::bail!(
                "heart rate bounds must satisfy 0 < min_bpm < max_bpm (got {} / {})",
                hr.min_bpm,
                hr.max_bpm
            );
        }
        let cal = &self.calibration;
        if cal.min_fs_hz > cal.max_fs_hz {
            anyhow::bail!(
                "calibration range is empty ({} > {} Hz)",
                cal.min_fs_hz,
                cal.max_fs_hz
            );
        }
        Ok(())
    }
}
