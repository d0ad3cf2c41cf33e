use crate::{
    detectors::ppg::{detect_peaks, PeakDetectorConfig},
    error::EstimateError,
    signal::{Peaks, RRSeries},
};
use serde::{Deserialize, Serialize};

/// Plausible heart-rate range; RR bounds are derived as `60 / bpm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartRateConfig {
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for HeartRateConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 150.0,
        }
    }
}

impl HeartRateConfig {
    /// `(shortest, longest)` accepted RR interval in seconds.
    pub fn rr_bounds(&self) -> (f64, f64) {
        (60.0 / self.max_bpm, 60.0 / self.min_bpm)
    }
}

/// Heart rate derived from the RR intervals of one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRate {
    pub bpm: f64,
    pub median_rr_s: f64,
    /// Intervals that survived range filtering
    pub rr: RRSeries,
}

/// Peak detection and heart rate for one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateEstimate {
    pub bpm: f64,
    pub median_rr_s: f64,
    pub rr: RRSeries,
    pub peaks: Peaks,
}

/// Median; even-length inputs average the two central values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    }
}

/// Range-filter RR intervals (seconds) and convert their median to BPM.
pub fn hr_from_intervals(rr: &[f64], cfg: &HeartRateConfig) -> Result<HeartRate, EstimateError> {
    let (rr_min, rr_max) = cfg.rr_bounds();
    let valid: Vec<f64> = rr
        .iter()
        .copied()
        .filter(|x| (rr_min..=rr_max).contains(x))
        .collect();
    let median_rr_s = median(&valid).ok_or(EstimateError::NoPlausibleInterval)?;
    if median_rr_s <= 0.0 {
        return Err(EstimateError::NonPositiveInterval);
    }
    Ok(HeartRate {
        bpm: 60.0 / median_rr_s,
        median_rr_s,
        rr: RRSeries { rr: valid },
    })
}

/// Heart rate from accepted peak positions sampled at `fs`.
pub fn estimate_hr(
    peaks: &Peaks,
    fs: f64,
    cfg: &HeartRateConfig,
) -> Result<HeartRate, EstimateError> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(EstimateError::InvalidSamplingFrequency(fs));
    }
    if peaks.len() < 2 {
        return Err(EstimateError::InsufficientPeaks { found: peaks.len() });
    }
    let rr = RRSeries::from_peaks(peaks, fs);
    hr_from_intervals(&rr.rr, cfg)
}

/// Run peak detection on a filtered window and derive the heart rate.
pub fn compute_hr(
    filtered: &[f64],
    fs: f64,
    detector: &PeakDetectorConfig,
    cfg: &HeartRateConfig,
) -> Result<HeartRateEstimate, EstimateError> {
    let detection = detect_peaks(filtered, fs, detector)?;
    let hr = estimate_hr(&detection.peaks, fs, cfg)?;
    Ok(HeartRateEstimate {
        bpm: hr.bpm,
        median_rr_s: hr.median_rr_s,
        rr: hr.rr,
        peaks: detection.peaks,
    })
}
