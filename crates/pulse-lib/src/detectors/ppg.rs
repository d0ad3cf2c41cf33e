use crate::{
    error::EstimateError,
    signal::{Peak, Peaks},
};
use serde::{Deserialize, Serialize};

/// What to do with a candidate that lands inside the refractory period of
/// the previously accepted peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefractoryPolicy {
    /// Drop the candidate.
    Reject,
    /// Replace the previous peak when the candidate is strictly larger.
    #[default]
    ReplaceIfLarger,
}

/// Configurable parameters for pulse peak detection on one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    /// Windows shorter than this are not analysed.
    pub min_samples: usize,
    /// Minimum peak-to-peak amplitude of the centered window.
    pub min_peak_to_peak: f64,
    /// Threshold as a fraction of the (clamped) maximum absolute amplitude.
    pub threshold_fraction: f64,
    /// Amplitude ceiling applied before scaling the threshold; `None` disables it.
    pub saturation_ceiling: Option<f64>,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Half-width of the local arbitration window (seconds).
    pub arbitration_s: f64,
    pub refractory_policy: RefractoryPolicy,
    /// Parabolic sub-sample refinement of accepted peaks.
    pub refine: bool,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            min_peak_to_peak: 1.0,
            threshold_fraction: 0.3,
            saturation_ceiling: Some(2000.0),
            min_rr_s: 0.35,
            arbitration_s: 0.05,
            refractory_policy: RefractoryPolicy::ReplaceIfLarger,
            refine: true,
        }
    }
}

/// Peaks of one window together with the intermediate values used to find them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakDetection {
    /// Mean-removed input
    pub centered: Vec<f64>,
    pub threshold: f64,
    pub peaks: Peaks,
}

/// Find pulse peaks in a filtered window sampled at `fs`.
pub fn detect_peaks(
    filtered: &[f64],
    fs: f64,
    cfg: &PeakDetectorConfig,
) -> Result<PeakDetection, EstimateError> {
    let n = filtered.len();
    if n < cfg.min_samples {
        return Err(EstimateError::InsufficientSamples {
            needed: cfg.min_samples,
            got: n,
        });
    }
    if !fs.is_finite() || fs <= 0.0 {
        return Err(EstimateError::InvalidSamplingFrequency(fs));
    }

    let centered = mean_center(filtered);
    let max_c = centered.iter().copied().fold(f64::MIN, f64::max);
    let min_c = centered.iter().copied().fold(f64::MAX, f64::min);
    let max_abs = centered.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if max_c - min_c < cfg.min_peak_to_peak || max_abs == 0.0 {
        return Err(EstimateError::InsufficientSignal);
    }

    let clamped = match cfg.saturation_ceiling {
        Some(ceiling) => max_abs.min(ceiling),
        None => max_abs,
    };
    let threshold = cfg.threshold_fraction * clamped;
    let refractory = samples_for(cfg.min_rr_s, fs);
    let half_window = samples_for(cfg.arbitration_s, fs);

    let indices = pick_peaks(
        &centered,
        threshold,
        refractory,
        half_window,
        cfg.refractory_policy,
    );
    if indices.len() < 2 {
        return Err(EstimateError::InsufficientPeaks {
            found: indices.len(),
        });
    }

    let peaks = indices
        .into_iter()
        .map(|index| Peak {
            index,
            position: if cfg.refine {
                refine_peak(&centered, index)
            } else {
                index as f64
            },
            amplitude: centered[index],
        })
        .collect();

    Ok(PeakDetection {
        centered,
        threshold,
        peaks: Peaks { peaks },
    })
}

/// Subtract the arithmetic mean.
pub fn mean_center(data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().map(|x| x - mean).collect()
}

/// Fractional peak location from a parabola through `idx` and its neighbours.
pub fn refine_peak(data: &[f64], idx: usize) -> f64 {
    if idx == 0 || idx + 1 >= data.len() {
        return idx as f64;
    }
    let alpha = data[idx - 1];
    let beta = data[idx];
    let gamma = data[idx + 1];
    let denominator = alpha - 2.0 * beta + gamma;
    if denominator == 0.0 {
        return idx as f64;
    }
    idx as f64 + 0.5 * (alpha - gamma) / denominator
}

fn samples_for(seconds: f64, fs: f64) -> usize {
    ((seconds * fs) as usize).max(1)
}

fn pick_peaks(
    centered: &[f64],
    threshold: f64,
    refractory: usize,
    half_window: usize,
    policy: RefractoryPolicy,
) -> Vec<usize> {
    let n = centered.len();
    let mut peaks: Vec<usize> = Vec::new();
    if n < 3 {
        return peaks;
    }

    for i in 1..n - 1 {
        let sample = centered[i];
        if sample < threshold {
            continue;
        }
        if !(sample >= centered[i - 1] && sample >= centered[i + 1]) {
            continue;
        }

        // Window winner: nothing in the neighbourhood may be strictly larger,
        // so among equal values the earliest one is kept.
        let left = i.saturating_sub(half_window);
        let right = (i + half_window).min(n - 1);
        if centered[left..=right].iter().any(|&v| v > sample) {
            continue;
        }

        if let Some(last) = peaks.last_mut() {
            if i - *last < refractory {
                if policy == RefractoryPolicy::ReplaceIfLarger && sample > centered[*last] {
                    *last = i;
                }
                continue;
            }
        }
        peaks.push(i);
    }
    peaks
}
