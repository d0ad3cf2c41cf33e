//! Ratio-of-ratios SpO2 estimation for one window.

use crate::{error::EstimateError, window::Window};
use serde::{Deserialize, Serialize};

/// Empirical mapping from the ratio-of-ratios `R` to a raw SpO2 percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CalibrationCurve {
    /// `intercept - slope * R`
    Linear { intercept: f64, slope: f64 },
    /// `a * R^2 + b * R + c`
    Quadratic { a: f64, b: f64, c: f64 },
}

impl CalibrationCurve {
    pub const fn maxim_linear() -> Self {
        CalibrationCurve::Linear {
            intercept: 104.0,
            slope: 17.0,
        }
    }

    pub const fn quadratic_default() -> Self {
        CalibrationCurve::Quadratic {
            a: -45.060,
            b: 30.354,
            c: 94.845,
        }
    }

    pub fn apply(&self, r: f64) -> f64 {
        match *self {
            CalibrationCurve::Linear { intercept, slope } => intercept - slope * r,
            CalibrationCurve::Quadratic { a, b, c } => a * r * r + b * r + c,
        }
    }
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        Self::maxim_linear()
    }
}

/// Where the AC amplitude of a channel comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcMethod {
    /// RMS of the band-pass output.
    #[default]
    FilteredRms,
    /// RMS of the raw samples after subtracting their mean.
    CenteredRawRms,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spo2Config {
    pub min_samples: usize,
    /// Multiplier applied to the curve output before clamping.
    pub calibration_gain: f64,
    pub ac_method: AcMethod,
    /// Reject windows whose AC amplitude exceeds the DC level.
    pub reject_ac_above_dc: bool,
    pub curve: CalibrationCurve,
}

impl Default for Spo2Config {
    fn default() -> Self {
        Self {
            min_samples: 40,
            calibration_gain: 1.44,
            ac_method: AcMethod::FilteredRms,
            reject_ac_above_dc: true,
            curve: CalibrationCurve::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spo2Estimate {
    /// Saturation in percent, clamped to [0, 100]
    pub spo2: f64,
    /// Ratio-of-ratios
    pub r: f64,
    pub dc_ir: f64,
    pub dc_red: f64,
    pub ac_ir: f64,
    pub ac_red: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

fn centered_rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len() - n..]
}

/// SpO2 from the raw and filtered sequences of both channels.
///
/// Sequences of different lengths are truncated to their most recent common
/// length.
pub fn estimate_spo2(
    raw_ir: &[f64],
    raw_red: &[f64],
    filtered_ir: &[f64],
    filtered_red: &[f64],
    cfg: &Spo2Config,
) -> Result<Spo2Estimate, EstimateError> {
    let n = raw_ir
        .len()
        .min(raw_red.len())
        .min(filtered_ir.len())
        .min(filtered_red.len());
    if n < cfg.min_samples {
        return Err(EstimateError::InsufficientSamples {
            needed: cfg.min_samples,
            got: n,
        });
    }
    let raw_ir = tail(raw_ir, n);
    let raw_red = tail(raw_red, n);
    let filtered_ir = tail(filtered_ir, n);
    let filtered_red = tail(filtered_red, n);

    let dc_ir = mean(raw_ir);
    let dc_red = mean(raw_red);
    if dc_ir == 0.0 || dc_red == 0.0 {
        return Err(EstimateError::ZeroDcComponent);
    }
    // a constant raw channel carries no pulsation, whatever the filter made of it
    if centered_rms(raw_ir) == 0.0 || centered_rms(raw_red) == 0.0 {
        return Err(EstimateError::InsufficientSignal);
    }

    let (ac_ir, ac_red) = match cfg.ac_method {
        AcMethod::FilteredRms => (rms(filtered_ir), rms(filtered_red)),
        AcMethod::CenteredRawRms => (centered_rms(raw_ir), centered_rms(raw_red)),
    };
    if ac_ir == 0.0 && ac_red == 0.0 {
        return Err(EstimateError::InsufficientSignal);
    }
    if cfg.reject_ac_above_dc && (ac_ir > dc_ir.abs() || ac_red > dc_red.abs()) {
        return Err(EstimateError::ExcessiveModulation);
    }

    let ratio_red = ac_red / dc_red;
    let ratio_ir = ac_ir / dc_ir;
    if ratio_ir == 0.0 {
        return Err(EstimateError::ZeroIrModulation);
    }
    if ac_red == 0.0 {
        return Err(EstimateError::InsufficientSignal);
    }

    let r = ratio_red / ratio_ir;
    let spo2 = (cfg.curve.apply(r) * cfg.calibration_gain).clamp(0.0, 100.0);
    Ok(Spo2Estimate {
        spo2,
        r,
        dc_ir,
        dc_red,
        ac_ir,
        ac_red,
    })
}

/// SpO2 for a completed window.
pub fn estimate_window_spo2(
    window: &Window,
    cfg: &Spo2Config,
) -> Result<Spo2Estimate, EstimateError> {
    estimate_spo2(
        &window.ir.raw,
        &window.red.raw,
        &window.ir.filtered,
        &window.red.filtered,
        cfg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::bandpass::{BandpassConfig, BandpassFilter};

    fn alternating(n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    fn around(level: f64, n: usize, amplitude: f64) -> Vec<f64> {
        alternating(n, amplitude).iter().map(|v| v + level).collect()
    }

    fn unit_ratio_window(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            around(1000.0, n, 10.0),
            around(500.0, n, 5.0),
            alternating(n, 10.0),
            alternating(n, 5.0),
        )
    }

    #[test]
    fn unit_ratio_maps_to_curve_value() {
        let (raw_ir, raw_red, ir, red) = unit_ratio_window(50);
        let cfg = Spo2Config {
            calibration_gain: 1.0,
            ..Spo2Config::default()
        };
        let est = estimate_spo2(&raw_ir, &raw_red, &ir, &red, &cfg).unwrap();
        assert_eq!(est.r, 1.0);
        assert_eq!(est.spo2, 87.0);

        let cfg = Spo2Config {
            curve: CalibrationCurve::quadratic_default(),
            calibration_gain: 1.0,
            ..Spo2Config::default()
        };
        let est = estimate_spo2(&raw_ir, &raw_red, &ir, &red, &cfg).unwrap();
        assert_eq!(est.spo2, CalibrationCurve::quadratic_default().apply(1.0));
    }

    #[test]
    fn default_gain_clamps_to_hundred() {
        let (raw_ir, raw_red, ir, red) = unit_ratio_window(40);
        let est = estimate_spo2(&raw_ir, &raw_red, &ir, &red, &Spo2Config::default()).unwrap();
        assert_eq!(est.spo2, 100.0);
    }

    #[test]
    fn large_ratio_clamps_to_zero() {
        let n = 40;
        let est = estimate_spo2(
            &around(1000.0, n, 1.0),
            &around(1000.0, n, 10.0),
            &alternating(n, 1.0),
            &alternating(n, 10.0),
            &Spo2Config::default(),
        )
        .unwrap();
        assert_eq!(est.r, 10.0);
        assert_eq!(est.spo2, 0.0);
    }

    #[test]
    fn short_window_is_rejected() {
        let (raw_ir, raw_red, ir, red) = unit_ratio_window(50);
        let err = estimate_spo2(&raw_ir, &raw_red[..39], &ir, &red, &Spo2Config::default())
            .unwrap_err();
        assert_eq!(err, EstimateError::InsufficientSamples { needed: 40, got: 39 });
    }

    #[test]
    fn zero_dc_is_rejected() {
        let (raw_ir, _, ir, red) = unit_ratio_window(40);
        let err = estimate_spo2(&raw_ir, &vec![0.0; 40], &ir, &red, &Spo2Config::default())
            .unwrap_err();
        assert_eq!(err, EstimateError::ZeroDcComponent);
    }

    #[test]
    fn flat_window_is_insufficient_signal() {
        let n = 60;
        let err = estimate_spo2(
            &vec![1000.0; n],
            &vec![800.0; n],
            &vec![0.0; n],
            &vec![0.0; n],
            &Spo2Config::default(),
        )
        .unwrap_err();
        assert_eq!(err, EstimateError::InsufficientSignal);
    }

    #[test]
    fn flat_input_through_the_filter_is_insufficient_signal() {
        let raw_ir = vec![50_000.0; 100];
        let raw_red = vec![30_000.0; 100];
        let cfg = BandpassConfig::default();
        let ir = BandpassFilter::new(50.0, &cfg).filter(&raw_ir);
        let red = BandpassFilter::new(50.0, &cfg).filter(&raw_red);
        // the incremental high-pass keeps a scaled baseline, so the
        // filtered sequences are not zero
        assert!(rms(&ir) > 0.0 && rms(&red) > 0.0);
        let err = estimate_spo2(&raw_ir, &raw_red, &ir, &red, &Spo2Config::default()).unwrap_err();
        assert_eq!(err, EstimateError::InsufficientSignal);

        let mut modulated_ir = raw_ir.clone();
        modulated_ir[50] += 100.0;
        let err = estimate_spo2(&modulated_ir, &raw_red, &ir, &red, &Spo2Config::default())
            .unwrap_err();
        assert_eq!(err, EstimateError::InsufficientSignal);
    }

    #[test]
    fn zero_ir_modulation_is_rejected() {
        let (raw_ir, raw_red, _, red) = unit_ratio_window(40);
        let err = estimate_spo2(&raw_ir, &raw_red, &vec![0.0; 40], &red, &Spo2Config::default())
            .unwrap_err();
        assert_eq!(err, EstimateError::ZeroIrModulation);
    }

    #[test]
    fn ac_above_dc_is_rejected_unless_disabled() {
        let n = 40;
        let raw = around(10.0, n, 0.5);
        let ir = alternating(n, 20.0);
        let red = alternating(n, 20.0);
        let err = estimate_spo2(&raw, &raw, &ir, &red, &Spo2Config::default()).unwrap_err();
        assert_eq!(err, EstimateError::ExcessiveModulation);

        let cfg = Spo2Config {
            reject_ac_above_dc: false,
            ..Spo2Config::default()
        };
        assert!(estimate_spo2(&raw, &raw, &ir, &red, &cfg).is_ok());
    }

    #[test]
    fn centered_raw_method_ignores_filtered_input() {
        let n = 40;
        let raw_ir = around(1000.0, n, 10.0);
        let raw_red = around(500.0, n, 5.0);
        let cfg = Spo2Config {
            ac_method: AcMethod::CenteredRawRms,
            calibration_gain: 1.0,
            ..Spo2Config::default()
        };
        let est = estimate_spo2(&raw_ir, &raw_red, &vec![0.0; n], &vec![0.0; n], &cfg).unwrap();
        assert_eq!(est.ac_ir, 10.0);
        assert_eq!(est.ac_red, 5.0);
        assert_eq!(est.spo2, 87.0);
    }

    #[test]
    fn truncation_keeps_most_recent_samples() {
        let (mut raw_ir, raw_red, ir, red) = unit_ratio_window(44);
        raw_ir.splice(0..0, vec![0.0; 10]);
        let est = estimate_spo2(&raw_ir, &raw_red, &ir, &red, &Spo2Config::default()).unwrap();
        assert_eq!(est.dc_ir, 1000.0);
    }
}
