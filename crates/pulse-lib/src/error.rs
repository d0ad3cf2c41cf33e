//! Recoverable per-window estimation failures.

use thiserror::Error;

/// Reasons a window produced no HR or SpO2 estimate.
///
/// None of these are fatal: the caller skips the window and lets the
/// stability policy decide what to report.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EstimateError {
    #[error("window too short: need {needed} samples, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("signal amplitude too flat for pulse detection")]
    InsufficientSignal,

    #[error("found {found} peak(s); at least two are needed for an RR interval")]
    InsufficientPeaks { found: usize },

    #[error("no RR interval inside the plausible heart-rate range")]
    NoPlausibleInterval,

    #[error("median RR interval is not positive")]
    NonPositiveInterval,

    #[error("DC component is zero on at least one channel")]
    ZeroDcComponent,

    #[error("IR modulation ratio is zero")]
    ZeroIrModulation,

    /// AC amplitude larger than the DC level: no finger or heavy motion.
    #[error("AC amplitude exceeds DC level")]
    ExcessiveModulation,

    #[error("invalid sampling frequency: {0} Hz")]
    InvalidSamplingFrequency(f64),

    #[error("filters are not calibrated yet")]
    Uncalibrated,
}

impl EstimateError {
    /// Short machine-readable label used in CLI JSON output and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EstimateError::InsufficientSamples { .. } => "insufficient-samples",
            EstimateError::InsufficientSignal => "insufficient-signal",
            EstimateError::InsufficientPeaks { .. } => "insufficient-peaks",
            EstimateError::NoPlausibleInterval => "no-plausible-interval",
            EstimateError::NonPositiveInterval => "non-positive-interval",
            EstimateError::ZeroDcComponent => "zero-dc-component",
            EstimateError::ZeroIrModulation => "zero-ir-modulation",
            EstimateError::ExcessiveModulation => "excessive-modulation",
            EstimateError::InvalidSamplingFrequency(_) => "invalid-sampling-frequency",
            EstimateError::Uncalibrated => "uncalibrated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_counts() {
        let err = EstimateError::InsufficientSamples { needed: 10, got: 4 };
        assert_eq!(err.to_string(), "window too short: need 10 samples, got 4");
        assert_eq!(err.kind(), "insufficient-samples");
    }
}
