//! Sample-by-sample orchestration of the PPG pipeline.
//!
//! Each pushed sample pair updates the acquisition-frequency meter, runs
//! through both channel filters and lands in the window buffer. Whenever a
//! window fills up, HR and SpO2 are estimated independently and folded
//! through the stability tracker into a [`WindowResult`].

use crate::{
    config::PulseConfig,
    error::EstimateError,
    filters::bandpass::ChannelFilter,
    frequency::FrequencyMeter,
    metrics::{
        hr::{compute_hr, HeartRateEstimate},
        spo2::{estimate_window_spo2, Spo2Estimate},
        stability::{HrReport, StabilityTracker},
    },
    signal::SamplePair,
    window::{Channel, Window, WindowBuffer},
};
use log::{debug, info, warn};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// When the measured acquisition frequency is trusted enough to switch the
/// filters from passthrough to filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub min_fs_hz: f64,
    pub max_fs_hz: f64,
    /// Largest change between consecutive readings still counted as stable.
    pub tolerance_hz: f64,
    /// Consecutive stable in-range readings required.
    pub confirmations: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_fs_hz: 10.0,
            max_fs_hz: 1000.0,
            tolerance_hz: 2.0,
            confirmations: 2,
        }
    }
}

/// Per-window record handed to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    /// Acquisition frequency used for the estimates (0 while unknown)
    pub acq_freq: f64,
    pub hr: HrReport,
    pub spo2: Option<f64>,
}

/// A window result together with the raw estimator outcomes behind it.
#[derive(Debug, Clone)]
pub struct WindowReport {
    pub index: u64,
    pub result: WindowResult,
    pub hr: Result<HeartRateEstimate, EstimateError>,
    pub spo2: Result<Spo2Estimate, EstimateError>,
    pub window: Window,
}

/// What one pushed sample produced.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    /// Filter output for the pushed pair (the raw pair while uncalibrated)
    pub filtered: SamplePair,
    pub window: Option<WindowReport>,
}

#[derive(Debug, Clone)]
pub struct PpgPipeline {
    cfg: PulseConfig,
    meter: FrequencyMeter,
    ir_filter: ChannelFilter,
    red_filter: ChannelFilter,
    buffer: WindowBuffer,
    stability: StabilityTracker,
    last_reading: Option<f64>,
    stable_readings: u32,
    calibrated_fs: Option<f64>,
    calibrated_at_us: Option<u64>,
    windows: u64,
}

impl PpgPipeline {
    pub fn new(cfg: PulseConfig) -> Self {
        Self {
            meter: FrequencyMeter::new(&cfg.frequency),
            ir_filter: ChannelFilter::Uncalibrated,
            red_filter: ChannelFilter::Uncalibrated,
            buffer: WindowBuffer::new(cfg.window_size),
            stability: StabilityTracker::new(cfg.stability),
            last_reading: None,
            stable_readings: 0,
            calibrated_fs: None,
            calibrated_at_us: None,
            windows: 0,
            cfg,
        }
    }

    pub fn config(&self) -> &PulseConfig {
        &self.cfg
    }

    pub fn is_calibrated(&self) -> bool {
        self.ir_filter.is_calibrated() && self.red_filter.is_calibrated()
    }

    /// Frequency the filters were calibrated at.
    pub fn calibrated_fs(&self) -> Option<f64> {
        self.calibrated_fs
    }

    /// Tick time of the sample that triggered calibration.
    pub fn calibrated_at_us(&self) -> Option<u64> {
        self.calibrated_at_us
    }

    /// Latest measured acquisition frequency, falling back to the calibration value.
    pub fn acquisition_frequency(&self) -> Option<f64> {
        self.meter.current().or(self.calibrated_fs)
    }

    pub fn windows_emitted(&self) -> u64 {
        self.windows
    }

    pub fn stability(&self) -> &StabilityTracker {
        &self.stability
    }

    /// Calibrate both channel filters at `fs` right away.
    pub fn calibrate(&mut self, fs: f64) {
        self.ir_filter.calibrate(fs, &self.cfg.filter);
        self.red_filter.calibrate(fs, &self.cfg.filter);
        self.calibrated_fs = Some(fs);
        info!(
            "filters calibrated at {:.2} Hz (high-pass {} Hz, low-pass {} Hz)",
            fs, self.cfg.filter.high_pass_hz, self.cfg.filter.low_pass_hz
        );
    }

    pub fn push(&mut self, pair: SamplePair, now_us: u64) -> PushOutcome {
        if let Some(hz) = self.meter.tick(now_us) {
            debug!("acquisition frequency = {:.2} Hz", hz);
            if !self.is_calibrated() && self.confirm_frequency(hz) {
                self.calibrate(hz);
                self.calibrated_at_us = Some(now_us);
            }
        }

        let ir = self.ir_filter.step(pair.ir);
        let red = self.red_filter.step(pair.red);
        self.buffer.push(Channel::Ir, pair.ir, ir);
        self.buffer.push(Channel::Red, pair.red, red);

        let window = self.buffer.drain().map(|w| self.process_window(w));
        PushOutcome {
            filtered: SamplePair::new(ir, red),
            window,
        }
    }

    /// Push raw device counts. Returns `None` when a value has no `f64`
    /// representation; nothing is recorded in that case.
    pub fn push_raw<T: ToPrimitive>(
        &mut self,
        ir: T,
        red: T,
        now_us: u64,
    ) -> Option<PushOutcome> {
        let Some(pair) = SamplePair::from_raw(ir, red) else {
            warn!("dropping sample that does not convert to f64");
            return None;
        };
        Some(self.push(pair, now_us))
    }

    fn confirm_frequency(&mut self, hz: f64) -> bool {
        let cal = &self.cfg.calibration;
        if !(cal.min_fs_hz..=cal.max_fs_hz).contains(&hz) {
            debug!(
                "{:.2} Hz outside [{}, {}] Hz, waiting for a plausible rate",
                hz, cal.min_fs_hz, cal.max_fs_hz
            );
            self.last_reading = None;
            self.stable_readings = 0;
            return false;
        }
        self.stable_readings = match self.last_reading {
            Some(prev) if (hz - prev).abs() <= cal.tolerance_hz => self.stable_readings + 1,
            _ => 1,
        };
        self.last_reading = Some(hz);
        self.stable_readings >= cal.confirmations.max(1)
    }

    fn process_window(&mut self, window: Window) -> WindowReport {
        let index = self.windows;
        self.windows += 1;
        let fs = self.acquisition_frequency().unwrap_or(0.0);

        let (hr, spo2) = if self.is_calibrated() {
            (
                compute_hr(
                    &window.ir.filtered,
                    fs,
                    &self.cfg.detector,
                    &self.cfg.heart_rate,
                ),
                estimate_window_spo2(&window, &self.cfg.spo2),
            )
        } else {
            (
                Err(EstimateError::Uncalibrated),
                Err(EstimateError::Uncalibrated),
            )
        };

        match &hr {
            Ok(est) => debug!(
                "window {}: HR {:.1} BPM from {} peaks",
                index,
                est.bpm,
                est.peaks.len()
            ),
            Err(err) => debug!("window {}: HR could not be computed ({})", index, err),
        }
        match &spo2 {
            Ok(est) => debug!("window {}: SpO2 {:.1}% (R = {:.3})", index, est.spo2, est.r),
            Err(err) => debug!("window {}: SpO2 could not be computed ({})", index, err),
        }

        let hr_report = self.stability.update_hr(hr.as_ref().ok());
        let spo2_value = self
            .stability
            .update_spo2(spo2.as_ref().ok().map(|est| est.spo2));

        WindowReport {
            index,
            result: WindowResult {
                acq_freq: fs,
                hr: hr_report,
                spo2: spo2_value,
            },
            hr,
            spo2,
            window,
        }
    }
}
