use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// One raw IR/Red reading taken at the same acquisition tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    pub ir: f64,
    pub red: f64,
}

impl SamplePair {
    pub fn new(ir: f64, red: f64) -> Self {
        Self { ir, red }
    }

    /// Build a pair from raw sensor counts of any numeric type.
    pub fn from_raw<T: ToPrimitive>(ir: T, red: T) -> Option<Self> {
        Some(Self::new(ir.to_f64()?, red.to_f64()?))
    }
}

/// A sample pair stamped with the monotonic time it was acquired at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    pub t_us: u64,
    pub ir: f64,
    pub red: f64,
}

impl TimedSample {
    pub fn pair(&self) -> SamplePair {
        SamplePair::new(self.ir, self.red)
    }
}

/// An accepted pulse peak inside one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Sample index into the centered window
    pub index: usize,
    /// Sub-sample position; equals `index` when unrefined
    pub position: f64,
    /// Centered amplitude at `index`
    pub amplitude: f64,
}

/// Ordered peaks of one window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Peaks {
    pub peaks: Vec<Peak>,
}

impl Peaks {
    pub fn len(&self) -> usize {
        self.peaks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
    pub fn indices(&self) -> Vec<usize> {
        self.peaks.iter().map(|p| p.index).collect()
    }
    pub fn positions(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.position).collect()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Differences between adjacent positions, converted to seconds.
    pub fn from_positions(positions: &[f64], fs: f64) -> Self {
        let mut rr = Vec::new();
        for w in positions.windows(2) {
            rr.push((w[1] - w[0]) / fs);
        }
        Self { rr }
    }

    pub fn from_peaks(peaks: &Peaks, fs: f64) -> Self {
        Self::from_positions(&peaks.positions(), fs)
    }
}
