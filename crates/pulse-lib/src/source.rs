//! Boundaries between the pipeline and the hardware (or a replay of it).

use crate::signal::SamplePair;
use anyhow::Result;
use std::time::Instant;

/// Produces IR/Red sample pairs in acquisition order.
pub trait SampleSource {
    /// Whether a pair can be read without blocking.
    fn available(&self) -> bool;

    /// Next pair, or `None` once the source is exhausted.
    fn next_pair(&mut self) -> Option<SamplePair>;
}

/// Monotonic microsecond clock.
pub trait Clock {
    fn now_us(&self) -> u64;
}

/// Body temperature sensor.
pub trait TemperatureSource {
    fn read_celsius(&mut self) -> Result<f64>;

    /// `false` for a board without a temperature sensor.
    fn is_present(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Always reports the same temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTemperature(pub f64);

impl TemperatureSource for FixedTemperature {
    fn read_celsius(&mut self) -> Result<f64> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemperature;

impl TemperatureSource for NoTemperature {
    fn read_celsius(&mut self) -> Result<f64> {
        anyhow::bail!("no temperature sensor attached")
    }

    fn is_present(&self) -> bool {
        false
    }
}
