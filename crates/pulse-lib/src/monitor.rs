//! Acquisition loop: pulls samples from a source, runs the pipeline and
//! turns its output into packets.

use crate::{
    packet::Packet,
    pipeline::{PpgPipeline, WindowReport},
    signal::SamplePair,
    source::{Clock, SampleSource, TemperatureSource},
};
use anyhow::Result;
use log::{info, warn};

pub struct Monitor<T: TemperatureSource> {
    pipeline: PpgPipeline,
    temperature: T,
    last_temp: Option<f64>,
    emit_samples: bool,
}

impl<T: TemperatureSource> Monitor<T> {
    pub fn new(pipeline: PpgPipeline, temperature: T) -> Self {
        Self {
            pipeline,
            temperature,
            last_temp: None,
            emit_samples: true,
        }
    }

    /// Whether a `sample` packet is emitted for every filtered pair.
    pub fn emit_samples(mut self, on: bool) -> Self {
        self.emit_samples = on;
        self
    }

    pub fn pipeline(&self) -> &PpgPipeline {
        &self.pipeline
    }

    /// Feed one pair. Returns the packets it produced together with the
    /// window report, if the pair completed a window.
    pub fn ingest(&mut self, pair: SamplePair, now_us: u64) -> (Vec<Packet>, Option<WindowReport>) {
        let outcome = self.pipeline.push(pair, now_us);
        let mut packets = Vec::new();
        if self.emit_samples {
            packets.push(Packet::sample(outcome.filtered));
        }
        if let Some(report) = &outcome.window {
            let body_temp = self.read_temperature();
            packets.push(Packet::result(&report.result, body_temp));
        }
        (packets, outcome.window)
    }

    /// Run until the source is exhausted, handing every packet to `sink`.
    /// Returns the number of windows processed.
    pub fn drain<S, C, F>(&mut self, source: &mut S, clock: &C, mut sink: F) -> Result<u64>
    where
        S: SampleSource,
        C: Clock,
        F: FnMut(Packet) -> Result<()>,
    {
        let mut windows = 0;
        while let Some(pair) = source.next_pair() {
            let (packets, report) = self.ingest(pair, clock.now_us());
            for packet in packets {
                sink(packet)?;
            }
            if report.is_some() {
                windows += 1;
            }
        }
        info!(
            "source exhausted after {} windows (filters calibrated: {})",
            windows,
            self.pipeline.is_calibrated()
        );
        Ok(windows)
    }

    fn read_temperature(&mut self) -> Option<f64> {
        if !self.temperature.is_present() {
            return None;
        }
        match self.temperature.read_celsius() {
            Ok(celsius) => {
                self.last_temp = Some(celsius);
                Some(celsius)
            }
            Err(err) => {
                warn!("temperature read failed, reusing last value: {:#}", err);
                self.last_temp
            }
        }
    }
}
