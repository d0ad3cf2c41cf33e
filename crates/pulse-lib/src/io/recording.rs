//! Timestamped IR/Red recordings on disk, and replaying them through the
//! [`SampleSource`] / [`Clock`] boundaries.
//!
//! Recordings are CSV files with a `t_us,ir,red` header. Single windows
//! (raw and filtered values of both channels) use `raw_ir,raw_red,ir,red`.

use crate::{
    signal::{SamplePair, TimedSample},
    source::{Clock, SampleSource},
    window::{ChannelWindow, Window},
};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    collections::VecDeque,
    io::{Read, Write},
    path::Path,
    rc::Rc,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub samples: Vec<TimedSample>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Stamp evenly spaced pairs at `fs`, starting at t = 0.
    pub fn from_pairs(pairs: &[SamplePair], fs: f64) -> Self {
        let step_us = 1e6 / fs;
        let samples = pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| TimedSample {
                t_us: (i as f64 * step_us).round() as u64,
                ir: pair.ir,
                red: pair.red,
            })
            .collect();
        Self { samples }
    }

    /// Mean sampling frequency implied by the timestamps.
    pub fn mean_fs(&self) -> Option<f64> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        let span = last.t_us.checked_sub(first.t_us)?;
        if span == 0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 * 1e6 / span as f64)
    }

    /// Split into a source/clock pair whose clock reads the timestamp of the
    /// most recently replayed sample.
    pub fn into_replay(self) -> (ReplaySource, ReplayClock) {
        let now = Rc::new(Cell::new(0));
        (
            ReplaySource {
                samples: self.samples.into(),
                now: Rc::clone(&now),
            },
            ReplayClock { now },
        )
    }
}

#[derive(Debug)]
pub struct ReplaySource {
    samples: VecDeque<TimedSample>,
    now: Rc<Cell<u64>>,
}

impl ReplaySource {
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for ReplaySource {
    fn available(&self) -> bool {
        !self.samples.is_empty()
    }

    fn next_pair(&mut self) -> Option<SamplePair> {
        let sample = self.samples.pop_front()?;
        self.now.set(sample.t_us);
        Some(sample.pair())
    }
}

#[derive(Debug, Clone)]
pub struct ReplayClock {
    now: Rc<Cell<u64>>,
}

impl Clock for ReplayClock {
    fn now_us(&self) -> u64 {
        self.now.get()
    }
}

pub fn parse_recording<R: Read>(reader: R) -> Result<Recording> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);
    let mut samples = Vec::new();
    for (idx, row) in reader.deserialize::<TimedSample>().enumerate() {
        let sample = row.with_context(|| format!("parsing sample row {}", idx + 1))?;
        if let Some(prev) = samples.last().map(|s: &TimedSample| s.t_us) {
            if sample.t_us < prev {
                anyhow::bail!(
                    "row {}: timestamp {} us goes backwards (previous {} us)",
                    idx + 1,
                    sample.t_us,
                    prev
                );
            }
        }
        samples.push(sample);
    }
    if samples.is_empty() {
        anyhow::bail!("recording holds no samples");
    }
    Ok(Recording { samples })
}

pub fn read_recording(path: &Path) -> Result<Recording> {
    let file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_recording(file).with_context(|| format!("in {}", path.display()))
}

pub fn write_recording_to<W: Write>(writer: W, recording: &Recording) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    for sample in &recording.samples {
        writer.serialize(sample).context("writing sample row")?;
    }
    writer.flush().context("flushing recording")?;
    Ok(())
}

pub fn write_recording(path: &Path, recording: &Recording) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_recording_to(file, recording)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WindowRow {
    raw_ir: f64,
    raw_red: f64,
    ir: f64,
    red: f64,
}

pub fn parse_window<R: Read>(reader: R) -> Result<Window> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);
    let mut ir = ChannelWindow::default();
    let mut red = ChannelWindow::default();
    for (idx, row) in reader.deserialize::<WindowRow>().enumerate() {
        let row = row.with_context(|| format!("parsing window row {}", idx + 1))?;
        ir.raw.push(row.raw_ir);
        ir.filtered.push(row.ir);
        red.raw.push(row.raw_red);
        red.filtered.push(row.red);
    }
    if ir.is_empty() {
        anyhow::bail!("window holds no samples");
    }
    Ok(Window { ir, red })
}

pub fn read_window_csv(path: &Path) -> Result<Window> {
    let file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_window(file).with_context(|| format!("in {}", path.display()))
}

pub fn write_window_csv(path: &Path, window: &Window) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for i in 0..window.len() {
        writer
            .serialize(WindowRow {
                raw_ir: window.ir.raw[i],
                raw_red: window.red.raw[i],
                ir: window.ir.filtered[i],
                red: window.red.filtered[i],
            })
            .context("writing window row")?;
    }
    writer.flush().context("flushing window")?;
    Ok(())
}
