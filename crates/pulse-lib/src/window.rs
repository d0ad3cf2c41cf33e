use log::warn;
use serde::{Deserialize, Serialize};

/// Optical channels tracked by the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ir,
    Red,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Ir, Channel::Red];

    fn slot(self) -> usize {
        match self {
            Channel::Ir => 0,
            Channel::Red => 1,
        }
    }
}

/// Raw and filtered samples of one channel, in acquisition order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelWindow {
    pub raw: Vec<f64>,
    pub filtered: Vec<f64>,
}

impl ChannelWindow {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: Vec::with_capacity(capacity),
            filtered: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// A completed window: exactly `N` samples per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub ir: ChannelWindow,
    pub red: ChannelWindow,
}

impl Window {
    pub fn len(&self) -> usize {
        self.ir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ir.is_empty()
    }
}

/// Accumulates non-overlapping fixed-size windows for the IR and Red channels.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    capacity: usize,
    channels: [ChannelWindow; 2],
}

impl WindowBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            channels: [
                ChannelWindow::with_capacity(capacity),
                ChannelWindow::with_capacity(capacity),
            ],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.channels[channel.slot()].len()
    }

    /// Append one raw/filtered sample. Returns `false` and drops the sample
    /// when the channel already holds a full window.
    pub fn push(&mut self, channel: Channel, raw: f64, filtered: f64) -> bool {
        let slot = &mut self.channels[channel.slot()];
        if slot.len() >= self.capacity {
            warn!(
                "{:?} window already holds {} samples; dropping sample",
                channel, self.capacity
            );
            return false;
        }
        slot.raw.push(raw);
        slot.filtered.push(filtered);
        true
    }

    pub fn is_full(&self) -> bool {
        self.channels.iter().all(|c| c.len() >= self.capacity)
    }

    /// Hand out the filled window and start a fresh one.
    ///
    /// Returns `None` without touching the contents while any channel is short.
    pub fn drain(&mut self) -> Option<Window> {
        if !self.is_full() {
            return None;
        }
        let capacity = self.capacity;
        let [ir, red] = std::mem::replace(
            &mut self.channels,
            [
                ChannelWindow::with_capacity(capacity),
                ChannelWindow::with_capacity(capacity),
            ],
        );
        Some(Window { ir, red })
    }
}
