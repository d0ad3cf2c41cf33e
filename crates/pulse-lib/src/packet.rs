//! Newline-delimited JSON packets sent to the display side.

use crate::{metrics::stability::HrReport, pipeline::WindowResult, signal::SamplePair};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Packet {
    /// One filtered sample pair, sent for live plotting.
    Sample { red: f64, ir: f64 },
    /// Per-window summary. Unknown values are sent as `null`.
    Result {
        acq_freq: f64,
        hr: HrReport,
        spo2: Option<f64>,
        body_temp: Option<f64>,
    },
}

impl Packet {
    pub fn sample(filtered: SamplePair) -> Self {
        Packet::Sample {
            red: filtered.red,
            ir: filtered.ir,
        }
    }

    pub fn result(result: &WindowResult, body_temp: Option<f64>) -> Self {
        Packet::Result {
            acq_freq: result.acq_freq,
            hr: result.hr.clone(),
            spo2: result.spo2,
            body_temp,
        }
    }
}

/// Serialize one packet as a single JSON line, newline included.
pub fn encode_line(packet: &Packet) -> Result<String> {
    let mut line = serde_json::to_string(packet).context("encoding packet")?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line(line: &str) -> Result<Packet> {
    serde_json::from_str(line.trim_end()).with_context(|| format!("decoding packet {:?}", line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn sample_packet_layout() {
        let line = encode_line(&Packet::sample(SamplePair::new(12.5, -3.0))).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({"type": "sample", "red": -3.0, "ir": 12.5}));
    }

    #[test]
    fn result_packet_keeps_nulls() {
        let result = WindowResult {
            acq_freq: 50.0,
            hr: HrReport::default(),
            spo2: None,
        };
        let line = encode_line(&Packet::result(&result, None)).unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "result",
                "acq_freq": 50.0,
                "hr": {"value": null, "peaks_index": []},
                "spo2": null,
                "body_temp": null
            })
        );
    }

    #[test]
    fn result_packet_parses_back() {
        let packet = Packet::Result {
            acq_freq: 49.5,
            hr: HrReport {
                bpm: Some(72.3),
                peaks_index: vec![12, 54, 95],
            },
            spo2: Some(97.0),
            body_temp: Some(36.4),
        };
        let line = encode_line(&packet).unwrap();
        assert_eq!(decode_line(&line).unwrap(), packet);
        assert!(decode_line("{\"type\":\"bogus\"}").is_err());
    }
}
