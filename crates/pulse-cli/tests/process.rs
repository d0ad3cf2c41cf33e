use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, fs};
use tempfile::tempdir;

fn simulate(path: &std::path::Path, seconds: &str) {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "simulate",
        "--fs",
        "50",
        "--bpm",
        "72",
        "--seconds",
        seconds,
        "--out",
        path.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();
}

fn packets(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn simulate_writes_timestamped_csv() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("rec.csv");
    simulate(&path, "2");
    let contents = fs::read_to_string(&path)?;
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("t_us,ir,red"));
    assert_eq!(lines.count(), 100);
    Ok(())
}

#[test]
fn process_emits_one_result_per_window() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("rec.csv");
    simulate(&path, "20");

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "process",
        "--body-temp",
        "36.6",
        "--input",
        path.to_str().expect("utf8 path"),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let results = packets(&out);
    assert_eq!(results.len(), 10);

    // the first window is collected before the rate is known
    let first = &results[0];
    assert_eq!(first["type"], "result");
    assert_eq!(first["acq_freq"], 0.0);
    assert!(first["hr"]["value"].is_null());
    assert!(first["spo2"].is_null());
    assert_eq!(first["body_temp"], 36.6);

    let mut reported = 0;
    for packet in &results[2..] {
        assert_eq!(packet["acq_freq"], 50.0);
        if let Some(bpm) = packet["hr"]["value"].as_f64() {
            reported += 1;
            assert!((bpm - 72.0).abs() < 4.0, "bpm {}", bpm);
            assert!(!packet["hr"]["peaks_index"].as_array().unwrap().is_empty());
        }
        let spo2 = packet["spo2"].as_f64().expect("spo2 present");
        assert!((0.0..=100.0).contains(&spo2));
    }
    assert!(reported >= 6, "only {} windows reported HR", reported);
    Ok(())
}

#[test]
fn process_streams_samples_from_stdin() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let path = temp.path().join("rec.csv");
    simulate(&path, "3");

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args(["process", "--emit-samples"])
        .write_stdin(fs::read_to_string(&path)?);
    let out = cmd.assert().success().get_output().stdout.clone();
    let all = packets(&out);
    let samples = all.iter().filter(|p| p["type"] == "sample").count();
    let results = all.iter().filter(|p| p["type"] == "result").count();
    assert_eq!(samples, 150);
    assert_eq!(results, 1);
    assert!(all.iter().all(|p| p.get("body_temp").map_or(true, Value::is_null)));
    Ok(())
}

#[test]
fn process_writes_packets_to_file_with_custom_window() -> Result<(), Box<dyn Error>> {
    let temp = tempdir()?;
    let rec = temp.path().join("rec.csv");
    let out = temp.path().join("packets.ndjson");
    simulate(&rec, "4");

    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.args([
        "process",
        "--window-size",
        "50",
        "--input",
        rec.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    let stdout = cmd.assert().success().get_output().stdout.clone();
    assert!(stdout.is_empty());
    let results = packets(fs::read_to_string(&out)?.as_bytes());
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|p| p["type"] == "result"));
    Ok(())
}

#[test]
fn process_rejects_malformed_recording() {
    let mut cmd = cargo_bin_cmd!("pulse");
    cmd.arg("process").write_stdin("t_us,ir,red\n0,abc,1\n");
    cmd.assert().failure();
}
