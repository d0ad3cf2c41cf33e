use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use plotters::prelude::*;
use pulse_lib::{
    config::PulseConfig,
    detectors::ppg::{detect_peaks, RefractoryPolicy},
    error::EstimateError,
    io::{recording as rec_io, recording::Recording, text as text_io},
    metrics::{hr::compute_hr, spo2::estimate_window_spo2},
    monitor::Monitor,
    packet::encode_line,
    pipeline::PpgPipeline,
    plot::{figure_from_detection, Figure, Series},
    signal::TimeSeries,
    source::{FixedTemperature, NoTemperature, TemperatureSource},
    synth::SyntheticPpg,
};
use serde_json::json;
use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "pulse",
    version,
    about = "Pulse: PPG heart-rate and SpO2 tools"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Pipeline configuration file (TOML); built-in defaults otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RefractoryArg {
    Reject,
    ReplaceIfLarger,
}

impl From<RefractoryArg> for RefractoryPolicy {
    fn from(arg: RefractoryArg) -> Self {
        match arg {
            RefractoryArg::Reject => RefractoryPolicy::Reject,
            RefractoryArg::ReplaceIfLarger => RefractoryPolicy::ReplaceIfLarger,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a `t_us,ir,red` recording through the streaming pipeline,
    /// printing one JSON packet per line
    Process {
        /// Recording CSV (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Samples per analysis window (overrides the configuration)
        #[arg(long)]
        window_size: Option<usize>,
        /// Also emit a `sample` packet for every filtered pair
        #[arg(long)]
        emit_samples: bool,
        /// Constant body temperature to report, in degrees Celsius
        #[arg(long)]
        body_temp: Option<f64>,
        /// Packet output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Heart rate of one window of filtered IR samples
    Hr {
        #[arg(long, default_value_t = 50.0)]
        fs: f64,
        /// Plain-text samples (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Report integer peak indices without parabolic refinement
        #[arg(long)]
        no_refine: bool,
        #[arg(long, value_enum)]
        refractory_policy: Option<RefractoryArg>,
    },
    /// SpO2 of one `raw_ir,raw_red,ir,red` window
    Spo2 {
        #[arg(long)]
        input: PathBuf,
    },
    /// Write a synthetic `t_us,ir,red` recording
    Simulate {
        #[arg(long, default_value_t = 50.0)]
        fs: f64,
        #[arg(long, default_value_t = 72.0)]
        bpm: f64,
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(long, default_value_t = 5.0)]
        noise: f64,
        #[arg(long, default_value_t = 0)]
        jitter_us: u64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Output CSV (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render the detected peaks of one filtered window to a PNG via plotters
    Plot {
        #[arg(long, default_value_t = 50.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    let mut cfg = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Process {
            input,
            window_size,
            emit_samples,
            body_temp,
            out,
        } => {
            if let Some(n) = window_size {
                cfg.window_size = n;
                cfg.validate()?;
            }
            cmd_process(cfg, input.as_deref(), emit_samples, body_temp, out.as_deref())?
        }
        Commands::Hr {
            fs,
            input,
            no_refine,
            refractory_policy,
        } => {
            if no_refine {
                cfg.detector.refine = false;
            }
            if let Some(policy) = refractory_policy {
                cfg.detector.refractory_policy = policy.into();
            }
            cmd_hr(&cfg, fs, input.as_deref())?
        }
        Commands::Spo2 { input } => cmd_spo2(&cfg, &input)?,
        Commands::Simulate {
            fs,
            bpm,
            seconds,
            noise,
            jitter_us,
            seed,
            out,
        } => {
            let synth = SyntheticPpg {
                fs,
                bpm,
                seconds,
                noise,
                jitter_us,
                seed,
                ..SyntheticPpg::default()
            };
            cmd_simulate(&synth, out.as_deref())?
        }
        Commands::Plot { fs, input, out } => cmd_plot(&cfg, fs, input.as_deref(), &out)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PulseConfig> {
    match path {
        Some(path) => {
            let cfg = PulseConfig::load(path)?;
            info!("loaded configuration from {}", path.display());
            Ok(cfg)
        }
        None => Ok(PulseConfig::default()),
    }
}

fn read_samples(input: Option<&Path>, fs: f64) -> Result<TimeSeries> {
    anyhow::ensure!(
        fs.is_finite() && fs > 0.0,
        "sampling frequency must be positive, got {}",
        fs
    );
    let ts = match input {
        Some(path) => text_io::read_time_series(path, fs)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            TimeSeries {
                fs,
                data: text_io::parse_f64_series(&buf)?,
            }
        }
    };
    info!(
        "read {} samples ({:.2} s at {} Hz)",
        ts.len(),
        ts.duration(),
        ts.fs
    );
    Ok(ts)
}

fn read_recording(input: Option<&Path>) -> Result<Recording> {
    match input {
        Some(path) => rec_io::read_recording(path),
        None => rec_io::parse_recording(io::stdin().lock()).context("reading recording from stdin"),
    }
}

fn cmd_process(
    cfg: PulseConfig,
    input: Option<&Path>,
    samples: bool,
    body_temp: Option<f64>,
    out: Option<&Path>,
) -> Result<()> {
    let recording = read_recording(input)?;
    info!(
        "replaying {} samples (~{:.1} Hz)",
        recording.len(),
        recording.mean_fs().unwrap_or(0.0)
    );
    let sink: Box<dyn Write> = match out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    match body_temp {
        Some(celsius) => run_monitor(cfg, recording, FixedTemperature(celsius), samples, sink),
        None => run_monitor(cfg, recording, NoTemperature, samples, sink),
    }
}

fn run_monitor<T: TemperatureSource>(
    cfg: PulseConfig,
    recording: Recording,
    temperature: T,
    samples: bool,
    sink: Box<dyn Write>,
) -> Result<()> {
    let (mut source, clock) = recording.into_replay();
    let mut monitor = Monitor::new(PpgPipeline::new(cfg), temperature).emit_samples(samples);
    let mut out = BufWriter::new(sink);
    let windows = monitor.drain(&mut source, &clock, |packet| {
        out.write_all(encode_line(&packet)?.as_bytes())
            .context("writing packet")
    })?;
    out.flush()?;
    info!("processed {} windows", windows);
    Ok(())
}

fn print_estimate<T: serde::Serialize>(estimate: Result<T, EstimateError>) -> Result<()> {
    let js = match estimate {
        Ok(value) => serde_json::to_string(&value)?,
        Err(err) => {
            info!("estimation failed: {}", err);
            json!({ "error": err.kind(), "message": err.to_string() }).to_string()
        }
    };
    println!("{}", js);
    Ok(())
}

fn cmd_hr(cfg: &PulseConfig, fs: f64, input: Option<&Path>) -> Result<()> {
    let ts = read_samples(input, fs)?;
    print_estimate(compute_hr(&ts.data, ts.fs, &cfg.detector, &cfg.heart_rate))
}

fn cmd_spo2(cfg: &PulseConfig, input: &Path) -> Result<()> {
    let window = rec_io::read_window_csv(input)?;
    print_estimate(estimate_window_spo2(&window, &cfg.spo2))
}

fn cmd_simulate(synth: &SyntheticPpg, out: Option<&Path>) -> Result<()> {
    let recording = synth.generate();
    info!(
        "generated {} samples at {} Hz, {} BPM",
        recording.len(),
        synth.fs,
        synth.bpm
    );
    match out {
        Some(path) => rec_io::write_recording(path, &recording),
        None => rec_io::write_recording_to(io::stdout().lock(), &recording),
    }
}

fn cmd_plot(cfg: &PulseConfig, fs: f64, input: Option<&Path>, out: &Path) -> Result<()> {
    let ts = read_samples(input, fs)?;
    let detection =
        detect_peaks(&ts.data, ts.fs, &cfg.detector).context("peak detection failed")?;
    let fig = figure_from_detection(&detection, ts.fs, 2048);
    draw_plotters_figure(out, &fig)?;
    Ok(())
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let (x_min, mut x_max, y_min, mut y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    let mut mesh = chart.configure_mesh();
    if let Some(label) = &fig.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &fig.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let width = line.style.width.round().max(1.0) as u32;
                let style = RGBColor(r, g, b).stroke_width(width);
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    style,
                ))?;
            }
            Series::Markers(markers) => {
                let (r, g, b) = markers.color.rgb();
                let color = RGBColor(r, g, b);
                chart.draw_series(
                    markers
                        .points
                        .iter()
                        .map(|p| Circle::new((p[0], p[1]), markers.radius, color.filled())),
                )?;
            }
        }
    }
    root.present()?;
    Ok(())
}
