//! Backend-neutral figure model; the CLI renders it with plotters.

use crate::detectors::ppg::PeakDetection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

/// `0xRRGGBB`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, or `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

/// Keep at most `max_points` evenly spaced points.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Centered window, detection threshold and accepted peaks against time.
pub fn figure_from_detection(detection: &PeakDetection, fs: f64, max_points: usize) -> Figure {
    let dt = 1.0 / fs.max(f64::MIN_POSITIVE);
    let mut fig = Figure::new(Some("Pulse peaks".to_string()));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("centered amplitude".into());

    let signal: Vec<[f64; 2]> = detection
        .centered
        .iter()
        .enumerate()
        .map(|(i, v)| [i as f64 * dt, *v])
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: "filtered IR".into(),
        points: decimate_points(&signal, max_points),
        style: Style {
            width: 1.4,
            dash: None,
            color: Color(0x1F77B4),
        },
    }));

    let t_end = detection.centered.len().saturating_sub(1) as f64 * dt;
    fig.add_series(Series::Line(LineSeries {
        name: "threshold".into(),
        points: vec![[0.0, detection.threshold], [t_end, detection.threshold]],
        style: Style {
            width: 1.0,
            dash: Some([4.0, 4.0]),
            color: Color(0x7F7F7F),
        },
    }));

    fig.add_series(Series::Markers(MarkerSeries {
        name: "peaks".into(),
        points: detection
            .peaks
            .peaks
            .iter()
            .map(|p| [p.position * dt, p.amplitude])
            .collect(),
        radius: 4,
        color: Color(0xFF0077),
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Peak, Peaks};

    #[test]
    fn decimation_keeps_short_series() {
        let points: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        assert_eq!(decimate_points(&points, 20).len(), 10);
        let thinned = decimate_points(&points, 5);
        assert_eq!(thinned.len(), 5);
        assert_eq!(thinned[1], [2.0, 0.0]);
    }

    #[test]
    fn detection_figure_layout() {
        let detection = PeakDetection {
            centered: vec![-1.0, 3.0, -1.0, -1.0, 3.0],
            threshold: 0.9,
            peaks: Peaks {
                peaks: vec![Peak {
                    index: 1,
                    position: 1.0,
                    amplitude: 3.0,
                }],
            },
        };
        let fig = figure_from_detection(&detection, 2.0, 1024);
        assert_eq!(fig.series.len(), 3);
        assert_eq!(fig.series[2].points(), &[[0.5, 3.0]]);
        assert_eq!(fig.bounds(), Some((0.0, 2.0, -1.0, 3.0)));
        assert_eq!(Color(0xFF0077).rgb(), (0xFF, 0x00, 0x77));
    }
}
