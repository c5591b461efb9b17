//! Dual-axis time-series chart of the in-memory history.
//!
//! Left axis: CPU and memory percentage, fixed 0..100.
//! Right axis: disk and network counters in MB, scaled to the largest value.

use crate::error::{MonitorError, Result};
use crate::types::{Metrics, TIMESTAMP_FORMAT};
use std::path::{Path, PathBuf};

/// Receives the ordered history and produces an artifact from it.
pub trait ChartSink: Send + Sync {
    fn render(&self, history: &[Metrics]) -> Result<()>;
}

const WIDTH: f64 = 1400.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 90.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 150.0;
const X_LABEL_EVERY: usize = 6;

#[derive(Clone, Copy)]
enum Axis {
    Percent,
    Megabytes,
}

struct Series {
    label: &'static str,
    color: &'static str,
    axis: Axis,
    value: fn(&Metrics) -> f64,
}

fn cpu_usage(m: &Metrics) -> f64 {
    m.cpu_usage
}
fn memory_usage(m: &Metrics) -> f64 {
    m.memory_usage
}
fn disk_read(m: &Metrics) -> f64 {
    m.disk_read
}
fn disk_write(m: &Metrics) -> f64 {
    m.disk_write
}
fn network_sent(m: &Metrics) -> f64 {
    m.network_sent
}
fn network_received(m: &Metrics) -> f64 {
    m.network_received
}

const SERIES: [Series; 6] = [
    Series {
        label: "CPU Usage (%)",
        color: "blue",
        axis: Axis::Percent,
        value: cpu_usage,
    },
    Series {
        label: "Memory Usage (%)",
        color: "green",
        axis: Axis::Percent,
        value: memory_usage,
    },
    Series {
        label: "Disk Read (MB)",
        color: "red",
        axis: Axis::Megabytes,
        value: disk_read,
    },
    Series {
        label: "Disk Write (MB)",
        color: "orange",
        axis: Axis::Megabytes,
        value: disk_write,
    },
    Series {
        label: "Network Sent (MB)",
        color: "purple",
        axis: Axis::Megabytes,
        value: network_sent,
    },
    Series {
        label: "Network Received (MB)",
        color: "brown",
        axis: Axis::Megabytes,
        value: network_received,
    },
];

/// Writes an SVG file, replacing the previous one atomically.
pub struct SvgChart {
    path: PathBuf,
}

impl SvgChart {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChartSink for SvgChart {
    fn render(&self, history: &[Metrics]) -> Result<()> {
        if history.is_empty() {
            return Err(MonitorError::render("no samples to plot"));
        }
        let svg = render_svg(history);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("svg.tmp");
        std::fs::write(&tmp, svg)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    mb_max: f64,
}

impl Frame {
    fn x(&self, idx: usize, history: &[Metrics]) -> f64 {
        let first = history[0].timestamp;
        let span = (history[history.len() - 1].timestamp - first).num_seconds();
        if span <= 0 {
            // single instant: spread by index, or center a lone point
            if history.len() == 1 {
                return (self.x0 + self.x1) / 2.0;
            }
            let frac = idx as f64 / (history.len() - 1) as f64;
            return self.x0 + frac * (self.x1 - self.x0);
        }
        let offset = (history[idx].timestamp - first).num_seconds() as f64;
        self.x0 + offset / span as f64 * (self.x1 - self.x0)
    }

    fn y(&self, value: f64, axis: Axis) -> f64 {
        let max = match axis {
            Axis::Percent => 100.0,
            Axis::Megabytes => self.mb_max,
        };
        let frac = (value / max).clamp(0.0, 1.0);
        self.y1 - frac * (self.y1 - self.y0)
    }
}

/// Round up to 1, 2 or 5 times a power of ten.
fn nice_ceiling(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    for step in [1.0, 2.0, 5.0, 10.0] {
        if value <= step * magnitude {
            return step * magnitude;
        }
    }
    10.0 * magnitude
}

pub fn render_svg(history: &[Metrics]) -> String {
    let mb_peak = history
        .iter()
        .flat_map(|m| [m.disk_read, m.disk_write, m.network_sent, m.network_received])
        .fold(0.0, f64::max);
    let frame = Frame {
        x0: MARGIN_LEFT,
        x1: WIDTH - MARGIN_RIGHT,
        y0: MARGIN_TOP,
        y1: HEIGHT - MARGIN_BOTTOM,
        mb_max: nice_ceiling(mb_peak),
    };

    let mut svg = String::with_capacity(16 * 1024);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    ));
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
    svg.push_str(&format!(
        r#"<text x="{}" y="28" text-anchor="middle" font-size="16">System Metrics</text>"#,
        WIDTH / 2.0
    ));
    svg.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="black"/>"#,
        frame.x0,
        frame.y0,
        frame.x1 - frame.x0,
        frame.y1 - frame.y0
    ));

    push_axes(&mut svg, &frame);
    push_time_labels(&mut svg, &frame, history);

    for series in &SERIES {
        let points: Vec<(f64, f64)> = history
            .iter()
            .enumerate()
            .map(|(idx, m)| (frame.x(idx, history), frame.y((series.value)(m), series.axis)))
            .collect();
        let joined = points
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{joined}"/>"#,
            series.color
        ));
        for (x, y) in points {
            svg.push_str(&format!(
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="2.5" fill="{}"/>"#,
                series.color
            ));
        }
    }

    push_legend(&mut svg, &frame);
    svg.push_str("</svg>\n");
    svg
}

fn push_axes(svg: &mut String, frame: &Frame) {
    for step in 0..=5 {
        let pct = step as f64 * 20.0;
        let y = frame.y(pct, Axis::Percent);
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="blue" stroke-width="0.3"/><text x="{}" y="{:.1}" text-anchor="end" fill="blue">{pct:.0}</text>"#,
            frame.x0,
            frame.x1,
            frame.x0 - 6.0,
            y + 4.0
        ));

        let mb = frame.mb_max * step as f64 / 5.0;
        svg.push_str(&format!(
            r#"<text x="{}" y="{:.1}" fill="red">{}</text>"#,
            frame.x1 + 6.0,
            y + 4.0,
            format_mb(mb)
        ));
    }

    let mid = (frame.y0 + frame.y1) / 2.0;
    svg.push_str(&format!(
        r#"<text x="20" y="{mid:.1}" fill="blue" transform="rotate(-90 20 {mid:.1})" text-anchor="middle">Usage (%)</text>"#
    ));
    let right = WIDTH - 20.0;
    svg.push_str(&format!(
        r#"<text x="{right}" y="{mid:.1}" fill="red" transform="rotate(90 {right} {mid:.1})" text-anchor="middle">Data (MB)</text>"#
    ));
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{}" text-anchor="middle">Time</text>"#,
        (frame.x0 + frame.x1) / 2.0,
        HEIGHT - 10.0
    ));
}

fn push_time_labels(svg: &mut String, frame: &Frame, history: &[Metrics]) {
    for idx in (0..history.len()).step_by(X_LABEL_EVERY) {
        let x = frame.x(idx, history);
        let y = frame.y1 + 14.0;
        svg.push_str(&format!(
            r#"<line x1="{x:.1}" y1="{}" x2="{x:.1}" y2="{}" stroke="black"/><text x="{x:.1}" y="{y:.1}" text-anchor="end" transform="rotate(-45 {x:.1} {y:.1})">{}</text>"#,
            frame.y1,
            frame.y1 + 5.0,
            history[idx].timestamp.format(TIMESTAMP_FORMAT)
        ));
    }
}

fn push_legend(svg: &mut String, frame: &Frame) {
    let x = frame.x0 + 10.0;
    let y = frame.y0 + 10.0;
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="190" height="{}" fill="white" fill-opacity="0.85" stroke="gray"/>"#,
        SERIES.len() as f64 * 16.0 + 8.0
    ));
    for (i, series) in SERIES.iter().enumerate() {
        let row = y + 16.0 + i as f64 * 16.0;
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{:.1}" x2="{}" y2="{:.1}" stroke="{}" stroke-width="2"/><text x="{}" y="{row:.1}">{}</text>"#,
            x + 8.0,
            row - 4.0,
            x + 28.0,
            row - 4.0,
            series.color,
            x + 34.0,
            series.label
        ));
    }
}

fn format_mb(mb: f64) -> String {
    if mb >= 100.0 || mb.fract() == 0.0 {
        format!("{mb:.0}")
    } else {
        format!("{mb:.2}")
    }
}
