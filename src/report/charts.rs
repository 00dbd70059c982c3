//! SVG charts for the converted ledger and the analysis page.
//!
//! Every chart is written as `<kind><stamp>.svg` into the images directory.
//! Writing a chart first removes the previous files of the same kind.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::fmt::Debug;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::cumulative::DailyTotal;
use super::eps::{EpsKind, EpsPoint};
use crate::core::price::PriceBar;

const SIZE: (u32, u32) = (960, 540);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);
const LINE_BLUE: RGBColor = RGBColor(31, 119, 180);
const EXPECTED_ORANGE: RGBColor = RGBColor(255, 127, 14);
const GAIN_GREEN: RGBColor = RGBColor(38, 166, 91);
const LOSS_RED: RGBColor = RGBColor(214, 39, 40);

static HISTORY_UNAVAILABLE: &[u8] = include_bytes!("../../assets/history_unavailable.svg");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Cumulative,
    History,
    Eps,
}

impl ChartKind {
    fn prefix(&self) -> &'static str {
        match self {
            ChartKind::Cumulative => "cumulative",
            ChartKind::History => "history",
            ChartKind::Eps => "eps",
        }
    }

    pub fn file_name(&self, stamp: &str) -> String {
        format!("{}{}.svg", self.prefix(), stamp)
    }
}

fn plot_err<E: Debug>(err: E) -> anyhow::Error {
    anyhow!("Chart rendering failed: {err:?}")
}

/// Deletes earlier charts of `kind` and returns the path and file name for
/// a new one stamped with `stamp`.
pub fn prepare_chart(images_dir: &Path, kind: ChartKind, stamp: &str) -> Result<(PathBuf, String)> {
    std::fs::create_dir_all(images_dir)
        .with_context(|| format!("Failed to create directory: {}", images_dir.display()))?;
    for entry in std::fs::read_dir(images_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(kind.prefix()) && name.ends_with(".svg") {
            debug!("Removing old chart {}", name);
            std::fs::remove_file(entry.path())?;
        }
    }
    let file_name = kind.file_name(stamp);
    Ok((images_dir.join(&file_name), file_name))
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = if max > min {
        (max - min) * 0.05
    } else {
        max.abs().max(1.0) * 0.05
    };
    (min - pad)..(max + pad)
}

fn day_label(start: NaiveDate, offset: f64, format: &str) -> String {
    if offset < 0.0 {
        return String::new();
    }
    (start + Duration::days(offset.round() as i64))
        .format(format)
        .to_string()
}

/// Line chart of the running gain and loss over the tax year.
pub fn render_cumulative(series: &[DailyTotal], title: &str, path: &Path) -> Result<()> {
    let Some(first) = series.first() else {
        bail!("No gain or loss to chart");
    };
    let start = first.date;
    let x_end = (series.len() as f64 - 1.0).max(1.0);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT.into_font())
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(80)
        .build_cartesian_2d(
            0f64..x_end,
            padded_range(series.iter().map(|d| d.cumulative).chain([0.0])),
        )
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|x| day_label(start, *x, "%b %d"))
        .y_label_formatter(&|y| format!("{y:.0}"))
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(LineSeries::new(
            series
                .iter()
                .enumerate()
                .map(|(i, day)| (i as f64, day.cumulative)),
            LINE_BLUE.stroke_width(2),
        ))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Candlesticks of split and dividend adjusted prices above a volume panel.
/// Without bars the placeholder image is written instead.
pub fn render_history(bars: &[PriceBar], title: &str, path: &Path) -> Result<()> {
    if bars.is_empty() {
        debug!("No bars, writing placeholder to {}", path.display());
        std::fs::write(path, HISTORY_UNAVAILABLE)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let mut adjusted: Vec<PriceBar> = bars.iter().map(PriceBar::adjusted).collect();
    adjusted.sort_by_key(|bar| bar.date);
    let x_range = -1f64..adjusted.len() as f64;
    let candle_width = ((SIZE.0 as f64 * 0.8 / adjusted.len() as f64) * 0.7).max(1.0) as u32;
    let label = |x: &f64| -> String {
        if *x < 0.0 {
            return String::new();
        }
        adjusted
            .get(x.round() as usize)
            .map(|bar| bar.date.format("%b %d").to_string())
            .unwrap_or_default()
    };

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (upper, lower) = root.split_vertically(390);

    let mut prices = ChartBuilder::on(&upper)
        .caption(title, CAPTION_FONT.into_font())
        .margin(16)
        .x_label_area_size(0)
        .y_label_area_size(64)
        .build_cartesian_2d(
            x_range.clone(),
            padded_range(adjusted.iter().flat_map(|bar| [bar.low, bar.high])),
        )
        .map_err(plot_err)?;
    prices
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Price")
        .y_label_formatter(&|y| format!("{y:.2}"))
        .draw()
        .map_err(plot_err)?;
    prices
        .draw_series(adjusted.iter().enumerate().map(|(i, bar)| {
            CandleStick::new(
                i as f64,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                GAIN_GREEN.filled(),
                LOSS_RED.filled(),
                candle_width,
            )
        }))
        .map_err(plot_err)?;

    let max_volume = adjusted.iter().map(|bar| bar.volume).max().unwrap_or(0).max(1) as f64;
    let mut volume = ChartBuilder::on(&lower)
        .margin(16)
        .x_label_area_size(32)
        .y_label_area_size(64)
        .build_cartesian_2d(x_range, 0f64..max_volume * 1.1)
        .map_err(plot_err)?;
    volume
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(12)
        .x_label_formatter(&label)
        .y_desc("Volume")
        .y_label_formatter(&|v| format!("{:.1}M", v / 1e6))
        .draw()
        .map_err(plot_err)?;
    volume
        .draw_series(adjusted.iter().enumerate().map(|(i, bar)| {
            let x = i as f64;
            Rectangle::new(
                [(x - 0.35, 0.0), (x + 0.35, bar.volume as f64)],
                LINE_BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Grouped bars of expected against reported EPS per fiscal quarter.
pub fn render_eps(points: &[EpsPoint], title: &str, path: &Path) -> Result<()> {
    let mut dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    dates.sort();
    dates.dedup();
    if dates.is_empty() {
        bail!("No EPS to chart");
    }
    let slot = |date: NaiveDate| dates.iter().position(|d| *d == date).unwrap_or(0) as f64;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT.into_font())
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(64)
        .build_cartesian_2d(
            -0.5f64..(dates.len() as f64 - 0.5),
            padded_range(points.iter().filter_map(|p| p.value).chain([0.0])),
        )
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(dates.len() * 2 + 1)
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            dates
                .get(idx as usize)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .y_desc("EPS")
        .draw()
        .map_err(plot_err)?;

    for (kind, color, offset) in [
        (EpsKind::Expected, EXPECTED_ORANGE, -0.36),
        (EpsKind::Reported, LINE_BLUE, 0.0),
    ] {
        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.kind == kind)
                    .filter_map(|p| p.value.map(|v| (slot(p.date), v)))
                    .map(move |(x, v)| {
                        Rectangle::new([(x + offset, 0.0), (x + offset + 0.36, v)], color.filled())
                    }),
            )
            .map_err(plot_err)?
            .label(kind.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
