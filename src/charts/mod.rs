//! Static charts (plotters) and the interactive usage page (plotly).
//!
//! Each chart is a plain value holding already-aggregated data; drawing never
//! computes statistics. `save_chart` picks the backend from the image format.

pub mod bars;
pub mod dashboard;
pub mod histogram;
pub mod scatter;
pub mod timeline;

use std::{fs::create_dir_all, path::Path};

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::ImageFormat;
use crate::error::{AnalysisError, Result};
use crate::utils::style::LineStyle;

pub const DEFAULT_SIZE: (u32, u32) = (1000, 500);
pub const SQUARE_SIZE: (u32, u32) = (800, 800);

pub(crate) const FONT: &str = "sans-serif";

pub trait Chart {
    fn title(&self) -> &str;

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

/// Renders `chart` to `path`, creating parent directories as needed.
pub fn save_chart<C: Chart>(chart: &C, path: &Path, format: ImageFormat, size: (u32, u32)) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))?;
    }

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            chart.draw(&root)?;
            root.present()?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            chart.draw(&root)?;
            root.present()?;
        }
    }

    info!("Chart '{}' saved to {:?}", chart.title(), path);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Log,
}

impl AxisScale {
    /// Axis value a fraction `frac` of the way from `lo` to `hi`, as drawn.
    pub fn interpolate(&self, lo: f64, hi: f64, frac: f64) -> f64 {
        match self {
            AxisScale::Linear => lo + (hi - lo) * frac,
            AxisScale::Log => {
                let (a, b) = (lo.log10(), hi.log10());
                10f64.powf(a + (b - a) * frac)
            }
        }
    }
}

/// Visible pieces of a styled line as `(from, to)` fractions of its length.
pub fn dash_fractions(line: LineStyle) -> Vec<(f64, f64)> {
    let Some((dash, gap)) = line.pattern() else {
        return vec![(0.0, 1.0)];
    };
    let mut out = Vec::new();
    let mut at = 0.0;
    while at < 1.0 {
        out.push((at, (at + dash).min(1.0)));
        at += dash + gap;
    }
    out
}

/// A vertical line across the plot at `x`, e.g. a reference duration or a mean.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalMarker {
    pub x: f64,
    pub label: String,
    pub color: RGBColor,
    pub line: LineStyle,
}

/// Segments of a vertical line at `x` spanning `[lo, hi]` on a `scale` y axis.
pub(crate) fn vertical_segments<X: Copy>(
    x: X,
    lo: f64,
    hi: f64,
    scale: AxisScale,
    line: LineStyle,
) -> Vec<Vec<(X, f64)>> {
    dash_fractions(line)
        .into_iter()
        .map(|(a, b)| vec![(x, scale.interpolate(lo, hi, a)), (x, scale.interpolate(lo, hi, b))])
        .collect()
}

/// Segments of a horizontal line at `y` spanning `[lo, hi]` on a `scale` x axis.
pub(crate) fn horizontal_segments(y: f64, lo: f64, hi: f64, scale: AxisScale, line: LineStyle) -> Vec<Vec<(f64, f64)>> {
    dash_fractions(line)
        .into_iter()
        .map(|(a, b)| vec![(scale.interpolate(lo, hi, a), y), (scale.interpolate(lo, hi, b), y)])
        .collect()
}

/// Padding above the tallest value, linear or multiplicative for log axes.
pub(crate) fn headroom(max: f64, scale: AxisScale) -> f64 {
    match scale {
        AxisScale::Linear => (max * 1.1).max(1.0),
        AxisScale::Log => (max * 2.0).max(10.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_line_is_one_piece() {
        assert_eq!(dash_fractions(LineStyle::Solid), vec![(0.0, 1.0)]);
    }

    #[test]
    fn dashes_stay_inside_and_leave_gaps() {
        for line in [LineStyle::Dashed, LineStyle::Dotted] {
            let pieces = dash_fractions(line);
            assert!(pieces.len() > 10);
            assert!(pieces.iter().all(|(a, b)| 0.0 <= *a && a < b && *b <= 1.0));
            assert!(pieces.windows(2).all(|w| w[0].1 < w[1].0));
        }
    }

    #[test]
    fn log_interpolation_is_geometric() {
        assert_eq!(AxisScale::Linear.interpolate(0.0, 10.0, 0.25), 2.5);
        let mid = AxisScale::Log.interpolate(1.0, 10_000.0, 0.5);
        assert!((mid - 100.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_segments_span_the_axis() {
        let segs = vertical_segments(3.0, 1.0, 100.0, AxisScale::Log, LineStyle::Solid);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0][0], (3.0, 1.0));
        assert!((segs[0][1].1 - 100.0).abs() < 1e-9);
    }
}
