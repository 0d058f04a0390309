use plotters::coord::Shift;
use plotters::prelude::*;

use super::{AxisScale, Chart, FONT, VerticalMarker, dash_fractions, horizontal_segments, vertical_segments};
use crate::aggregate::stats::PowerLawFit;
use crate::error::Result;
use crate::utils::style::LineStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
}

#[derive(Debug, Clone)]
pub struct ScatterSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub marker: Marker,
}

/// Log-log scatter of one or more point sets, with an optional power-law fit
/// and a dotted `y = x` line. Each marker is drawn on both axes, since both
/// share a unit.
#[derive(Debug, Clone)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub series: Vec<ScatterSeries>,
    pub fit: Option<(PowerLawFit, String)>,
    pub equality: bool,
    pub markers: Vec<VerticalMarker>,
}

impl ScatterChart {
    /// Range covering every positive coordinate of `values`, padded to whole decades.
    pub fn decade_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| *v > 0.0 && v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() {
            return (1.0, 10.0);
        }
        let lo = 10f64.powf(lo.log10().floor());
        let hi = 10f64.powf(hi.log10().ceil());
        if lo < hi { (lo, hi) } else { (lo, lo * 10.0) }
    }

    fn in_range(&self, (x, y): (f64, f64)) -> bool {
        self.x_range.0 <= x && x <= self.x_range.1 && self.y_range.0 <= y && y <= self.y_range.1
    }

    /// Dotted diagonal over the overlap of both axes.
    fn equality_segments(&self) -> Vec<Vec<(f64, f64)>> {
        let lo = self.x_range.0.max(self.y_range.0);
        let hi = self.x_range.1.min(self.y_range.1);
        if lo >= hi {
            return Vec::new();
        }
        dash_fractions(LineStyle::Dotted)
            .into_iter()
            .map(|(a, b)| {
                let p = AxisScale::Log.interpolate(lo, hi, a);
                let q = AxisScale::Log.interpolate(lo, hi, b);
                vec![(p, p), (q, q)]
            })
            .collect()
    }

    /// Dashed segments of `marker` across both axes; empty when it lies outside them.
    fn marker_segments(&self, marker: &VerticalMarker) -> Vec<Vec<(f64, f64)>> {
        let (x_lo, x_hi) = self.x_range;
        let (y_lo, y_hi) = self.y_range;
        let mut segs = Vec::new();
        if x_lo <= marker.x && marker.x <= x_hi {
            segs.extend(vertical_segments(marker.x, y_lo, y_hi, AxisScale::Log, marker.line));
        }
        if y_lo <= marker.x && marker.x <= y_hi {
            segs.extend(horizontal_segments(marker.x, x_lo, x_hi, AxisScale::Log, marker.line));
        }
        segs
    }

    fn fit_curve(&self, fit: &PowerLawFit) -> Vec<(f64, f64)> {
        const STEPS: usize = 200;
        (0..=STEPS)
            .map(|i| AxisScale::Log.interpolate(self.x_range.0, self.x_range.1, i as f64 / STEPS as f64))
            .map(|x| (x, fit.evaluate(x)))
            .filter(|p| self.in_range(*p))
            .collect()
    }
}

impl Chart for ScatterChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), (FONT, 18))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (self.x_range.0..self.x_range.1).log_scale(),
                (self.y_range.0..self.y_range.1).log_scale(),
            )?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        for s in &self.series {
            let color = s.color;
            let points = s.points.iter().copied().filter(|p| self.in_range(*p));
            let anno = match s.marker {
                Marker::Circle => chart.draw_series(points.map(|p| Circle::new(p, 2, color.filled())))?,
                Marker::Square => chart.draw_series(points.map(|(x, y)| {
                    EmptyElement::at((x, y)) + Rectangle::new([(-2, -2), (2, 2)], color.filled())
                }))?,
            };
            anno.label(s.label.as_str())
                .legend(move |(x, y)| Circle::new((x + 6, y), 3, color.filled()));
        }

        for marker in &self.markers {
            let segs = self.marker_segments(marker);
            if segs.is_empty() {
                continue;
            }
            let color = marker.color;
            chart
                .draw_series(segs.into_iter().map(|seg| PathElement::new(seg, color.stroke_width(1))))?
                .label(marker.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(1)));
        }

        if let Some((fit, label)) = &self.fit {
            chart
                .draw_series(LineSeries::new(self.fit_curve(fit), BLACK.stroke_width(2)))?
                .label(label.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLACK.stroke_width(2)));
        }

        if self.equality {
            chart
                .draw_series(
                    self.equality_segments()
                        .into_iter()
                        .map(|seg| PathElement::new(seg, BLACK.stroke_width(1))),
                )?
                .label("equality")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLACK.stroke_width(1)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.7))
            .border_style(BLACK)
            .label_font((FONT, 11))
            .draw()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(x: (f64, f64), y: (f64, f64)) -> ScatterChart {
        ScatterChart {
            title: "s".into(),
            x_label: String::new(),
            y_label: String::new(),
            x_range: x,
            y_range: y,
            series: Vec::new(),
            fit: None,
            equality: true,
            markers: Vec::new(),
        }
    }

    #[test]
    fn decade_range_ignores_non_positive() {
        assert_eq!(ScatterChart::decade_range([0.0, -3.0, 2.0, 350.0]), (1.0, 1000.0));
        assert_eq!(ScatterChart::decade_range([100.0]), (100.0, 1000.0));
        assert_eq!(ScatterChart::decade_range([0.0]), (1.0, 10.0));
    }

    #[test]
    fn equality_line_on_axis_overlap() {
        let c = chart((1.0, 10_000.0), (10.0, 100_000.0));
        let segs = c.equality_segments();
        assert!(!segs.is_empty());
        assert!(segs.iter().flatten().all(|(x, y)| x == y && *x >= 10.0 - 1e-9 && *x <= 10_000.0 + 1e-6));

        assert!(chart((1.0, 10.0), (100.0, 1000.0)).equality_segments().is_empty());
    }

    #[test]
    fn markers_cross_both_axes_when_in_range() {
        let c = chart((1.0, 100.0), (10.0, 1000.0));
        let marker = |x: f64| VerticalMarker {
            x,
            label: String::new(),
            color: BLACK,
            line: LineStyle::Solid,
        };

        let both = c.marker_segments(&marker(50.0));
        assert_eq!(both.len(), 2);
        assert_eq!(both[0][0].0, 50.0);
        assert_eq!(both[1][0].1, 50.0);

        // only on the x axis
        let vertical = c.marker_segments(&marker(2.0));
        assert_eq!(vertical.len(), 1);
        assert!(vertical[0].iter().all(|(x, _)| *x == 2.0));

        assert!(c.marker_segments(&marker(5_000.0)).is_empty());
    }

    #[test]
    fn fit_curve_clipped_to_axes() {
        let c = chart((1.0, 10_000.0), (1.0, 100.0));
        let fit = PowerLawFit { exponent: 1.0, amplitude: 1.0, n: 2 };
        let curve = c.fit_curve(&fit);
        assert!(!curve.is_empty());
        assert!(curve.iter().all(|(_, y)| *y <= 100.0));
    }
}
