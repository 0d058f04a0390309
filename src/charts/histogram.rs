use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use super::{AxisScale, Chart, FONT, VerticalMarker, headroom, vertical_segments};
use crate::aggregate::stats::Histogram;
use crate::error::Result;
use crate::utils::style::BLUE;

/// Binned counts drawn as adjoining bars, with optional vertical markers.
#[derive(Debug, Clone)]
pub struct HistogramChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend: String,
    pub histogram: Histogram,
    pub y_scale: AxisScale,
    pub markers: Vec<VerticalMarker>,
}

impl HistogramChart {
    pub fn new(title: impl Into<String>, histogram: Histogram) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: "number".to_string(),
            legend: String::new(),
            histogram,
            y_scale: AxisScale::Linear,
            markers: Vec::new(),
        }
    }

    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = legend.into();
        self
    }

    pub fn log_y(mut self) -> Self {
        self.y_scale = AxisScale::Log;
        self
    }

    pub fn markers(mut self, markers: Vec<VerticalMarker>) -> Self {
        self.markers = markers;
        self
    }

    fn x_range(&self) -> (f64, f64) {
        match (self.histogram.edges.first(), self.histogram.edges.last()) {
            (Some(&lo), Some(&hi)) if lo < hi => (lo, hi),
            _ => (0.0, 1.0),
        }
    }

    /// `(floor, top)` of the count axis.
    fn y_range(&self) -> (f64, f64) {
        let floor = match self.y_scale {
            AxisScale::Linear => 0.0,
            AxisScale::Log => 0.5,
        };
        (floor, headroom(self.histogram.max_count() as f64, self.y_scale))
    }

    fn draw_content<'a, DB, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
    ) -> Result<()>
    where
        DB: DrawingBackend + 'a,
        Y: Ranged<ValueType = f64>,
    {
        let (floor, top) = self.y_range();
        let bars = self
            .histogram
            .bins()
            .filter(|(_, _, c)| *c > 0)
            .map(|(lo, hi, c)| Rectangle::new([(lo, floor), (hi, c as f64)], BLUE.mix(0.8).filled()));

        let series = chart.draw_series(bars)?;
        if !self.legend.is_empty() {
            series
                .label(self.legend.as_str())
                .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], BLUE.mix(0.8).filled()));
        }

        let (lo, hi) = self.x_range();
        for marker in self.markers.iter().filter(|m| lo <= m.x && m.x <= hi) {
            let color = marker.color;
            let series = chart.draw_series(
                vertical_segments(marker.x, floor, top, self.y_scale, marker.line)
                    .into_iter()
                    .map(|seg| PathElement::new(seg, color.stroke_width(2))),
            )?;
            if !marker.label.is_empty() {
                series
                    .label(marker.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
            }
        }

        let labelled = !self.legend.is_empty() || self.markers.iter().any(|m| !m.label.is_empty());
        if !labelled {
            return Ok(());
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, 12))
            .draw()?;
        Ok(())
    }
}

impl Chart for HistogramChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;

        let (x_lo, x_hi) = self.x_range();
        let (floor, top) = self.y_range();

        let mut builder = ChartBuilder::on(root);
        builder
            .caption(self.title.as_str(), (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60);

        match self.y_scale {
            AxisScale::Linear => {
                let mut chart = builder.build_cartesian_2d(x_lo..x_hi, floor..top)?;
                chart
                    .configure_mesh()
                    .x_desc(self.x_label.as_str())
                    .y_desc(self.y_label.as_str())
                    .draw()?;
                self.draw_content(&mut chart)
            }
            AxisScale::Log => {
                let mut chart = builder.build_cartesian_2d(x_lo..x_hi, (floor..top).log_scale())?;
                chart
                    .configure_mesh()
                    .x_desc(self.x_label.as_str())
                    .y_desc(self.y_label.as_str())
                    .draw()?;
                self.draw_content(&mut chart)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::stats::histogram;

    #[test]
    fn ranges_follow_histogram_and_scale() {
        let h = histogram(&[0.0, 1.0, 1.0, 4.0], 4);
        let chart = HistogramChart::new("t", h.clone());
        assert_eq!(chart.x_range(), (0.0, 4.0));
        assert_eq!(chart.y_range(), (0.0, 2.2));

        let chart = HistogramChart::new("t", h).log_y();
        assert_eq!(chart.y_range(), (0.5, 10.0));

        let empty = HistogramChart::new("t", histogram(&[], 10));
        assert_eq!(empty.x_range(), (0.0, 1.0));
    }
}
