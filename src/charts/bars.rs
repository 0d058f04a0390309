use plotters::coord::Shift;
use plotters::prelude::*;

use super::{AxisScale, Chart, FONT, headroom};
use crate::error::Result;
use crate::utils::style::BLUE;

/// One bar per named category, in the given order.
#[derive(Debug, Clone)]
pub struct RankedBarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<(String, u64)>,
}

impl Chart for RankedBarChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        if self.bars.is_empty() {
            return Ok(());
        }

        let n = self.bars.len() as u32;
        let max = self.bars.iter().map(|(_, c)| *c).max().unwrap_or(0);
        let top = headroom(max as f64, AxisScale::Linear).ceil() as u64;

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), (FONT, 20))
            .margin(10)
            .x_label_area_size(90)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u64..top)?;

        let label_of = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => self.bars.get(*i as usize).map(|(name, _)| name.clone()).unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(self.bars.len())
            .x_label_formatter(&label_of)
            .x_label_style(
                (FONT, 10)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.8).filled())
                .margin(2)
                .data(self.bars.iter().enumerate().map(|(i, (_, c))| (i as u32, *c))),
        )?;
        Ok(())
    }
}
