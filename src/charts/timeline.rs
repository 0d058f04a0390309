//! Date-axis charts: daily counts, per-quarter bars and stacked usage fractions.

use chrono::{NaiveDate, TimeDelta};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{AxisScale, Chart, FONT, dash_fractions, headroom, vertical_segments};
use crate::aggregate::bucket::{Bucket, BucketWidth};
use crate::aggregate::stats::CountSummary;
use crate::error::Result;
use crate::utils::style::{AnnotationEvent, BLACK, BLUE, EventSpan, LineStyle, PALETTE, RED};

/// Axis bounds for a day sequence; a single day is widened to two.
pub fn date_bounds(days: &[NaiveDate]) -> Option<(NaiveDate, NaiveDate)> {
    let lo = *days.first()?;
    let hi = *days.last()?;
    if lo < hi {
        Some((lo, hi))
    } else {
        Some((lo, lo.succ_opt().unwrap_or(lo)))
    }
}

/// Day a fraction `frac` of the way from `lo` to `hi`, rounded to whole days.
pub fn date_at(lo: NaiveDate, hi: NaiveDate, frac: f64) -> NaiveDate {
    let span = (hi - lo).num_days() as f64;
    lo + TimeDelta::days((span * frac).round() as i64)
}

/// Horizontal line at `y` across `[lo, hi]` dates.
fn horizontal_date_segments(y: f64, lo: NaiveDate, hi: NaiveDate, line: LineStyle) -> Vec<Vec<(NaiveDate, f64)>> {
    dash_fractions(line)
        .into_iter()
        .map(|(a, b)| vec![(date_at(lo, hi, a), y), (date_at(lo, hi, b), y)])
        .filter(|seg| seg[0].0 < seg[1].0 || line == LineStyle::Solid)
        .collect()
}

/// Event marks: shaded spans for intervals, styled vertical lines for instants.
/// Only events inside `[lo, hi]` are drawn.
fn draw_events<DB, X, Y>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<X, Y>>,
    events: &[AnnotationEvent],
    (lo, hi): (NaiveDate, NaiveDate),
    (floor, top): (f64, f64),
) -> Result<()>
where
    DB: DrawingBackend,
    X: Ranged<ValueType = NaiveDate>,
    Y: Ranged<ValueType = f64>,
{
    for event in events {
        let start = event.span.start().date_naive();
        let end = event.span.end().date_naive();
        if start < lo || end > hi {
            continue;
        }
        let color = event.style.color;

        let series = match event.span {
            EventSpan::Interval(..) => {
                let fill = color.mix(event.style.alpha);
                chart.draw_series(std::iter::once(Rectangle::new([(start, floor), (end, top)], fill.filled())))?
            }
            EventSpan::Instant(_) => chart.draw_series(
                vertical_segments(start, floor, top, AxisScale::Linear, event.style.line)
                    .into_iter()
                    .map(|seg| PathElement::new(seg, color.stroke_width(1))),
            )?,
        };
        series
            .label(event.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    }
    Ok(())
}

fn draw_legend<'a, DB, X, Y>(chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>) -> Result<()>
where
    DB: DrawingBackend + 'a,
    X: Ranged,
    Y: Ranged,
{
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.7))
        .border_style(BLACK)
        .label_font((FONT, 11))
        .draw()?;
    Ok(())
}

/// Requests per day as a line, with mean and median levels and events.
#[derive(Debug, Clone)]
pub struct DailyChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub days: Vec<NaiveDate>,
    pub counts: Vec<u64>,
    pub summary: CountSummary,
    pub events: Vec<AnnotationEvent>,
}

impl Chart for DailyChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let Some((lo, hi)) = date_bounds(&self.days) else {
            return Ok(());
        };
        let max = self.counts.iter().copied().max().unwrap_or(0) as f64;
        let top = headroom(max, AxisScale::Linear);

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, 0f64..top)?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .x_label_formatter(&|d| d.format("%Y-%m").to_string())
            .draw()?;

        draw_events(&mut chart, &self.events, (lo, hi), (0.0, top))?;

        chart
            .draw_series(LineSeries::new(
                self.days.iter().zip(&self.counts).map(|(d, c)| (*d, *c as f64)),
                BLUE.stroke_width(1),
            ))?
            .label(self.y_label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE.stroke_width(2)));

        let levels = [
            (self.summary.mean as f64, format!("mean ({})", self.summary.mean), RED, LineStyle::Dashed),
            (self.summary.median as f64, format!("median ({})", self.summary.median), BLACK, LineStyle::Dashed),
        ];
        for (y, label, color, line) in levels {
            chart
                .draw_series(
                    horizontal_date_segments(y, lo, hi, line)
                        .into_iter()
                        .map(|seg| PathElement::new(seg, color.stroke_width(2))),
                )?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
        }

        draw_legend(&mut chart)
    }
}

/// Request count per quarter (or year) as bars spanning each bucket.
#[derive(Debug, Clone)]
pub struct BucketBarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: BucketWidth,
    pub buckets: Vec<Bucket>,
}

impl BucketBarChart {
    /// `(start, end, count)` per bucket.
    pub fn bars(&self) -> Vec<(NaiveDate, NaiveDate, u64)> {
        self.buckets
            .iter()
            .map(|b| (b.date(), self.width.next_date(b.date()), b.count))
            .collect()
    }
}

impl Chart for BucketBarChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let bars = self.bars();
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Ok(());
        };
        let (lo, hi) = (first.0, last.1);
        let max = bars.iter().map(|b| b.2).max().unwrap_or(0) as f64;

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, 0f64..headroom(max, AxisScale::Linear))?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .x_label_formatter(&|d| d.format("%Y-%m").to_string())
            .draw()?;

        chart.draw_series(bars.iter().map(|(start, end, count)| {
            // one-day gap keeps neighbouring bars apart
            let right = end.pred_opt().unwrap_or(*end);
            Rectangle::new([(*start, 0.0), (right, *count as f64)], BLUE.mix(0.8).filled())
        }))?;
        Ok(())
    }
}

/// Stacked shares of several services; `layers` are cumulative, bottom first.
#[derive(Debug, Clone)]
pub struct FractionChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub days: Vec<NaiveDate>,
    pub layers: Vec<(String, Vec<f64>)>,
    pub events: Vec<AnnotationEvent>,
}

impl Chart for FractionChart {
    fn title(&self) -> &str {
        &self.title
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let Some((lo, hi)) = date_bounds(&self.days) else {
            return Ok(());
        };
        let top = 1.1;

        let mut chart = ChartBuilder::on(root)
            .caption(self.title.as_str(), (FONT, 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(lo..hi, 0f64..top)?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .x_label_formatter(&|d| d.format("%Y-%m").to_string())
            .draw()?;

        // Largest cumulative layer first so the smaller ones paint over it.
        for (i, (label, layer)) in self.layers.iter().enumerate().rev() {
            let color = PALETTE[i % PALETTE.len()];
            chart
                .draw_series(AreaSeries::new(
                    self.days.iter().zip(layer).map(|(d, v)| (*d, *v)),
                    0.0,
                    color.mix(0.85).filled(),
                ))?
                .label(label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        draw_events(&mut chart, &self.events, (lo, hi), (0.0, top))?;
        draw_legend(&mut chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn bounds_and_interpolation() {
        assert_eq!(date_bounds(&[]), None);
        assert_eq!(date_bounds(&[day(2020, 1, 1)]), Some((day(2020, 1, 1), day(2020, 1, 2))));
        assert_eq!(date_at(day(2020, 1, 1), day(2020, 1, 11), 0.5), day(2020, 1, 6));
        assert_eq!(date_at(day(2020, 1, 1), day(2020, 1, 11), 1.0), day(2020, 1, 11));
    }

    #[test]
    fn quarter_bars_span_their_bucket() {
        let chart = BucketBarChart {
            title: "q".into(),
            x_label: String::new(),
            y_label: String::new(),
            width: BucketWidth::Quarter,
            buckets: vec![
                Bucket { start: Utc.with_ymd_and_hms(2017, 10, 1, 0, 0, 0).unwrap(), count: 3 },
                Bucket { start: Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(), count: 0 },
            ],
        };
        assert_eq!(
            chart.bars(),
            vec![(day(2017, 10, 1), day(2018, 1, 1), 3), (day(2018, 1, 1), day(2018, 4, 1), 0)]
        );
    }

    #[test]
    fn dashed_level_has_gaps() {
        let segs = horizontal_date_segments(5.0, day(2010, 1, 1), day(2020, 1, 1), LineStyle::Dashed);
        assert!(segs.len() > 10);
        assert!(segs.iter().all(|s| s[0].1 == 5.0 && s[0].0 < s[1].0));
        assert_eq!(horizontal_date_segments(1.0, day(2010, 1, 1), day(2010, 1, 1), LineStyle::Solid).len(), 1);
    }
}
