//! The per-product chart set: topicality, duration and request-count charts.
//!
//! `analyze_requests` turns prepared data into chart values (pure, testable);
//! `render_requests` writes them to disk.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::aggregate::bucket::{BucketWidth, bucket_counts, counts};
use crate::aggregate::stats::{CountSummary, calculate_stats, histogram, summarize_counts};
use crate::charts::histogram::HistogramChart;
use crate::charts::scatter::{Marker, ScatterChart, ScatterSeries};
use crate::charts::timeline::{BucketBarChart, DailyChart};
use crate::charts::{Chart, DEFAULT_SIZE, SQUARE_SIZE, VerticalMarker, save_chart};
use crate::config::{
    BINS_PER_DAY, DAILY_COUNT_BINS, HISTOGRAM_BINS, LONG_DURATION_DAYS, PipelineConfig, SHORT_DURATION_DAYS,
    SHORT_TOPICALITY_DAYS,
};
use crate::error::Result;
use crate::prepare::derive::{DerivedQuantities, TimeUnit};
use crate::prepare::job::{Prepared, load_prepared};
use crate::utils::artifacts::ArtifactStore;
use crate::utils::style::{
    AnnotationConfig, BLUE, BLACK, DURATION, LineStyle, RED, ReferenceLines, TOPICALITY, T_END, T_REQUEST,
    T_START, count_label, difference_subtitle, quantity_label, total_label,
};

/// Bins per unit in the short duration histograms.
const SHORT_DURATION_BINS_PER_UNIT: f64 = 2.0;

#[derive(Debug, Clone)]
pub enum PlannedChart {
    Histogram(HistogramChart),
    Daily(DailyChart),
    Bars(BucketBarChart),
    Scatter(ScatterChart),
}

impl PlannedChart {
    pub fn title(&self) -> &str {
        match self {
            PlannedChart::Histogram(c) => c.title(),
            PlannedChart::Daily(c) => c.title(),
            PlannedChart::Bars(c) => c.title(),
            PlannedChart::Scatter(c) => c.title(),
        }
    }

    pub fn save(&self, config: &PipelineConfig, path: &std::path::Path) -> Result<()> {
        match self {
            PlannedChart::Histogram(c) => save_chart(c, path, config.format, DEFAULT_SIZE),
            PlannedChart::Daily(c) => save_chart(c, path, config.format, DEFAULT_SIZE),
            PlannedChart::Bars(c) => save_chart(c, path, config.format, DEFAULT_SIZE),
            PlannedChart::Scatter(c) => save_chart(c, path, config.format, SQUARE_SIZE),
        }
    }
}

/// A chart and the name its image is filed under.
#[derive(Debug, Clone)]
pub struct ChartPlan {
    pub name: String,
    pub chart: PlannedChart,
}

#[derive(Debug, Clone, Default)]
pub struct RequestAnalysis {
    pub plans: Vec<ChartPlan>,
    /// Records left after the restriction (window products only).
    pub restricted: Option<usize>,
    pub daily: Option<CountSummary>,
    /// Charts not produced, with the reason.
    pub skipped: Vec<String>,
}

impl RequestAnalysis {
    fn push(&mut self, name: &str, chart: PlannedChart) {
        self.plans.push(ChartPlan {
            name: name.to_string(),
            chart,
        });
    }

    fn skip(&mut self, name: &str, reason: &str) {
        warn!("Skipping chart '{}': {}", name, reason);
        self.skipped.push(format!("{}: {}", name, reason));
    }

    pub fn names(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.name.as_str()).collect()
    }

    /// `label (category)` of every event marked on the daily chart.
    pub fn event_notes(&self) -> Vec<String> {
        self.plans
            .iter()
            .filter_map(|p| match &p.chart {
                PlannedChart::Daily(d) => Some(&d.events),
                _ => None,
            })
            .flatten()
            .map(|e| format!("{} ({})", e.label, e.category.name()))
            .collect()
    }
}

/// Builds every chart the product's layout supports.
pub fn analyze_requests(config: &PipelineConfig, prepared: &Prepared, annotations: &AnnotationConfig) -> RequestAnalysis {
    let mut out = RequestAnalysis::default();
    let data_type = config.data_type();

    match prepared {
        Prepared::Window(derived) => {
            let restricted = config.restriction.apply(derived, config.topicality);
            out.restricted = Some(restricted.len());
            if restricted.is_empty() {
                out.skip("topicality", &format!("no {} records", data_type));
                out.skip("duration", &format!("no {} records", data_type));
            } else {
                let subtitle = difference_subtitle(TOPICALITY.0, T_REQUEST, config.observation_symbol);
                topicality_charts(config, &restricted.topicality, &subtitle, &annotations.reference_lines, &mut out);
                duration_charts(config, &restricted.durations, &annotations.reference_lines, &mut out);
                out.push(
                    "scatter_duration_vs_topicality",
                    PlannedChart::Scatter(duration_vs_topicality(
                        config,
                        &restricted.durations,
                        &restricted.topicality,
                        &annotations.reference_lines,
                    )),
                );
            }
        }
        Prepared::Point(point) => {
            if point.topicality.is_empty() {
                out.skip("topicality", &format!("no {} records", data_type));
            } else {
                let subtitle = difference_subtitle(TOPICALITY.0, T_REQUEST, config.observation_symbol);
                topicality_charts(config, &point.topicality, &subtitle, &annotations.reference_lines, &mut out);
            }
        }
        Prepared::Timestamps(_) => {}
    }

    count_charts(config, prepared.request_times(), annotations, &mut out);
    out
}

fn reference_markers(lines: &ReferenceLines, lo_seconds: f64, hi_seconds: f64, unit: TimeUnit) -> Vec<VerticalMarker> {
    lines
        .relevant(lo_seconds, hi_seconds)
        .into_iter()
        .map(|l| VerticalMarker {
            x: unit.convert(l.seconds),
            label: l.label.to_string(),
            color: l.color,
            line: l.line,
        })
        .collect()
}

fn topicality_charts(
    config: &PipelineConfig,
    topicality: &[f64],
    subtitle: &str,
    lines: &ReferenceLines,
    out: &mut RequestAnalysis,
) {
    let data_type = config.data_type();
    let plural = config.product.plural();

    let unit = TimeUnit::Year;
    let years: Vec<f64> = topicality.iter().map(|&s| unit.convert(s)).collect();
    out.push(
        "topicality",
        PlannedChart::Histogram(
            HistogramChart::new(format!("{}: {}", data_type, subtitle), histogram(&years, HISTOGRAM_BINS))
                .labels(quantity_label(TOPICALITY.1, TOPICALITY.0, unit), count_label(years.len(), plural))
                .log_y(),
        ),
    );

    let name = format!("topicality_{} d", SHORT_TOPICALITY_DAYS);
    let unit = TimeUnit::Day;
    let limit = SHORT_TOPICALITY_DAYS * unit.seconds();
    let short: Vec<f64> = topicality.iter().filter(|&&s| s <= limit).map(|&s| unit.convert(s)).collect();
    if short.is_empty() {
        out.skip(&name, "no topicality within the short range");
        return;
    }
    let bins = (SHORT_TOPICALITY_DAYS as usize) * BINS_PER_DAY;
    out.push(
        &name,
        PlannedChart::Histogram(
            HistogramChart::new(
                format!("{}: {} <= {} d", data_type, subtitle, SHORT_TOPICALITY_DAYS),
                histogram(&short, bins),
            )
            .labels(quantity_label(TOPICALITY.1, TOPICALITY.0, unit), count_label(short.len(), plural))
            .markers(reference_markers(lines, 0.0, limit, unit))
            .log_y(),
        ),
    );
}

fn duration_charts(config: &PipelineConfig, durations: &[f64], lines: &ReferenceLines, out: &mut RequestAnalysis) {
    let data_type = config.data_type();
    let plural = config.product.plural();
    let subtitle = difference_subtitle(DURATION.0, T_END, T_START);

    let unit = TimeUnit::Year;
    let years: Vec<f64> = durations.iter().map(|&s| unit.convert(s)).collect();
    out.push(
        "duration",
        PlannedChart::Histogram(
            HistogramChart::new(format!("{}: {}", data_type, subtitle), histogram(&years, HISTOGRAM_BINS))
                .labels(quantity_label(DURATION.1, DURATION.0, unit), count_label(years.len(), plural))
                .log_y(),
        ),
    );

    for (limit_days, unit) in [(SHORT_DURATION_DAYS, TimeUnit::Hour), (LONG_DURATION_DAYS, TimeUnit::Day)] {
        let name = format!("duration_{} d", limit_days);
        let limit = limit_days * TimeUnit::Day.seconds();
        let short: Vec<f64> = durations.iter().filter(|&&s| s < limit).map(|&s| unit.convert(s)).collect();
        if short.is_empty() {
            out.skip(&name, "no durations within the short range");
            continue;
        }
        let bins = (unit.convert(limit) * SHORT_DURATION_BINS_PER_UNIT).round() as usize;
        out.push(
            &name,
            PlannedChart::Histogram(
                HistogramChart::new(format!("{}: {} < {} d", data_type, subtitle, limit_days), histogram(&short, bins))
                    .labels(quantity_label(DURATION.1, DURATION.0, unit), count_label(short.len(), plural))
                    .markers(reference_markers(lines, 0.0, limit, unit))
                    .log_y(),
            ),
        );
    }
}

fn duration_vs_topicality(
    config: &PipelineConfig,
    durations: &[f64],
    topicality: &[f64],
    lines: &ReferenceLines,
) -> ScatterChart {
    let unit = TimeUnit::Day;
    let points: Vec<(f64, f64)> = durations
        .iter()
        .zip(topicality)
        .map(|(&d, &t)| (unit.convert(d), unit.convert(t)))
        .filter(|(d, t)| *d > 0.0 && *t > 0.0)
        .collect();
    let x_range = ScatterChart::decade_range(points.iter().map(|p| p.0));
    let y_range = ScatterChart::decade_range(points.iter().map(|p| p.1));
    let lo = x_range.0.min(y_range.0) * unit.seconds();
    let hi = x_range.1.max(y_range.1) * unit.seconds();

    ScatterChart {
        title: format!("{}: {} total", config.data_type(), durations.len()),
        x_label: quantity_label(DURATION.1, DURATION.0, unit),
        y_label: quantity_label(TOPICALITY.1, TOPICALITY.0, unit),
        x_range,
        y_range,
        series: vec![ScatterSeries {
            label: config.product.plural().to_string(),
            points,
            color: BLUE,
            marker: Marker::Circle,
        }],
        fit: None,
        equality: true,
        markers: reference_markers(lines, lo, hi, unit),
    }
}

fn count_charts(
    config: &PipelineConfig,
    request_times: &[DateTime<Utc>],
    annotations: &AnnotationConfig,
    out: &mut RequestAnalysis,
) {
    let (Some(&first), Some(&last)) = (request_times.iter().min(), request_times.iter().max()) else {
        out.skip("requests", "no valid request times");
        return;
    };
    let app = config.application.name();
    let plural = config.product.plural();
    let y_label = count_label(request_times.len(), plural);

    let title = format!("{} {} per quarter", app, plural);
    out.push(
        &title,
        PlannedChart::Bars(BucketBarChart {
            title: title.clone(),
            x_label: "date".to_string(),
            y_label: y_label.clone(),
            width: BucketWidth::Quarter,
            buckets: bucket_counts(request_times, BucketWidth::Quarter),
        }),
    );

    let daily = bucket_counts(request_times, BucketWidth::Day);
    let per_day = counts(&daily);
    let summary = summarize_counts(&per_day);
    out.daily = Some(summary);

    let events = annotations
        .events
        .select_within(config.application.daily_events(), first, last)
        .into_iter()
        .cloned()
        .collect();
    let title = format!("{} daily {} requested ({})", app, plural, config.count_symbol);
    out.push(
        &title,
        PlannedChart::Daily(DailyChart {
            title: title.clone(),
            x_label: format!("date ({} - {})", first.date_naive(), last.date_naive()),
            y_label,
            days: daily.iter().map(|b| b.date()).collect(),
            counts: per_day.clone(),
            summary,
            events,
        }),
    );

    let values: Vec<f64> = per_day.iter().map(|&c| c as f64).collect();
    let markers = vec![
        VerticalMarker {
            x: summary.mean as f64,
            label: format!("mean ({})", summary.mean),
            color: RED,
            line: LineStyle::Dashed,
        },
        VerticalMarker {
            x: summary.median as f64,
            label: format!("median ({})", summary.median),
            color: BLACK,
            line: LineStyle::Dashed,
        },
    ];
    out.push(
        "histogram_number_per_day",
        PlannedChart::Histogram(
            HistogramChart::new(
                format!(
                    "distribution of number of {} per day {}",
                    config.data_analyzed(),
                    total_label(summary.total as usize, "total")
                ),
                histogram(&values, DAILY_COUNT_BINS),
            )
            .labels(
                format!("number of {} per day ({})", plural, config.count_symbol),
                format!("number of days {}", total_label(per_day.len(), "total")),
            )
            .legend(plural)
            .markers(markers)
            .log_y(),
        ),
    );
}

/// Writes every planned chart under the product's image directory.
pub fn render_requests(config: &PipelineConfig, analysis: &RequestAnalysis) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(analysis.plans.len());
    for plan in &analysis.plans {
        let path = config.image_path(&format!("{} {}", config.data_type(), plan.name));
        plan.chart.save(config, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Loads prepared artifacts for `config`, draws its chart set and prints a summary.
pub fn run_request_analysis(config: &PipelineConfig, annotations: &AnnotationConfig) -> Result<Vec<PathBuf>> {
    let store = ArtifactStore::new(&config.derived_dir);
    let prepared = load_prepared(config, &store)?;
    info!("Analyzing {} ({} records)", config.data_type(), prepared.len());

    let analysis = analyze_requests(config, &prepared, annotations);
    print_summary(config, &prepared, &analysis);
    render_requests(config, &analysis)
}

fn print_summary(config: &PipelineConfig, prepared: &Prepared, analysis: &RequestAnalysis) {
    println!("\n{}", config.data_type().to_uppercase());
    println!("{}", "=".repeat(40));
    println!("  {:<22} {:>12}", "valid records", prepared.len());
    if let Some(n) = analysis.restricted {
        println!("  {:<22} {:>12}", config.restriction.name(), n);
    }
    if let Some(daily) = analysis.daily {
        println!("  {:<22} {:>12}", "days", daily.buckets);
        println!("  {:<22} {:>12}", "mean per day", daily.mean);
        println!("  {:<22} {:>12}", "median per day", daily.median);
    }
    if let Prepared::Window(derived) = prepared {
        print_window_stats(config, derived);
    }
    for note in analysis.event_notes() {
        println!("  {:<22} {}", "event", note);
    }
    println!("  {:<22} {:>12}", "charts", analysis.plans.len());
    for skipped in &analysis.skipped {
        println!("  skipped: {}", skipped);
    }
    println!();
}

fn print_window_stats(config: &PipelineConfig, derived: &DerivedQuantities) {
    let unit = TimeUnit::Day;
    let columns = [(DURATION.1, &derived.durations[..]), (TOPICALITY.1, derived.topicality(config.topicality))];
    for (name, seconds) in columns {
        let days: Vec<f64> = seconds.iter().map(|&s| unit.convert(s)).collect();
        let Some(stats) = calculate_stats(&days) else {
            continue;
        };
        println!(
            "  {:<22} min {:.2} / median {:.2} / mean {:.2} / max {:.2} ({})",
            name,
            stats.min,
            stats.median,
            stats.mean,
            stats.max,
            unit.name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::restriction::Restriction;
    use crate::config::ImageFormat;
    use crate::prepare::derive::{PointTopicality, derive_windows};
    use crate::prepare::timestamps::parse_timestamps;

    fn movies() -> Prepared {
        let request = ["2020-01-01T01:00:00", "2020-01-01T03:00:00", "2020-01-03T12:00:00", "garbage"];
        let start = ["2020-01-01T00:00:00", "2020-01-01T00:00:00", "2019-12-01T00:00:00", "2020-01-01T00:00:00"];
        let end = ["2020-01-01T02:00:00", "2020-01-01T02:00:00", "2019-12-31T00:00:00", "2020-01-01T02:00:00"];
        Prepared::Window(derive_windows(
            &parse_timestamps(request),
            &parse_timestamps(start),
            &parse_timestamps(end),
        ))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::hvorg_movies()
            .with_dirs("/src", "/derived", "/img")
            .with_format(ImageFormat::Svg)
    }

    #[test]
    fn window_products_get_the_full_set() {
        let analysis = analyze_requests(&config(), &movies(), &AnnotationConfig::helioviewer());

        assert_eq!(analysis.restricted, Some(2));
        let names = analysis.names();
        for expected in [
            "topicality",
            "topicality_30 d",
            "duration",
            "duration_2 d",
            "duration_30 d",
            "scatter_duration_vs_topicality",
            "histogram_number_per_day",
        ] {
            assert!(names.contains(&expected), "missing {expected} in {names:?}");
        }
        assert!(names.iter().any(|n| n.contains("per quarter")));
        assert!(names.iter().any(|n| n.contains("daily")));

        let daily = analysis.daily.unwrap();
        assert_eq!(daily.buckets, 3);
        assert_eq!(daily.total, 3);
    }

    #[test]
    fn empty_restriction_skips_window_charts() {
        let config = config().with_restriction(Restriction::Observable);
        let request = ["2020-01-01T01:00:00"];
        let start = ["2020-01-01T00:00:00"];
        let end = ["2020-01-01T02:00:00"];
        let prepared = Prepared::Window(derive_windows(
            &parse_timestamps(request),
            &parse_timestamps(start),
            &parse_timestamps(end),
        ));

        let analysis = analyze_requests(&config, &prepared, &AnnotationConfig::helioviewer());
        assert_eq!(analysis.restricted, Some(0));
        assert!(!analysis.names().contains(&"topicality"));
        assert_eq!(analysis.skipped.len(), 2);
        // counts still drawn from the request instants
        assert!(analysis.names().contains(&"histogram_number_per_day"));
    }

    #[test]
    fn point_and_timestamp_products() {
        let times = parse_timestamps(["2020-01-01", "2020-02-01"]).valid();
        let point = Prepared::Point(PointTopicality {
            request_times: times.clone(),
            topicality: vec![86_400.0, 3.0 * 86_400.0],
            dropped: 0,
        });
        let cfg = PipelineConfig::hvorg_screenshots();
        let names: Vec<String> = analyze_requests(&cfg, &point, &AnnotationConfig::helioviewer())
            .names()
            .into_iter()
            .map(String::from)
            .collect();
        assert!(names.contains(&"topicality".to_string()));
        assert!(!names.contains(&"duration".to_string()));

        let stamps = Prepared::Timestamps(times);
        let analysis = analyze_requests(&PipelineConfig::hvorg_embeds(), &stamps, &AnnotationConfig::helioviewer());
        assert_eq!(analysis.plans.len(), 3);
        assert!(analysis.restricted.is_none());
    }

    #[test]
    fn short_histograms_carry_reference_lines() {
        let analysis = analyze_requests(&config(), &movies(), &AnnotationConfig::helioviewer());
        let plan = analysis.plans.iter().find(|p| p.name == "duration_2 d").unwrap();
        let PlannedChart::Histogram(h) = &plan.chart else {
            panic!("expected a histogram");
        };
        let labels: Vec<_> = h.markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1 h", "3 h", "6 h", "1 d"]);
        assert_eq!(h.histogram.counts.len(), 96);
        assert_eq!(h.markers[0].x, 1.0);
    }

    #[test]
    fn duration_scatter_carries_reference_lines() {
        let analysis = analyze_requests(&config(), &movies(), &AnnotationConfig::helioviewer());
        let plan = analysis.plans.iter().find(|p| p.name == "scatter_duration_vs_topicality").unwrap();
        let PlannedChart::Scatter(s) = &plan.chart else {
            panic!("expected a scatter");
        };
        // durations of 2 h and 30 d, topicality within a few days: axes span 0.01 d to 100 d
        assert!((s.x_range.0 - 0.01).abs() < 1e-12);
        assert_eq!(s.x_range.1, 100.0);
        let labels: Vec<_> = s.markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["1 h", "3 h", "6 h", "1 d", "7 d", "28 d"]);
        assert_eq!(s.markers[3].x, 1.0);
    }

    #[test]
    fn daily_chart_events_are_listed_with_category() {
        let times = parse_timestamps(["2013-09-20", "2013-10-10", "2013-12-15"]).valid();
        let analysis = analyze_requests(
            &PipelineConfig::hvorg_embeds(),
            &Prepared::Timestamps(times),
            &AnnotationConfig::helioviewer(),
        );
        assert_eq!(
            analysis.event_notes(),
            vec!["US government shutdown (project)", "comet ISON (solar physics)"]
        );
    }

    #[test]
    fn nothing_to_count() {
        let analysis = analyze_requests(
            &PipelineConfig::jhv_movies(),
            &Prepared::Timestamps(Vec::new()),
            &AnnotationConfig::helioviewer(),
        );
        assert!(analysis.plans.is_empty());
        assert!(analysis.daily.is_none());
        assert_eq!(analysis.skipped.len(), 1);
    }
}
