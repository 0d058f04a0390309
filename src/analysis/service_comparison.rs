//! Daily usage of helioviewer.org movies, embeds and JHelioviewer movies side
//! by side: fractional share over time and day-by-day scatter plots split at
//! the helioviewer.org rebuild.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::info;

use crate::aggregate::stats::{Correlation, PowerLawFit, fit_power_law, log_pairs, spearman};
use crate::aggregate::usage::DailyUsage;
use crate::charts::dashboard::write_usage_dashboard;
use crate::charts::scatter::{Marker, ScatterChart, ScatterSeries};
use crate::charts::timeline::FractionChart;
use crate::charts::{DEFAULT_SIZE, SQUARE_SIZE, save_chart};
use crate::config::{COMPARISON_APPLICATION, COMPARISON_EVENTS, ImageFormat, PipelineConfig, down_time, image_path};
use crate::error::{AnalysisError, Result};
use crate::utils::artifacts::{ArtifactStore, REQUEST_TIME};
use crate::utils::style::{AnnotationConfig, BLUE, MAGENTA, Q_HVORG_EMBED, Q_HVORG_MOVIE, Q_JHV_MOVIE};

/// Both scatter axes span `[1, 10^4]` requests per day.
const SCATTER_RANGE: (f64, f64) = (1.0, 10_000.0);

/// The three compared services, sharing `base`'s directories and image format.
pub fn comparison_configs(base: &PipelineConfig) -> [PipelineConfig; 3] {
    [
        PipelineConfig::hvorg_movies(),
        PipelineConfig::hvorg_embeds(),
        PipelineConfig::jhv_movies(),
    ]
    .map(|c| {
        c.with_dirs(&base.source_dir, &base.derived_dir, &base.image_dir)
            .with_format(base.format)
    })
}

/// e.g. `helioviewer.org movie`.
pub fn display_name(config: &PipelineConfig) -> String {
    format!("{} {}", config.application.name(), config.product.name())
}

/// Fit and correlation of one service pair over the days before the rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairTrend {
    pub fit: Option<PowerLawFit>,
    pub correlation: Option<Correlation>,
}

#[derive(Debug, Clone)]
pub struct ServiceComparison {
    pub usage: DailyUsage,
    pub split: NaiveDate,
    pub days_before: usize,
    pub days_after: usize,
    /// helioviewer.org movies against JHelioviewer movies.
    pub trend: PairTrend,
    pub fraction: FractionChart,
    /// `(file name, chart)`.
    pub scatters: Vec<(String, ScatterChart)>,
}

/// Compares `services` (display name, request instants), given in the order
/// helioviewer.org movie, helioviewer.org embed, JHelioviewer movie.
pub fn analyze_comparison(
    services: &[(String, Vec<DateTime<Utc>>)],
    split: NaiveDate,
    annotations: &AnnotationConfig,
) -> Result<ServiceComparison> {
    let [(movie, _), (embed, _), (jhv, _)] = services else {
        return Err(AnalysisError::EmptyInput(format!(
            "service comparison needs three services, got {}",
            services.len()
        )));
    };
    let (movie, embed, jhv) = (movie.as_str(), embed.as_str(), jhv.as_str());
    let refs: Vec<(&str, &[DateTime<Utc>])> = services.iter().map(|(n, t)| (n.as_str(), t.as_slice())).collect();
    let usage = DailyUsage::over_common_range(&refs)
        .ok_or_else(|| AnalysisError::EmptyInput("service comparison: no common time range".to_string()))?;
    info!(
        "Comparing services over {} days ({:?} - {:?})",
        usage.len(),
        usage.first_day(),
        usage.last_day()
    );

    let (before, after) = usage.split_at(split);
    let trend = pair_trend(&before, movie, jhv);

    let fraction = fraction_chart(&usage, annotations);
    let scatters = vec![
        (
            "scatter_hvorg_movies_vs_jhv_movies".to_string(),
            pair_scatter(&before, &after, split, (movie, Q_HVORG_MOVIE), (jhv, Q_JHV_MOVIE), Some(trend)),
        ),
        (
            "scatter_hvorg_movies_vs_hvorg_embeds".to_string(),
            pair_scatter(&before, &after, split, (movie, Q_HVORG_MOVIE), (embed, Q_HVORG_EMBED), None),
        ),
    ];

    Ok(ServiceComparison {
        days_before: before.len(),
        days_after: after.len(),
        usage,
        split,
        trend,
        fraction,
        scatters,
    })
}

fn pair_trend(before: &DailyUsage, x: &str, y: &str) -> PairTrend {
    let (Some(xs), Some(ys)) = (before.column_f64(x), before.column_f64(y)) else {
        return PairTrend { fit: None, correlation: None };
    };
    let (lx, ly) = log_pairs(&xs, &ys);
    PairTrend {
        fit: fit_power_law(&xs, &ys),
        correlation: spearman(&lx, &ly),
    }
}

fn points(usage: &DailyUsage, x: &str, y: &str) -> Vec<(f64, f64)> {
    match (usage.column_f64(x), usage.column_f64(y)) {
        (Some(xs), Some(ys)) => xs.into_iter().zip(ys).collect(),
        _ => Vec::new(),
    }
}

fn fit_label(trend: &PairTrend) -> Option<(PowerLawFit, String)> {
    let fit = trend.fit?;
    let label = match trend.correlation {
        Some(c) => format!(
            "fit: y = {:.2} x^{:.2} (Spearman rho = {:.2}, p = {:.2e})",
            fit.amplitude, fit.exponent, c.rho, c.p_value
        ),
        None => format!("fit: y = {:.2} x^{:.2}", fit.amplitude, fit.exponent),
    };
    Some((fit, label))
}

fn pair_scatter(
    before: &DailyUsage,
    after: &DailyUsage,
    split: NaiveDate,
    (x, x_symbol): (&str, &str),
    (y, y_symbol): (&str, &str),
    trend: Option<PairTrend>,
) -> ScatterChart {
    ScatterChart {
        title: format!("{} vs {} per day", y, x),
        x_label: format!("number of {} per day ({})", x, x_symbol),
        y_label: format!("number of {} per day ({})", y, y_symbol),
        x_range: SCATTER_RANGE,
        y_range: SCATTER_RANGE,
        series: vec![
            ScatterSeries {
                label: format!("before {} [{} days]", split, before.len()),
                points: points(before, x, y),
                color: BLUE,
                marker: Marker::Circle,
            },
            ScatterSeries {
                label: format!("after {} [{} days]", split, after.len()),
                points: points(after, x, y),
                color: MAGENTA,
                marker: Marker::Square,
            },
        ],
        fit: trend.as_ref().and_then(fit_label),
        equality: true,
        markers: Vec::new(),
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn fraction_chart(usage: &DailyUsage, annotations: &AnnotationConfig) -> FractionChart {
    let events = match (usage.first_day(), usage.last_day()) {
        (Some(first), Some(last)) => annotations
            .events
            .select_within(COMPARISON_EVENTS, day_start(first), day_start(last.succ_opt().unwrap_or(last)))
            .into_iter()
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    FractionChart {
        title: "service usage expressed as fraction of total daily usage".to_string(),
        x_label: "date".to_string(),
        y_label: "fractional use".to_string(),
        days: usage.days.clone(),
        layers: usage.services.iter().cloned().zip(usage.stacked_fractions()).collect(),
        events,
    }
}

/// Writes the fraction chart, both scatter plots and the interactive page.
pub fn render_comparison(comparison: &ServiceComparison, image_dir: &Path, format: ImageFormat) -> Result<Vec<PathBuf>> {
    let dir = image_dir.join(COMPARISON_APPLICATION);
    let mut written = Vec::new();

    let path = image_path(&dir, "fractional_service_usage", format);
    save_chart(&comparison.fraction, &path, format, DEFAULT_SIZE)?;
    written.push(path);

    for (name, chart) in &comparison.scatters {
        let path = image_path(&dir, name, format);
        save_chart(chart, &path, format, SQUARE_SIZE)?;
        written.push(path);
    }

    let page = dir.join("daily_usage.html");
    write_usage_dashboard(&comparison.usage, "daily service usage", &page)?;
    written.push(page);
    Ok(written)
}

/// Loads each service's prepared request times and renders the comparison.
pub fn run_service_comparison(base: &PipelineConfig, annotations: &AnnotationConfig) -> Result<Vec<PathBuf>> {
    let mut services = Vec::new();
    for config in comparison_configs(base) {
        let store = ArtifactStore::new(&config.derived_dir);
        let times = store.load_instants(&config.service(), REQUEST_TIME)?;
        info!("{}: {} request times loaded", config.service(), times.len());
        services.push((display_name(&config), times));
    }

    let comparison = analyze_comparison(&services, down_time(), annotations)?;
    print_comparison(&comparison);
    render_comparison(&comparison, &base.image_dir, base.format)
}

fn print_comparison(comparison: &ServiceComparison) {
    println!("\nSERVICE COMPARISON");
    println!("{}", "=".repeat(40));
    for (service, total) in comparison
        .usage
        .services
        .iter()
        .zip(comparison.usage.counts.iter().map(|c| c.iter().sum::<u64>()))
    {
        println!("  {:<26} {:>10}", service, total);
    }
    println!("  {:<26} {:>10}", format!("days before {}", comparison.split), comparison.days_before);
    println!("  {:<26} {:>10}", "days after", comparison.days_after);
    if let Some(fit) = comparison.trend.fit {
        println!("  {:<26} {:>10.3}", "power law exponent", fit.exponent);
        println!("  {:<26} {:>10.3}", "power law amplitude", fit.amplitude);
    }
    if let Some(c) = comparison.trend.correlation {
        println!("  {:<26} {:>10.3}", "Spearman rho", c.rho);
        println!("  {:<26} {:>10.3e}", "p-value", c.p_value);
    }
    println!();
}
