//! Interactive HTML page of daily service usage.

use std::{
    fs::{create_dir_all, write},
    path::Path,
};

use log::info;
use plotly::{
    Plot, Scatter,
    common::Mode,
    layout::{Axis, AxisType, Layout},
};

use crate::aggregate::usage::DailyUsage;
use crate::error::{AnalysisError, Result};

/// Writes one line trace per service (daily counts, log y) to `path`.
pub fn write_usage_dashboard(usage: &DailyUsage, title: &str, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))?;
    }

    let days: Vec<String> = usage.days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let mut plot = Plot::new();

    for (service, counts) in usage.services.iter().zip(&usage.counts) {
        plot.add_trace(
            Scatter::new(days.clone(), counts.clone())
                .name(service.as_str())
                .mode(Mode::Lines),
        );
    }

    let layout = Layout::new()
        .title(title)
        .height(700)
        .width(1400)
        .show_legend(true)
        .x_axis(Axis::new().title("date"))
        .y_axis(Axis::new().title("requests per day").type_(AxisType::Log));

    plot.set_layout(layout);
    write(path, plot.to_html()).map_err(|e| AnalysisError::io(path, e))?;

    info!("Usage dashboard written to {:?}", path);
    Ok(())
}
