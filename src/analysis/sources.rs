//! How often each data source was requested, from the prepared usage matrix.

use std::path::PathBuf;

use log::{info, warn};

use crate::charts::bars::RankedBarChart;
use crate::charts::{DEFAULT_SIZE, save_chart};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::prepare::sources::SourceUsage;
use crate::utils::artifacts::{ArtifactStore, DATA_SOURCE_IDS, NICKNAMES};
use crate::utils::style::count_label;

/// Ranked bar chart of source usage; `None` when no source was ever used.
pub fn analyze_sources(config: &PipelineConfig, usage: &SourceUsage) -> Option<RankedBarChart> {
    let bars = usage.ranked();
    if bars.is_empty() {
        return None;
    }
    Some(RankedBarChart {
        title: format!("{}: data source usage", config.data_analyzed()),
        x_label: "data source".to_string(),
        y_label: count_label(usage.rows.len(), config.product.plural()),
        bars,
    })
}

/// Draws the source usage chart for products that record their sources.
/// Returns the written image, or `None` when there is nothing to draw.
pub fn run_source_analysis(config: &PipelineConfig) -> Result<Option<PathBuf>> {
    if config.data_sources_file.is_none() {
        return Ok(None);
    }
    let service = config.service();
    let store = ArtifactStore::new(&config.derived_dir);
    if !store.exists(&service, NICKNAMES) || !store.exists(&service, DATA_SOURCE_IDS) {
        warn!("{}: no source usage prepared, skipping", service);
        return Ok(None);
    }

    let nicknames = store.load_nicknames(&service)?;
    let usage = store.load_source_usage(&service, &nicknames)?;
    info!("{}: {} records over {} sources", service, usage.rows.len(), usage.names.len());

    let Some(chart) = analyze_sources(config, &usage) else {
        warn!("{}: no record names a known source", service);
        return Ok(None);
    };
    print_ranking(&chart);

    let path = config.image_path(&format!("{} data_source_usage", config.data_analyzed()));
    save_chart(&chart, &path, config.format, DEFAULT_SIZE)?;
    Ok(Some(path))
}

fn print_ranking(chart: &RankedBarChart) {
    println!("\n{}", chart.title.to_uppercase());
    println!("{}", "=".repeat(40));
    for (rank, (name, total)) in chart.bars.iter().enumerate() {
        println!("  {:>3}. {:<24} {:>10}", rank + 1, name, total);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::sources::split_source_ids;

    #[test]
    fn ranked_by_use() {
        let records = vec![split_source_ids("10,11"), split_source_ids("11"), split_source_ids("11,12")];
        let nick = vec![(10, "AIA 171".to_string()), (11, "AIA 193".to_string()), (13, "LASCO C2".to_string())];
        let usage = SourceUsage::build(&records, &nick);

        let chart = analyze_sources(&PipelineConfig::hvorg_movies(), &usage).unwrap();
        assert_eq!(
            chart.bars,
            vec![("AIA 193".to_string(), 3), ("12".to_string(), 1), ("AIA 171".to_string(), 1)]
        );
        assert!(chart.title.starts_with("helioviewer.org movies"));
    }

    #[test]
    fn unused_sources_give_no_chart() {
        let usage = SourceUsage::build(&[Default::default()], &[(10, "AIA 171".to_string())]);
        assert!(analyze_sources(&PipelineConfig::hvorg_movies(), &usage).is_none());
    }

    #[test]
    fn products_without_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::hvorg_embeds().with_dirs(dir.path(), dir.path(), dir.path());
        assert_eq!(run_source_analysis(&cfg).unwrap(), None);

        let cfg = PipelineConfig::hvorg_movies().with_dirs(dir.path(), dir.path(), dir.path());
        assert_eq!(run_source_analysis(&cfg).unwrap(), None);
    }
}
