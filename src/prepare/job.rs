//! One preparation run: raw request log in, derived artifacts out.

use std::{fs::File, io::BufReader};

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use crate::prepare::derive::{DerivedQuantities, PointTopicality, derive_point_topicality, derive_windows};
use crate::prepare::records::{RequestTable, TableLayout, load_request_table};
use crate::prepare::sources::{SourceUsage, flatten_source_nicknames, split_source_ids};
use crate::prepare::timestamps::parse_timestamps;
use crate::utils::artifacts::{self, ArtifactStore};

/// Derived data of one product, shaped by its table layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Window(DerivedQuantities),
    Point(PointTopicality),
    Timestamps(Vec<DateTime<Utc>>),
}

impl Prepared {
    pub fn request_times(&self) -> &[DateTime<Utc>] {
        match self {
            Prepared::Window(d) => &d.request_times,
            Prepared::Point(p) => &p.request_times,
            Prepared::Timestamps(t) => t,
        }
    }

    pub fn len(&self) -> usize {
        self.request_times().len()
    }

    pub fn is_empty(&self) -> bool {
        self.request_times().is_empty()
    }
}

/// Loads the request log (plus legacy log), derives every quantity the layout
/// supports and writes them to `store`.
pub fn run_preparation(config: &PipelineConfig, store: &ArtifactStore) -> Result<Prepared> {
    let service = config.service();
    info!("Preparing {} ({})", config.data_analyzed(), service);

    let table = load_with_legacy(config)?;
    if table.is_empty() {
        return Err(AnalysisError::EmptyInput(config.input_path().display().to_string()));
    }

    let request = parse_timestamps(&table.timestamp);
    let prepared = match config.layout {
        TableLayout::Window => {
            let derived = derive_windows(
                &request,
                &parse_timestamps(&table.start_date),
                &parse_timestamps(&table.end_date),
            );
            save_windows(store, &service, &derived)?;
            log_dropped(&service, derived.dropped, table.len());
            Prepared::Window(derived)
        }
        TableLayout::Point => {
            let point = derive_point_topicality(&request, &parse_timestamps(&table.observation_date));
            store.save_seconds(&service, artifacts::TIME_DIFFERENCE, &point.topicality)?;
            store.save_instants(&service, artifacts::REQUEST_TIME, &point.request_times)?;
            log_dropped(&service, point.dropped, table.len());
            Prepared::Point(point)
        }
        TableLayout::TimestampOnly => {
            let times = request.valid();
            store.save_instants(&service, artifacts::REQUEST_TIME, &times)?;
            log_dropped(&service, table.len() - times.len(), table.len());
            Prepared::Timestamps(times)
        }
    };

    prepare_sources(config, store, &service, &table)?;

    info!("{}: {} records prepared", service, prepared.len());
    Ok(prepared)
}

/// Reads back what [`run_preparation`] wrote for `config`.
pub fn load_prepared(config: &PipelineConfig, store: &ArtifactStore) -> Result<Prepared> {
    let service = config.service();
    let request_times = store.load_instants(&service, artifacts::REQUEST_TIME)?;

    let prepared = match config.layout {
        TableLayout::Window => {
            let derived = DerivedQuantities {
                request_times,
                start_times: store.load_instants(&service, artifacts::START_TIME)?,
                end_times: store.load_instants(&service, artifacts::END_TIME)?,
                midpoints: store.load_instants(&service, artifacts::MID_POINT)?,
                durations: store.load_seconds(&service, artifacts::DURATIONS)?,
                topicality_start: store.load_seconds(&service, artifacts::TIME_DIFFERENCE)?,
                topicality_end: store.load_seconds(&service, artifacts::TIME_DIFFERENCE_END)?,
                dropped: 0,
            };
            check_aligned(store, &service, derived.len(), &[
                derived.request_times.len(),
                derived.start_times.len(),
                derived.end_times.len(),
                derived.midpoints.len(),
                derived.topicality_start.len(),
                derived.topicality_end.len(),
            ])?;
            Prepared::Window(derived)
        }
        TableLayout::Point => {
            let topicality = store.load_seconds(&service, artifacts::TIME_DIFFERENCE)?;
            check_aligned(store, &service, topicality.len(), &[request_times.len()])?;
            Prepared::Point(PointTopicality {
                request_times,
                topicality,
                dropped: 0,
            })
        }
        TableLayout::TimestampOnly => Prepared::Timestamps(request_times),
    };
    Ok(prepared)
}

fn load_with_legacy(config: &PipelineConfig) -> Result<RequestTable> {
    let mut table = load_request_table(&config.input_path(), config.layout)?;

    if let Some(legacy_path) = config.legacy_path() {
        if legacy_path.exists() {
            let legacy = load_request_table(&legacy_path, config.layout)?;
            table.merge_legacy(legacy);
        } else {
            warn!("Legacy log {} not found, continuing without it", legacy_path.display());
        }
    }
    Ok(table)
}

fn save_windows(store: &ArtifactStore, service: &str, derived: &DerivedQuantities) -> Result<()> {
    store.save_seconds(service, artifacts::DURATIONS, &derived.durations)?;
    store.save_seconds(service, artifacts::TIME_DIFFERENCE, &derived.topicality_start)?;
    store.save_seconds(service, artifacts::TIME_DIFFERENCE_END, &derived.topicality_end)?;
    store.save_instants(service, artifacts::MID_POINT, &derived.midpoints)?;
    store.save_instants(service, artifacts::REQUEST_TIME, &derived.request_times)?;
    store.save_instants(service, artifacts::START_TIME, &derived.start_times)?;
    store.save_instants(service, artifacts::END_TIME, &derived.end_times)?;
    Ok(())
}

/// Nickname table and per-record usage matrix, when the log and config both have sources.
fn prepare_sources(config: &PipelineConfig, store: &ArtifactStore, service: &str, table: &RequestTable) -> Result<()> {
    let Some(path) = config.data_sources_path() else {
        return Ok(());
    };
    if !table.has_sources() {
        warn!("{}: no {} column, source usage skipped", service, crate::prepare::records::COL_SOURCES);
        return Ok(());
    }

    let file = File::open(&path).map_err(|e| AnalysisError::io(&path, e))?;
    let doc: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
    let nicknames = flatten_source_nicknames(&doc);
    info!("{} data sources described in {}", nicknames.len(), path.display());

    let records: Vec<_> = table.data_source_ids.iter().map(|s| split_source_ids(s)).collect();
    let usage = SourceUsage::build(&records, &nicknames);

    store.save_nicknames(service, &nicknames)?;
    store.save_source_usage(service, &usage)?;
    Ok(())
}

fn check_aligned(store: &ArtifactStore, service: &str, expected: usize, lengths: &[usize]) -> Result<()> {
    if lengths.iter().all(|&n| n == expected) {
        return Ok(());
    }
    Err(AnalysisError::MalformedArtifact {
        path: store.dir().join(service),
        detail: format!("derived columns differ in length ({} vs {:?})", expected, lengths),
    })
}

fn log_dropped(service: &str, dropped: usize, total: usize) {
    if dropped > 0 {
        warn!("{}: {} of {} records dropped (unparseable timestamps)", service, dropped, total);
    }
}
