//! Request tables read from the service logs.
//!
//! Columns are read as raw strings (schema inference disabled) so that a single
//! malformed cell never fails the whole load; parsing happens per entry later.

use std::path::Path;

use log::{info, warn};
use polars::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::prepare::sources::legacy_id_offset;

pub const COL_ID: &str = "id";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_START: &str = "StartDate";
pub const COL_END: &str = "EndDate";
pub const COL_OBSERVATION: &str = "ObservationDate";
pub const COL_SOURCES: &str = "DataSourceID";

/// What a table must provide besides the request timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Movies: observation window `StartDate`..`EndDate`.
    Window,
    /// Screenshots: one `ObservationDate`.
    Point,
    /// Embeds and request statistics: `timestamp` only.
    TimestampOnly,
}

/// Raw string columns of one request log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestTable {
    pub ids: Vec<i64>,
    pub timestamp: Vec<String>,
    pub start_date: Vec<String>,
    pub end_date: Vec<String>,
    pub observation_date: Vec<String>,
    /// Empty when the log has no `DataSourceID` column.
    pub data_source_ids: Vec<String>,
}

impl RequestTable {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    pub fn has_sources(&self) -> bool {
        !self.data_source_ids.is_empty()
    }

    /// Appends a legacy table, shifting its ids past the current id range.
    pub fn merge_legacy(&mut self, legacy: RequestTable) {
        let offset = legacy_id_offset(self.len());
        info!(
            "Merging {} legacy records into {} current records (id offset {})",
            legacy.len(),
            self.len(),
            offset
        );

        // Source column only survives when both tables carry it.
        let keep_sources = self.has_sources() && legacy.has_sources();

        self.ids.extend(legacy.ids.into_iter().map(|id| id + offset));
        self.timestamp.extend(legacy.timestamp);
        self.start_date.extend(legacy.start_date);
        self.end_date.extend(legacy.end_date);
        self.observation_date.extend(legacy.observation_date);

        if keep_sources {
            self.data_source_ids.extend(legacy.data_source_ids);
        } else {
            self.data_source_ids.clear();
        }
    }
}

/// Reads a request log with the columns `layout` requires.
pub fn load_request_table(path: &Path, layout: TableLayout) -> Result<RequestTable> {
    if !path.exists() {
        return Err(AnalysisError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "request log not found"),
        ));
    }

    info!("Loading {}", path.display());
    let path_str = path.to_string_lossy().to_string();
    let df = LazyCsvReader::new(path_str.as_str())
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    let mut table = RequestTable {
        timestamp: string_column(&df, COL_TIMESTAMP, path)?,
        ..Default::default()
    };

    match layout {
        TableLayout::Window => {
            table.start_date = string_column(&df, COL_START, path)?;
            table.end_date = string_column(&df, COL_END, path)?;
        }
        TableLayout::Point => {
            table.observation_date = string_column(&df, COL_OBSERVATION, path)?;
        }
        TableLayout::TimestampOnly => {}
    }

    if df.get_column_index(COL_SOURCES).is_some() {
        table.data_source_ids = string_column(&df, COL_SOURCES, path)?;
    }

    table.ids = if df.get_column_index(COL_ID).is_some() {
        let raw = string_column(&df, COL_ID, path)?;
        let mut bad = 0usize;
        let ids = raw
            .iter()
            .enumerate()
            .map(|(row, s)| {
                s.trim().parse::<i64>().unwrap_or_else(|_| {
                    bad += 1;
                    row as i64
                })
            })
            .collect();
        if bad > 0 {
            warn!("{}: {} rows with a non-integer id, row index used instead", path.display(), bad);
        }
        ids
    } else {
        (0..df.height() as i64).collect()
    };

    info!("Loaded {} records from {}", table.len(), path.display());
    Ok(table)
}

// Nulls come back as empty strings; they fail timestamp parsing like any other junk.
fn string_column(df: &DataFrame, name: &str, path: &Path) -> Result<Vec<String>> {
    if df.get_column_index(name).is_none() {
        return Err(AnalysisError::MissingColumn {
            column: name.to_string(),
            path: path.to_path_buf(),
        });
    }

    let values = df.column(name)?.str()?;
    Ok((0..df.height())
        .map(|i| values.get(i).unwrap_or("").to_string())
        .collect())
}
