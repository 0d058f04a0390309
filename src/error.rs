//! Error type shared by the preparation and analysis stages.
//!
//! Per-record parse failures are not errors (they become invalid markers in a
//! `ParsedColumn`). Everything here aborts the current run.

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Input or artifact file could not be read or written.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data frame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from an input table.
    #[error("column `{column}` missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Artifact exists but holds something other than what was asked for.
    #[error("artifact {path} is malformed: {detail}")]
    MalformedArtifact { path: PathBuf, detail: String },

    #[error("unknown restriction `{0}` (expected \"observable\" or \"positive requested duration\")")]
    UnknownRestriction(String),

    /// Nothing left to analyze after filtering.
    #[error("no data for {0}")]
    EmptyInput(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for AnalysisError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Chart(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
