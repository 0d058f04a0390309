//! Derived-data handoff between the preparation and analysis stages.
//!
//! One CSV file per quantity under the derived directory, named
//! `<service>_<quantity>.csv`:
//! - seconds columns (`durations_seconds`, `time_difference_seconds`, ...): shortest
//!   round-trip float text, so a reload is bit-identical.
//! - instant columns (`request_time`, `start_time`, ...): RFC 3339 with nanoseconds.
//! - `data_source_ids`: per-record 0/1 usage matrix, one column per source.
//! - `sourceids_and_nicknames`: flattened data-source document.
//!
//! Written by exactly one preparation run, read by any number of analysis runs.

use std::{
    fs::{File, create_dir_all},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::prepare::sources::SourceUsage;

pub const DURATIONS: &str = "durations_seconds";
pub const MID_POINT: &str = "mid_point";
pub const TIME_DIFFERENCE: &str = "time_difference_seconds";
pub const TIME_DIFFERENCE_END: &str = "time_difference_end_seconds";
pub const REQUEST_TIME: &str = "request_time";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const DATA_SOURCE_IDS: &str = "data_source_ids";
pub const NICKNAMES: &str = "sourceids_and_nicknames";

#[derive(Debug, Serialize, Deserialize)]
struct SecondsRow {
    seconds: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct InstantRow {
    instant: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NicknameRow {
    source_id: u32,
    nickname: String,
}

/// Directory of persisted derived columns.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, service: &str, quantity: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", service, quantity))
    }

    pub fn exists(&self, service: &str, quantity: &str) -> bool {
        self.path(service, quantity).exists()
    }

    pub fn save_seconds(&self, service: &str, quantity: &str, values: &[f64]) -> Result<PathBuf> {
        self.save_rows(service, quantity, values.iter().map(|&seconds| SecondsRow { seconds }))
    }

    pub fn load_seconds(&self, service: &str, quantity: &str) -> Result<Vec<f64>> {
        let rows: Vec<SecondsRow> = self.load_rows(service, quantity)?;
        Ok(rows.into_iter().map(|r| r.seconds).collect())
    }

    pub fn save_instants(&self, service: &str, quantity: &str, values: &[DateTime<Utc>]) -> Result<PathBuf> {
        self.save_rows(service, quantity, values.iter().map(|&instant| InstantRow { instant }))
    }

    pub fn load_instants(&self, service: &str, quantity: &str) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<InstantRow> = self.load_rows(service, quantity)?;
        Ok(rows.into_iter().map(|r| r.instant).collect())
    }

    pub fn save_nicknames(&self, service: &str, nicknames: &[(u32, String)]) -> Result<PathBuf> {
        self.save_rows(
            service,
            NICKNAMES,
            nicknames.iter().map(|(source_id, nickname)| NicknameRow {
                source_id: *source_id,
                nickname: nickname.clone(),
            }),
        )
    }

    pub fn load_nicknames(&self, service: &str) -> Result<Vec<(u32, String)>> {
        let rows: Vec<NicknameRow> = self.load_rows(service, NICKNAMES)?;
        Ok(rows.into_iter().map(|r| (r.source_id, r.nickname)).collect())
    }

    /// Writes the usage matrix: `record,<id>,<id>,...` then one 0/1 row per record.
    pub fn save_source_usage(&self, service: &str, usage: &SourceUsage) -> Result<PathBuf> {
        let path = self.prepare_path(service, DATA_SOURCE_IDS)?;
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["record".to_string()];
        header.extend(usage.source_ids.iter().map(u32::to_string));
        writer.write_record(&header)?;

        for (i, row) in usage.rows.iter().enumerate() {
            let mut record = vec![i.to_string()];
            record.extend(row.iter().map(u8::to_string));
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|e| AnalysisError::io(&path, e))?;

        info!("Source usage ({} sources) exported to: {:?}", usage.names.len(), path);
        Ok(path)
    }

    /// Reads the usage matrix back. Column names come from `nicknames`, or the
    /// id itself for a source without one.
    pub fn load_source_usage(&self, service: &str, nicknames: &[(u32, String)]) -> Result<SourceUsage> {
        let path = self.existing_path(service, DATA_SOURCE_IDS)?;
        let mut reader = csv::Reader::from_path(&path)?;

        let source_ids = reader
            .headers()?
            .iter()
            .skip(1)
            .map(|id| {
                id.trim().parse::<u32>().map_err(|_| AnalysisError::MalformedArtifact {
                    path: path.clone(),
                    detail: format!("usage column `{}` is not a source id", id),
                })
            })
            .collect::<Result<Vec<u32>>>()?;
        let names = source_ids
            .iter()
            .map(|id| {
                nicknames
                    .iter()
                    .find(|(n_id, _)| n_id == id)
                    .map_or_else(|| id.to_string(), |(_, n)| n.clone())
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .skip(1)
                .map(|cell| {
                    cell.trim().parse::<u8>().map_err(|_| AnalysisError::MalformedArtifact {
                        path: path.clone(),
                        detail: format!("usage cell `{}` is not 0/1", cell),
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            rows.push(row);
        }

        Ok(SourceUsage { source_ids, names, rows })
    }

    fn save_rows<T: Serialize>(&self, service: &str, quantity: &str, rows: impl Iterator<Item = T>) -> Result<PathBuf> {
        let path = self.prepare_path(service, quantity)?;
        let mut writer = csv::Writer::from_path(&path)?;
        let mut n = 0usize;
        for row in rows {
            writer.serialize(row)?;
            n += 1;
        }
        writer.flush().map_err(|e| AnalysisError::io(&path, e))?;

        info!("Saved {} values to {:?}", n, path);
        Ok(path)
    }

    fn load_rows<T: for<'de> Deserialize<'de>>(&self, service: &str, quantity: &str) -> Result<Vec<T>> {
        let path = self.existing_path(service, quantity)?;
        let mut reader = csv::Reader::from_path(&path)?;
        let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, csv::Error>>()?;
        info!("Loaded {} values from {:?}", rows.len(), path);
        Ok(rows)
    }

    fn prepare_path(&self, service: &str, quantity: &str) -> Result<PathBuf> {
        create_dir_all(&self.dir).map_err(|e| AnalysisError::io(&self.dir, e))?;
        Ok(self.path(service, quantity))
    }

    fn existing_path(&self, service: &str, quantity: &str) -> Result<PathBuf> {
        let path = self.path(service, quantity);
        File::open(&path).map_err(|e| AnalysisError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::sources::split_source_ids;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn seconds_reload_bit_identical() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        let values = vec![7200.0, -3600.0, 0.1 + 0.2, 1.0 / 3.0, 1e-300, -0.0, 31_557_600.123_456_789];

        store.save_seconds("hvorg_movie", DURATIONS, &values).unwrap();
        let back = store.load_seconds("hvorg_movie", DURATIONS).unwrap();

        assert_eq!(back.len(), values.len());
        for (a, b) in values.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits(), "{a} vs {b}");
        }
    }

    #[test]
    fn instants_reload_with_nanoseconds() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        let values = vec![
            Utc.with_ymd_and_hms(2011, 6, 7, 6, 30, 0).unwrap(),
            Utc.timestamp_opt(1_500_000_000, 123_456_789).unwrap(),
        ];

        store.save_instants("jhv_movie", REQUEST_TIME, &values).unwrap();
        assert_eq!(store.load_instants("jhv_movie", REQUEST_TIME).unwrap(), values);
    }

    #[test]
    fn missing_artifact_is_io_error() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        let err = store.load_seconds("nothing", DURATIONS).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn source_usage_round_trip() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        let nick = vec![(10, "AIA 171".to_string()), (11, "AIA 193".to_string())];
        let usage = SourceUsage::build(&[split_source_ids("10"), split_source_ids("10,11,42")], &nick);

        store.save_nicknames("hvorg_movie", &nick).unwrap();
        store.save_source_usage("hvorg_movie", &usage).unwrap();

        let nick_back = store.load_nicknames("hvorg_movie").unwrap();
        assert_eq!(nick_back, nick);
        let back = store.load_source_usage("hvorg_movie", &nick_back).unwrap();
        assert_eq!(back, usage);
    }

    #[test]
    fn source_usage_keeps_ids_of_shared_nicknames() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        let nick = vec![(10, "AIA 171".to_string()), (12, "AIA 171".to_string())];
        let usage = SourceUsage::build(&[split_source_ids("10"), split_source_ids("12,99")], &nick);

        store.save_source_usage("hvorg_movie", &usage).unwrap();
        let back = store.load_source_usage("hvorg_movie", &nick).unwrap();
        assert_eq!(back.source_ids, vec![10, 12, 99]);
        assert_eq!(back.names, vec!["AIA 171", "AIA 171", "99"]);
    }

    #[test]
    fn source_usage_with_unknown_column_is_malformed() {
        let td = tempdir().expect("tempdir");
        let store = ArtifactStore::new(td.path());
        std::fs::write(store.path("hvorg_movie", DATA_SOURCE_IDS), "record,AIA 171\n0,1\n").unwrap();

        let err = store.load_source_usage("hvorg_movie", &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedArtifact { .. }));
    }
}
