//! Data-source identifiers: splitting the comma-joined `DataSourceID` field,
//! flattening the nickname document, and the per-record usage matrix.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// Splits `"13,14,14"` into `{13, 14}`. Non-integer tokens are dropped.
pub fn split_source_ids(raw: &str) -> BTreeSet<u32> {
    raw.split(',')
        .filter_map(|token| token.trim().parse::<u32>().ok())
        .collect()
}

/// Walks the data-source document and collects every `(sourceId, nickname)` pair.
///
/// Sources sit at varying depths (observatory → instrument → detector → measurement),
/// so every object carrying a `sourceId` is taken wherever it appears.
pub fn flatten_source_nicknames(doc: &Value) -> Vec<(u32, String)> {
    let mut found = BTreeMap::new();
    collect_sources(doc, &mut found);
    found.into_iter().collect()
}

fn collect_sources(node: &Value, found: &mut BTreeMap<u32, String>) {
    match node {
        Value::Object(map) => {
            if let Some(id) = map.get("sourceId").and_then(source_id_of) {
                let nickname = map
                    .get("nickname")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string());
                found.entry(id).or_insert(nickname);
            }
            for child in map.values() {
                collect_sources(child, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_sources(child, found);
            }
        }
        _ => {}
    }
}

// The service returns ids as numbers in some versions and strings in others.
fn source_id_of(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Offset added to legacy record ids so they cannot collide with current ids.
///
/// `10^(1 + ceil(log10(n)))` for `n` current records; 10 for `n <= 1`.
pub fn legacy_id_offset(n_current: usize) -> i64 {
    let mut digits = 0u32;
    // ceil(log10(n)) == number of decimal digits of (n - 1)
    let mut rest = n_current.saturating_sub(1);
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    10i64.pow(1 + digits)
}

/// One row per record, one 0/1 column per known source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUsage {
    /// Column ids, ascending.
    pub source_ids: Vec<u32>,
    /// Column headers, nickname when known.
    pub names: Vec<String>,
    pub rows: Vec<Vec<u8>>,
}

impl SourceUsage {
    /// Builds the matrix. Ids seen in the records but missing from `nicknames`
    /// still get a column, named by the id itself.
    pub fn build(records: &[BTreeSet<u32>], nicknames: &[(u32, String)]) -> Self {
        let lookup: BTreeMap<u32, &str> = nicknames.iter().map(|(id, n)| (*id, n.as_str())).collect();

        let mut ids: BTreeSet<u32> = lookup.keys().copied().collect();
        for rec in records {
            ids.extend(rec.iter().copied());
        }
        let source_ids: Vec<u32> = ids.into_iter().collect();

        let names = source_ids
            .iter()
            .map(|id| lookup.get(id).map_or_else(|| id.to_string(), |n| n.to_string()))
            .collect();

        let rows = records
            .iter()
            .map(|rec| source_ids.iter().map(|id| u8::from(rec.contains(id))).collect())
            .collect();

        SourceUsage { source_ids, names, rows }
    }

    /// Number of records that used each source, aligned with `names`.
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.names.len()];
        for row in &self.rows {
            for (t, &used) in totals.iter_mut().zip(row) {
                *t += u64::from(used);
            }
        }
        totals
    }

    /// `(name, total)` for sources used at least once, most used first.
    pub fn ranked(&self) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self
            .names
            .iter()
            .cloned()
            .zip(self.totals())
            .filter(|(_, t)| *t > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_dedups_and_orders() {
        let ids = split_source_ids("14, 13,14,,x");
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![13, 14]);
    }

    #[test]
    fn nicknames_found_at_any_depth() {
        let doc = json!({
            "SDO": {
                "AIA": {
                    "171": {"sourceId": 10, "nickname": "AIA 171"},
                    "193": {"sourceId": "11", "nickname": "AIA 193"}
                },
                "HMI": {"continuum": {"sourceId": 18, "nickname": "HMI Int"}}
            },
            "SOHO": {"LASCO": {"C2": {"white-light": {"sourceId": 4, "nickname": "LASCO C2"}}}}
        });
        let flat = flatten_source_nicknames(&doc);
        assert_eq!(
            flat,
            vec![
                (4, "LASCO C2".to_string()),
                (10, "AIA 171".to_string()),
                (11, "AIA 193".to_string()),
                (18, "HMI Int".to_string()),
            ]
        );
    }

    #[test]
    fn legacy_offset_clears_current_id_range() {
        assert_eq!(legacy_id_offset(0), 10);
        assert_eq!(legacy_id_offset(1), 10);
        assert_eq!(legacy_id_offset(9), 100);
        assert_eq!(legacy_id_offset(10), 100);
        assert_eq!(legacy_id_offset(11), 1000);
        assert_eq!(legacy_id_offset(1000), 10_000);
        assert_eq!(legacy_id_offset(1001), 100_000);
    }

    #[test]
    fn usage_matrix_and_totals() {
        let records = vec![split_source_ids("10,11"), split_source_ids("11"), split_source_ids("99")];
        let nick = vec![(10, "AIA 171".to_string()), (11, "AIA 193".to_string()), (12, "AIA 211".to_string())];
        let usage = SourceUsage::build(&records, &nick);

        assert_eq!(usage.names, vec!["AIA 171", "AIA 193", "AIA 211", "99"]);
        assert_eq!(usage.rows[0], vec![1, 1, 0, 0]);
        assert_eq!(usage.totals(), vec![1, 2, 0, 1]);
        assert_eq!(
            usage.ranked(),
            vec![("AIA 193".to_string(), 2), ("99".to_string(), 1), ("AIA 171".to_string(), 1)]
        );
    }
}
