//! Free-form timestamp parsing with per-entry validity.
//!
//! A string that fails to parse becomes `None` in the column; it never aborts the
//! run and is never replaced by a default instant. Callers pair columns with
//! `valid_triples` / `valid_pairs` so only fully valid records reach derivation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive layouts tried after RFC 3339. Naive values are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses one timestamp string; `None` when no supported layout matches.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Trailing "Z" on an otherwise naive layout
    let naive_part = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive_part, fmt) {
            return Some(ndt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }

    None
}

/// Column of parsed instants, same length and order as the input strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedColumn {
    pub values: Vec<Option<DateTime<Utc>>>,
}

impl ParsedColumn {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parallel validity flags.
    pub fn validity(&self) -> Vec<bool> {
        self.values.iter().map(Option::is_some).collect()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Valid instants only, input order preserved.
    pub fn valid(&self) -> Vec<DateTime<Utc>> {
        self.values.iter().flatten().copied().collect()
    }
}

/// Parses every entry of `raw`; malformed entries become invalid markers.
pub fn parse_timestamps<I, S>(raw: I) -> ParsedColumn
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ParsedColumn {
        values: raw.into_iter().map(|s| parse_instant(s.as_ref())).collect(),
    }
}

/// Pairs entries of two columns where both are valid.
pub fn valid_pairs(a: &ParsedColumn, b: &ParsedColumn) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    a.values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect()
}

/// Triples `(request, start, end)` where all three entries are valid.
pub fn valid_triples(
    request: &ParsedColumn,
    start: &ParsedColumn,
    end: &ParsedColumn,
) -> Vec<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    request
        .values
        .iter()
        .zip(&start.values)
        .zip(&end.values)
        .filter_map(|((r, s), e)| Some(((*r)?, (*s)?, (*e)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn accepts_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2016, 3, 14, 15, 9, 26).unwrap();
        for s in [
            "2016-03-14 15:09:26",
            "2016-03-14T15:09:26",
            "2016-03-14T15:09:26Z",
            "2016-03-14T15:09:26+00:00",
            "2016/03/14 15:09:26",
            "  2016-03-14 15:09:26  ",
        ] {
            assert_eq!(parse_instant(s), Some(expected), "layout {s:?}");
        }
    }

    #[test]
    fn keeps_fractional_seconds() {
        let dt = parse_instant("2016-03-14 15:09:26.500").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(
            parse_instant("2011-06-07"),
            Some(Utc.with_ymd_and_hms(2011, 6, 7, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        assert_eq!(
            parse_instant("2020-01-01T02:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_becomes_invalid_marker() {
        let col = parse_timestamps(["2020-01-01 00:00:00", "", "0000-00-00 00:00:00", "NaN", "2020-01-02"]);
        assert_eq!(col.len(), 5);
        assert_eq!(col.validity(), vec![true, false, false, false, true]);
        assert_eq!(col.valid_count(), 2);
    }

    #[test]
    fn triples_skip_any_invalid_field() {
        let r = parse_timestamps(["2020-01-01", "2020-01-02", "bad"]);
        let s = parse_timestamps(["2019-01-01", "bad", "2019-01-03"]);
        let e = parse_timestamps(["2019-02-01", "2019-02-02", "2019-02-03"]);
        let t = valid_triples(&r, &s, &e);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].0, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(valid_pairs(&r, &e).len(), 2);
    }
}
