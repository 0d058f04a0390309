//! Fixed-width calendar bucketing of request instants.
//!
//! Buckets are keyed by their start instant (UTC midnight of the first day) and
//! always come back gap-free and in chronological order.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketWidth {
    Day,
    Quarter,
    Year,
}

impl BucketWidth {
    pub fn name(&self) -> &'static str {
        match self {
            BucketWidth::Day => "day",
            BucketWidth::Quarter => "quarter",
            BucketWidth::Year => "year",
        }
    }

    /// First day of the bucket containing `date`.
    pub fn start_date(&self, date: NaiveDate) -> NaiveDate {
        let (year, month) = match self {
            BucketWidth::Day => return date,
            BucketWidth::Quarter => (date.year(), (date.month0() / 3) * 3 + 1),
            BucketWidth::Year => (date.year(), 1),
        };
        // Day 1 of Jan/Apr/Jul/Oct always exists.
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
    }

    /// First day of the bucket after the one starting at `start`.
    pub fn next_date(&self, start: NaiveDate) -> NaiveDate {
        match self {
            BucketWidth::Day => start.succ_opt().unwrap_or(NaiveDate::MAX),
            BucketWidth::Quarter => start
                .checked_add_months(Months::new(3))
                .unwrap_or(NaiveDate::MAX),
            BucketWidth::Year => start
                .checked_add_months(Months::new(12))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn bucket_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        midnight(self.start_date(instant.date_naive()))
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub count: u64,
}

impl Bucket {
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Counts per bucket from the first to the last observed instant.
pub fn bucket_counts(instants: &[DateTime<Utc>], width: BucketWidth) -> Vec<Bucket> {
    let (Some(first), Some(last)) = (instants.iter().min(), instants.iter().max()) else {
        return Vec::new();
    };
    bucket_counts_between(instants, width, *first, *last)
}

/// Counts per bucket for every bucket touching `[from, to]`.
///
/// Instants outside `[from, to]` are ignored; an instant on a bucket boundary
/// belongs to the bucket it starts.
pub fn bucket_counts_between(
    instants: &[DateTime<Utc>],
    width: BucketWidth,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<Bucket> {
    if from > to {
        return Vec::new();
    }

    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for t in instants.iter().filter(|t| from <= **t && **t <= to) {
        *counts.entry(width.start_date(t.date_naive())).or_insert(0) += 1;
    }

    let last = width.start_date(to.date_naive());
    let mut day = width.start_date(from.date_naive());
    let mut out = Vec::new();
    while day <= last {
        out.push(Bucket {
            start: midnight(day),
            count: counts.get(&day).copied().unwrap_or(0),
        });
        let next = width.next_date(day);
        if next <= day {
            break;
        }
        day = next;
    }
    out
}

/// Count column of a bucket sequence.
pub fn counts(buckets: &[Bucket]) -> Vec<u64> {
    buckets.iter().map(|b| b.count).collect()
}
