//! Daily usage of several services over their common lifetime.

use chrono::{DateTime, NaiveDate, Utc};

use super::bucket::{BucketWidth, bucket_counts_between};

/// Latest first instant to earliest last instant across all `series`.
/// `None` if any series is empty or the lifetimes do not overlap.
pub fn common_range(series: &[&[DateTime<Utc>]]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut range: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for s in series {
        let first = *s.iter().min()?;
        let last = *s.iter().max()?;
        range = Some(match range {
            None => (first, last),
            Some((from, to)) => (from.max(first), to.min(last)),
        });
    }
    range.filter(|(from, to)| from <= to)
}

/// Daily request counts per service on one shared day grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyUsage {
    pub services: Vec<String>,
    pub days: Vec<NaiveDate>,
    /// `counts[s][d]` is the count of service `s` on `days[d]`.
    pub counts: Vec<Vec<u64>>,
}

impl DailyUsage {
    /// Counts each service per day over `[from, to]`.
    pub fn build(
        services: &[(&str, &[DateTime<Utc>])],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Self {
        let mut days = Vec::new();
        let mut counts = Vec::with_capacity(services.len());
        for (i, (_, instants)) in services.iter().enumerate() {
            let buckets = bucket_counts_between(instants, BucketWidth::Day, from, to);
            if i == 0 {
                days = buckets.iter().map(|b| b.date()).collect();
            }
            counts.push(buckets.iter().map(|b| b.count).collect());
        }

        Self {
            services: services.iter().map(|(name, _)| name.to_string()).collect(),
            days,
            counts,
        }
    }

    /// Builds over the common range of all services; `None` when there is none.
    pub fn over_common_range(services: &[(&str, &[DateTime<Utc>])]) -> Option<Self> {
        let series: Vec<&[DateTime<Utc>]> = services.iter().map(|(_, s)| *s).collect();
        let (from, to) = common_range(&series)?;
        Some(Self::build(services, from, to))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    pub fn column(&self, service: &str) -> Option<&[u64]> {
        let idx = self.services.iter().position(|s| s == service)?;
        Some(&self.counts[idx])
    }

    /// Column as floats, for fitting and plotting.
    pub fn column_f64(&self, service: &str) -> Option<Vec<f64>> {
        self.column(service).map(|c| c.iter().map(|&v| v as f64).collect())
    }

    pub fn totals(&self) -> Vec<u64> {
        (0..self.days.len())
            .map(|d| self.counts.iter().map(|c| c[d]).sum())
            .collect()
    }

    /// Share of each service per day; every share is zero on a day without requests.
    pub fn fractions(&self) -> Vec<Vec<f64>> {
        let totals = self.totals();
        self.counts
            .iter()
            .map(|c| {
                c.iter()
                    .zip(&totals)
                    .map(|(&n, &t)| if t == 0 { 0.0 } else { n as f64 / t as f64 })
                    .collect()
            })
            .collect()
    }

    /// Running sum of [`fractions`](Self::fractions) in service order; the last
    /// layer is 1 on every day with requests.
    pub fn stacked_fractions(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.0; self.days.len()];
        self.fractions()
            .into_iter()
            .map(|f| {
                for (r, v) in running.iter_mut().zip(f) {
                    *r += v;
                }
                running.clone()
            })
            .collect()
    }

    /// Days strictly before `date`, and the rest.
    pub fn split_at(&self, date: NaiveDate) -> (DailyUsage, DailyUsage) {
        let cut = self.days.partition_point(|d| *d < date);
        let part = |range: std::ops::Range<usize>| DailyUsage {
            services: self.services.clone(),
            days: self.days[range.clone()].to_vec(),
            counts: self.counts.iter().map(|c| c[range.clone()].to_vec()).collect(),
        };
        (part(0..cut), part(cut..self.days.len()))
    }
}
