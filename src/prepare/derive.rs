//! Duration, midpoint and topicality derivation over columns of instants.
//!
//! Everything is in seconds (f64). Negative durations and topicalities are kept
//! as they are; the restriction predicate decides what they mean.

use chrono::{DateTime, TimeDelta, Utc};

use crate::prepare::timestamps::{ParsedColumn, valid_pairs, valid_triples};

/// Which observation boundary topicality is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicalityReference {
    Start,
    End,
}

impl TopicalityReference {
    pub fn name(&self) -> &'static str {
        match self {
            TopicalityReference::Start => "start",
            TopicalityReference::End => "end",
        }
    }
}

/// Display units for seconds at the chart boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Hour,
    Day,
    Year,
}

impl TimeUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Second => 1.0,
            TimeUnit::Hour => 3_600.0,
            TimeUnit::Day => 86_400.0,
            // Julian year
            TimeUnit::Year => 31_557_600.0,
        }
    }

    pub fn convert(&self, seconds: f64) -> f64 {
        seconds / self.seconds()
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Year => "yr",
        }
    }
}

/// Exact seconds of a chrono delta, sub-second part included.
pub fn delta_seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9
}

/// Derived columns for the records whose request, start and end all parsed.
///
/// All vectors have the same length and are index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedQuantities {
    pub request_times: Vec<DateTime<Utc>>,
    pub start_times: Vec<DateTime<Utc>>,
    pub end_times: Vec<DateTime<Utc>>,
    pub midpoints: Vec<DateTime<Utc>>,
    pub durations: Vec<f64>,
    /// request - start
    pub topicality_start: Vec<f64>,
    /// request - end
    pub topicality_end: Vec<f64>,
    /// Records dropped because one of the three instants was invalid.
    pub dropped: usize,
}

impl DerivedQuantities {
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn topicality(&self, reference: TopicalityReference) -> &[f64] {
        match reference {
            TopicalityReference::Start => &self.topicality_start,
            TopicalityReference::End => &self.topicality_end,
        }
    }

    /// Per-record observability: positive duration and request not before the window closed.
    pub fn observable(&self) -> Vec<bool> {
        self.durations
            .iter()
            .zip(&self.topicality_end)
            .map(|(&d, &t)| d > 0.0 && t >= 0.0)
            .collect()
    }
}

/// Derives durations, midpoints and both topicalities for every fully valid record.
pub fn derive_windows(
    request: &ParsedColumn,
    start: &ParsedColumn,
    end: &ParsedColumn,
) -> DerivedQuantities {
    let triples = valid_triples(request, start, end);
    let total = request.len().max(start.len()).max(end.len());

    let mut out = DerivedQuantities {
        dropped: total - triples.len(),
        ..Default::default()
    };

    for (r, s, e) in triples {
        let window = e - s;
        out.request_times.push(r);
        out.start_times.push(s);
        out.end_times.push(e);
        out.midpoints.push(s + window / 2);
        out.durations.push(delta_seconds(window));
        out.topicality_start.push(delta_seconds(r - s));
        out.topicality_end.push(delta_seconds(r - e));
    }

    out
}

/// Topicality for products with a single observation instant (screenshots).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTopicality {
    pub request_times: Vec<DateTime<Utc>>,
    pub topicality: Vec<f64>,
    pub dropped: usize,
}

pub fn derive_point_topicality(request: &ParsedColumn, observation: &ParsedColumn) -> PointTopicality {
    let pairs = valid_pairs(request, observation);
    let total = request.len().max(observation.len());

    PointTopicality {
        dropped: total - pairs.len(),
        request_times: pairs.iter().map(|(r, _)| *r).collect(),
        topicality: pairs.iter().map(|(r, o)| delta_seconds(*r - *o)).collect(),
    }
}
