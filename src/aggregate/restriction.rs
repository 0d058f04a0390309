//! Restriction predicates over derived quantities.

use std::{fmt, str::FromStr};

use crate::error::AnalysisError;
use crate::prepare::derive::{DerivedQuantities, TopicalityReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    /// Positive duration and requested no earlier than the window end.
    Observable,
    /// Positive duration only; keeps requests whose timing could not be verified.
    PositiveRequestedDuration,
}

impl Restriction {
    pub fn name(&self) -> &'static str {
        match self {
            Restriction::Observable => "observable",
            Restriction::PositiveRequestedDuration => "positive requested duration",
        }
    }

    /// One flag per record of `derived`.
    pub fn mask(&self, derived: &DerivedQuantities) -> Vec<bool> {
        match self {
            Restriction::Observable => derived.observable(),
            Restriction::PositiveRequestedDuration => derived.durations.iter().map(|&d| d > 0.0).collect(),
        }
    }

    /// Restricted `(topicality, duration)` columns, topicality measured against `reference`.
    pub fn apply(&self, derived: &DerivedQuantities, reference: TopicalityReference) -> Restricted {
        let mask = self.mask(derived);
        let topicality = derived.topicality(reference);

        let mut out = Restricted::default();
        for (i, keep) in mask.into_iter().enumerate() {
            if keep {
                out.topicality.push(topicality[i]);
                out.durations.push(derived.durations[i]);
            }
        }
        out
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Restriction {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "observable" => Ok(Restriction::Observable),
            "positive requested duration" => Ok(Restriction::PositiveRequestedDuration),
            other => Err(AnalysisError::UnknownRestriction(other.to_string())),
        }
    }
}

/// Columns surviving a restriction, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restricted {
    pub topicality: Vec<f64>,
    pub durations: Vec<f64>,
}

impl Restricted {
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}
