//! Helioviewer request analytics.
//!
//! Request logs of helioviewer.org and JHelioviewer are prepared once into
//! per-service CSV artifacts (`prepare`), then aggregated (`aggregate`) and
//! drawn (`charts`) by the analysis runs (`analysis`).

pub mod config;
pub mod error;
pub mod prepare;
pub mod aggregate;
pub mod utils;
pub mod charts;
pub mod analysis;
