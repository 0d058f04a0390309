// Analysis runs: per-product request charts, data-source usage and the
// cross-service comparison.

pub mod requests;
pub mod sources;
pub mod service_comparison;
