// Aggregation over prepared quantities: restrictions, calendar buckets,
// summary statistics and multi-service daily usage.

pub mod restriction;
pub mod bucket;
pub mod stats;
pub mod usage;
