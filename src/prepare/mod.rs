// Preparation: raw request logs in, per-service artifacts out.
// Parses timestamps, derives durations and topicality, and builds the
// data-source usage matrix.

pub mod timestamps;
pub mod derive;
pub mod sources;
pub mod records;
pub mod job;
