pub mod artifacts;
pub mod style;
