//! Small helpers shared across layers.

pub mod datetime;
pub mod gzip;
