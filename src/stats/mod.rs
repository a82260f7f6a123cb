//! Statistics and metrics

pub mod metrics;

pub use metrics::{HubMetrics, HubStats};
