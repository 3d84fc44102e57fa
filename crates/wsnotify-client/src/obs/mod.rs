//! Lightweight in-process metrics.
//!
//! Counters are stored as atomics and rendered in Prometheus text format on
//! demand, so hosts can scrape or log them without extra crates.

pub mod metrics;

pub use metrics::ClientMetrics;
