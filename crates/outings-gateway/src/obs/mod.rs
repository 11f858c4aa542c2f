//! Observability (metrics) for the outings gateway.
//!
//! Exposes the in-process metrics registry rendered by `GET /metrics`.

pub mod metrics;

pub use metrics::RealtimeMetrics;
