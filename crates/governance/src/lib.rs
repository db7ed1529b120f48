#![deny(unused)]
//! Admission policy for vibegate.
//!
//! This crate provides:
//! - Content screening (injection detection, PII redaction)
//! - Per-agent request-frequency limiting
//! - Tracing configuration
//! - Prometheus metrics helpers

pub mod metrics;
pub mod rate_limit;
pub mod screen;
pub mod tracing_layer;

pub use metrics::{setup_metrics_recorder, track_request, track_tokens};
pub use rate_limit::FixedWindowLimiter;
pub use screen::{ContentScreen, RedactionRule};
pub use tracing_layer::configure_tracing;
