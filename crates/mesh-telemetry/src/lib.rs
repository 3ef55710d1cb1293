//! # Mesh Telemetry
//!
//! Observability for the agent mesh.
//!
//! This crate provides:
//! - Structured logging setup on top of `tracing-subscriber`
//! - Prometheus metrics for routing, agent invocations, discovery and heartbeats

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LogFormat, LoggingConfig, TelemetryError};
pub use metrics::{InvocationOutcome, MeshMetrics};
