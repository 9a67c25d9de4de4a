//! Observability for the orgwatch dashboard client.
//!
//! - **Logging**: human-readable and JSON output via `tracing-subscriber`
//! - **Tracing**: trace/span id generation so every log line of one refresh
//!   cycle can be correlated
//! - **Metrics**: process-wide counters, gauges and histograms with
//!   Prometheus text export

pub mod logging;
pub mod metrics;
pub mod tracing_setup;
