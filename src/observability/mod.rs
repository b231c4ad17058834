//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters, gauges, and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `scorestream_elements_delivered` | Counter | Elements accepted into a pending queue |
//! | `scorestream_elements_emitted` | Counter | Elements served to the pull side |
//! | `scorestream_elements_ignored` | Counter | Calls after a terminal signal |
//! | `scorestream_elements_forwarded` | Counter | Elements leaving a sink adapter |
//! | `scorestream_batches_emitted` | Counter | Batches served on demand |
//! | `scorestream_terminal_signals` | Counter | Terminal signals by kind |
//! | `scorestream_pending_depth` | Gauge | Elements buffered across sources sharing a label |
//! | `scorestream_score_latency_ns` | Histogram | Per-record scoring time |
//!
//! Every series carries a `stream` label taken from the adapter's metrics
//! label, which defaults to its name. No recorder is installed by the library;
//! plug in any `metrics` exporter.

mod metrics;
mod tracing_support;

pub use metrics::{BridgeMetrics, ScoreTimer, init_metrics};
pub use tracing_support::{TracingConfig, span_stream, trace_batch, trace_ignored};

#[cfg(test)]
pub(crate) use tracing_support::capture;
