//! Metrics collection using metrics-rs.

use metrics::{Counter, Gauge, Histogram, Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const ELEMENTS_DELIVERED: &str = "scorestream_elements_delivered";
const ELEMENTS_EMITTED: &str = "scorestream_elements_emitted";
const ELEMENTS_IGNORED: &str = "scorestream_elements_ignored";
const ELEMENTS_FORWARDED: &str = "scorestream_elements_forwarded";
const BATCHES_EMITTED: &str = "scorestream_batches_emitted";
const TERMINAL_SIGNALS: &str = "scorestream_terminal_signals";
const PENDING_DEPTH: &str = "scorestream_pending_depth";
const SCORE_LATENCY_NS: &str = "scorestream_score_latency_ns";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        ELEMENTS_DELIVERED,
        Unit::Count,
        "Elements accepted by a push handle"
    );
    metrics::describe_counter!(
        ELEMENTS_EMITTED,
        Unit::Count,
        "Elements handed to the pull-side consumer"
    );
    metrics::describe_counter!(
        ELEMENTS_IGNORED,
        Unit::Count,
        "Calls ignored because the stream was already terminal"
    );
    metrics::describe_counter!(
        ELEMENTS_FORWARDED,
        Unit::Count,
        "Elements forwarded by a sink adapter to an external handle"
    );
    metrics::describe_counter!(
        BATCHES_EMITTED,
        Unit::Count,
        "Batches served in answer to demand"
    );
    metrics::describe_counter!(
        TERMINAL_SIGNALS,
        Unit::Count,
        "Terminal signals observed, labelled by kind"
    );
    metrics::describe_gauge!(
        PENDING_DEPTH,
        Unit::Count,
        "Elements buffered in source adapters' pending queues"
    );
    metrics::describe_histogram!(
        SCORE_LATENCY_NS,
        Unit::Nanoseconds,
        "Time to assemble features and score one record"
    );
}

/// Metrics for one bridge adapter.
///
/// Handles are resolved once with the adapter's labels so the hot path only
/// touches pre-registered counters. The label is meant to be bounded: every
/// adapter created with the same label shares one set of series, so per-call
/// identifiers belong in spans and log lines, not here.
#[derive(Clone)]
pub struct BridgeMetrics {
    stream: String,
    delivered: Counter,
    emitted: Counter,
    ignored: Counter,
    forwarded: Counter,
    batches: Counter,
    eos: Counter,
    failed: Counter,
    pending: Gauge,
    score_latency: Histogram,
}

impl BridgeMetrics {
    /// Create metrics labelled with the stream name.
    pub fn new(stream: &str) -> Self {
        let label = stream.to_string();
        Self {
            delivered: counter!(ELEMENTS_DELIVERED, "stream" => label.clone()),
            emitted: counter!(ELEMENTS_EMITTED, "stream" => label.clone()),
            ignored: counter!(ELEMENTS_IGNORED, "stream" => label.clone()),
            forwarded: counter!(ELEMENTS_FORWARDED, "stream" => label.clone()),
            batches: counter!(BATCHES_EMITTED, "stream" => label.clone()),
            eos: counter!(TERMINAL_SIGNALS, "stream" => label.clone(), "kind" => "eos"),
            failed: counter!(TERMINAL_SIGNALS, "stream" => label.clone(), "kind" => "failed"),
            pending: gauge!(PENDING_DEPTH, "stream" => label.clone()),
            score_latency: histogram!(SCORE_LATENCY_NS, "stream" => label.clone()),
            stream: label,
        }
    }

    /// An element was accepted into a pending queue.
    #[inline]
    pub fn record_delivered(&self) {
        self.delivered.increment(1);
    }

    /// A batch of `len` elements was served to the consumer.
    #[inline]
    pub fn record_batch(&self, len: usize) {
        self.batches.increment(1);
        self.emitted.increment(len as u64);
    }

    /// A call arrived after the terminal signal.
    #[inline]
    pub fn record_ignored(&self) {
        self.ignored.increment(1);
    }

    /// An element left a sink adapter.
    #[inline]
    pub fn record_forwarded(&self) {
        self.forwarded.increment(1);
    }

    /// The stream completed normally.
    #[inline]
    pub fn record_eos(&self) {
        self.eos.increment(1);
    }

    /// The stream failed.
    #[inline]
    pub fn record_failed(&self) {
        self.failed.increment(1);
    }

    /// `n` elements entered the pending queue.
    #[inline]
    pub fn add_pending(&self, n: usize) {
        self.pending.increment(n as f64);
    }

    /// `n` elements left the pending queue.
    #[inline]
    pub fn sub_pending(&self, n: usize) {
        self.pending.decrement(n as f64);
    }

    /// Start a timer that records score latency on drop.
    pub fn start_score_timer(&self) -> ScoreTimer<'_> {
        ScoreTimer {
            start: Instant::now(),
            histogram: &self.score_latency,
        }
    }

    /// Get the stream label.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

/// Guard that records score latency when dropped.
pub struct ScoreTimer<'a> {
    start: Instant,
    histogram: &'a Histogram,
}

impl Drop for ScoreTimer<'_> {
    fn drop(&mut self) {
        self.histogram
            .record(self.start.elapsed().as_nanos() as f64);
    }
}
