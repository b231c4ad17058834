//! PushSink: forwards pipeline output into an externally owned push handle.
//!
//! The sink never buffers. The pipeline only calls [`PushSink::on_element`]
//! after its own flow control has authorized the element, so backpressure is
//! inherited from the engine. If the transport needs flow control of its own,
//! that belongs to the handle.

use crate::element::PushHandle;
use crate::error::Error;
use crate::observability::{BridgeMetrics, trace_ignored};
use std::marker::PhantomData;

/// Configuration for a [`PushSink`].
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Name used in logs.
    pub name: String,
    /// Metric label; falls back to `name` when unset.
    pub metrics_label: Option<String>,
    /// Forward normal pipeline completion as `finish()`.
    ///
    /// Set to `false` when several producers share one external stream and
    /// only the last one should close it. Failures are forwarded regardless.
    pub close_on_complete: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: String::from("pushsink"),
            metrics_label: None,
            close_on_complete: true,
        }
    }
}

impl SinkConfig {
    /// Set the sink name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the metric label.
    pub fn with_metrics_label(mut self, label: impl Into<String>) -> Self {
        self.metrics_label = Some(label.into());
        self
    }

    /// Label used for this sink's metrics.
    pub fn metrics_label(&self) -> &str {
        self.metrics_label.as_deref().unwrap_or(&self.name)
    }

    /// Set whether completion closes the external stream.
    pub fn close_on_complete(mut self, close: bool) -> Self {
        self.close_on_complete = close;
        self
    }
}

/// Sink adapter from pipeline output to a [`PushHandle`].
///
/// # Example
///
/// ```rust,ignore
/// use scorestream::elements::{PushSink, SinkConfig};
/// use scorestream::transport::response_channel;
///
/// let (tx, responses) = response_channel::<u32>();
/// let mut sink = PushSink::new(tx);
///
/// sink.on_element(1);
/// sink.on_complete();
/// ```
pub struct PushSink<T, H> {
    handle: H,
    config: SinkConfig,
    terminated: bool,
    forwarded: u64,
    ignored: u64,
    metrics: BridgeMetrics,
    _marker: PhantomData<fn(T)>,
}

impl<T, H: PushHandle<T>> PushSink<T, H> {
    /// Create a sink with default settings (`close_on_complete = true`).
    pub fn new(handle: H) -> Self {
        Self::with_config(handle, SinkConfig::default())
    }

    /// Create a sink with a specific configuration.
    pub fn with_config(handle: H, config: SinkConfig) -> Self {
        Self {
            handle,
            metrics: BridgeMetrics::new(config.metrics_label()),
            config,
            terminated: false,
            forwarded: 0,
            ignored: 0,
            _marker: PhantomData,
        }
    }

    /// Forward one element to the external handle.
    pub fn on_element(&mut self, item: T) {
        if self.terminated {
            self.ignore("element");
            return;
        }
        self.handle.deliver(item);
        self.forwarded += 1;
        self.metrics.record_forwarded();
    }

    /// The pipeline completed normally.
    ///
    /// Calls `finish()` on the handle only when `close_on_complete` is set.
    pub fn on_complete(&mut self) {
        if self.terminated {
            self.ignore("complete");
            return;
        }
        self.terminated = true;
        self.metrics.record_eos();

        if self.config.close_on_complete {
            tracing::debug!("pushsink '{}': closing external stream", self.config.name);
            self.handle.finish();
        } else {
            tracing::debug!(
                "pushsink '{}': completion suppressed, external stream left open",
                self.config.name
            );
        }
    }

    /// The pipeline failed. Always forwarded as `fail(error)`.
    pub fn on_failed(&mut self, error: Error) {
        if self.terminated {
            self.ignore("failed");
            return;
        }
        self.terminated = true;
        self.metrics.record_failed();
        tracing::debug!("pushsink '{}': forwarding failure: {}", self.config.name, error);
        self.handle.fail(error);
    }

    /// Whether a terminal notification has been handled.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether completion closes the external stream.
    pub fn closes_on_complete(&self) -> bool {
        self.config.close_on_complete
    }

    /// Sink name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Borrow the external handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Release the external handle.
    pub fn into_inner(self) -> H {
        self.handle
    }

    /// Get statistics.
    pub fn stats(&self) -> PushSinkStats {
        PushSinkStats {
            forwarded: self.forwarded,
            ignored: self.ignored,
            terminated: self.terminated,
        }
    }

    fn ignore(&mut self, call: &'static str) {
        self.ignored += 1;
        self.metrics.record_ignored();
        trace_ignored(&self.config.name, call);
    }
}

/// Statistics about PushSink operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSinkStats {
    /// Elements forwarded to the handle.
    pub forwarded: u64,
    /// Notifications ignored after the terminal one.
    pub ignored: u64,
    /// Whether a terminal notification has been handled.
    pub terminated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Deliver(u32),
        Fail(Error),
        Finish,
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PushHandle<u32> for Recorder {
        fn deliver(&self, item: u32) {
            self.calls.lock().unwrap().push(Call::Deliver(item));
        }

        fn fail(&self, error: Error) {
            self.calls.lock().unwrap().push(Call::Fail(error));
        }

        fn finish(&self) {
            self.calls.lock().unwrap().push(Call::Finish);
        }
    }

    #[test]
    fn test_pushsink_forwards_then_finishes() {
        let recorder = Recorder::default();
        let mut sink = PushSink::new(recorder.clone());

        sink.on_element(1);
        sink.on_element(2);
        sink.on_complete();

        assert_eq!(
            recorder.calls(),
            vec![Call::Deliver(1), Call::Deliver(2), Call::Finish]
        );
        assert!(sink.is_terminated());
    }

    #[test]
    fn test_pushsink_completion_suppressed() {
        let recorder = Recorder::default();
        let config = SinkConfig::default().close_on_complete(false);
        let mut sink = PushSink::with_config(recorder.clone(), config);

        sink.on_element(1);
        sink.on_complete();

        assert_eq!(recorder.calls(), vec![Call::Deliver(1)]);
        assert!(sink.is_terminated());
    }

    #[test]
    fn test_pushsink_failure_never_suppressed() {
        let recorder = Recorder::default();
        let config = SinkConfig::default().close_on_complete(false);
        let mut sink: PushSink<u32, _> = PushSink::with_config(recorder.clone(), config);

        sink.on_failed(Error::Pipeline("boom".into()));

        assert_eq!(
            recorder.calls(),
            vec![Call::Fail(Error::Pipeline("boom".into()))]
        );
    }

    #[test]
    fn test_pushsink_terminal_idempotent() {
        let recorder = Recorder::default();
        let mut sink: PushSink<u32, _> = PushSink::new(recorder.clone());

        sink.on_complete();
        sink.on_complete();
        sink.on_failed(Error::Cancelled);
        sink.on_element(3);

        assert_eq!(recorder.calls(), vec![Call::Finish]);
        let stats = sink.stats();
        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.ignored, 3);
        assert!(stats.terminated);
    }

    #[test]
    fn test_pushsink_into_inner() {
        let recorder = Recorder::default();
        let sink: PushSink<u32, _> =
            PushSink::with_config(recorder, SinkConfig::default().with_name("out"));
        assert_eq!(sink.name(), "out");
        assert!(sink.closes_on_complete());
        let _recorder: Recorder = sink.into_inner();
    }
}
