//! PushSrc: turns a push-driven producer into a demand-gated pull stream.
//!
//! The transport holds a [`PushSrcHandle`] and calls it from its own threads.
//! The pipeline holds the [`PushSrc`] and raises demand with
//! [`PushSrc::request`]. Every handle call is posted to a single mailbox; only
//! the pull side drains it, so the pending queue and the stream state are
//! mutated from one execution context only.

use crate::element::{PullBatch, PushHandle, StreamState};
use crate::error::{Error, Result};
use crate::observability::{BridgeMetrics, trace_batch, trace_ignored};
use futures::Stream;
use kanal::{AsyncReceiver, Sender};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Configuration for a [`PushSrc`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Name used in logs and spans.
    pub name: String,
    /// Metric label; falls back to `name` when unset.
    ///
    /// Keep this bounded. Sources that share a label share their series.
    pub metrics_label: Option<String>,
    /// Maximum number of elements buffered between the handle and the
    /// consumer.
    ///
    /// `None` buffers without bound: everything delivered before the first
    /// `request()` stays in memory. With `Some(n)`, the delivery that would
    /// exceed `n` fails the stream with [`Error::Overflow`] instead.
    pub capacity: Option<usize>,
    /// Log every served batch at `trace` level.
    pub log_batches: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::from("pushsrc"),
            metrics_label: None,
            capacity: None,
            log_batches: false,
        }
    }
}

impl SourceConfig {
    /// Create a config with a bounded pending queue.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Default::default()
        }
    }

    /// Set the source name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the metric label.
    pub fn with_metrics_label(mut self, label: impl Into<String>) -> Self {
        self.metrics_label = Some(label.into());
        self
    }

    /// Label used for this source's metrics.
    pub fn metrics_label(&self) -> &str {
        self.metrics_label.as_deref().unwrap_or(&self.name)
    }

    /// Enable per-batch trace logging.
    pub fn with_batch_logging(mut self, enabled: bool) -> Self {
        self.log_batches = enabled;
        self
    }

    /// Reject configurations that can never accept an element.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            return Err(Error::InvalidConfig(format!(
                "source '{}': capacity must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// A mailbox message. One per handle call.
enum Signal<T> {
    Item(T),
    Fail(Error),
    Finish,
}

impl<T> Signal<T> {
    fn call(&self) -> &'static str {
        match self {
            Signal::Item(_) => "deliver",
            Signal::Fail(_) => "fail",
            Signal::Finish => "finish",
        }
    }
}

/// State shared by the handle and the pull side.
///
/// Only counters and gates live here; the queue itself is owned by
/// [`PushSrc`].
struct Shared {
    name: String,
    capacity: Option<usize>,
    /// Set by the first terminal call; later calls are ignored.
    terminated: AtomicBool,
    /// Set when the pull side is dropped.
    detached: AtomicBool,
    /// Elements accepted but not yet served (mailbox + pending queue).
    in_flight: AtomicUsize,
    /// Elements accepted and not discarded. While attached this equals
    /// emitted plus in flight.
    total_delivered: AtomicU64,
    total_ignored: AtomicU64,
    metrics: BridgeMetrics,
}

impl Shared {
    fn ignore(&self, call: &'static str) {
        self.total_ignored.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_ignored();
        trace_ignored(&self.name, call);
    }

    /// Count one element in flight; returns the previous count.
    fn admit(&self) -> usize {
        self.metrics.add_pending(1);
        self.in_flight.fetch_add(1, Ordering::AcqRel)
    }

    /// Release `n` elements from the in-flight count.
    fn release(&self, n: usize) {
        self.in_flight.fetch_sub(n, Ordering::AcqRel);
        self.metrics.sub_pending(n);
    }
}

/// Handle for pushing elements into a [`PushSrc`].
///
/// Cheap to clone and safe to call from any thread. Clones share the terminal
/// gate, so at most one `fail`/`finish` across all clones is honored.
pub struct PushSrcHandle<T> {
    tx: Sender<Signal<T>>,
    shared: Arc<Shared>,
}

impl<T> Clone for PushSrcHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send> PushSrcHandle<T> {
    /// Whether a terminal call has already been made on this handle.
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }

    /// Whether the pull side has been dropped.
    ///
    /// After cancellation every call is silently ignored.
    pub fn is_cancelled(&self) -> bool {
        self.shared.detached.load(Ordering::Acquire)
    }

    /// Elements accepted but not yet served to the consumer.
    pub fn queued(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Name of the source this handle feeds.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    fn terminate(&self, signal: Signal<T>, call: &'static str) {
        if self.shared.terminated.swap(true, Ordering::AcqRel) {
            self.shared.ignore(call);
            return;
        }
        if self.tx.send(signal).is_err() {
            tracing::debug!("pushsrc '{}': {} after detach", self.shared.name, call);
        }
    }
}

impl<T: Send> PushHandle<T> for PushSrcHandle<T> {
    fn deliver(&self, item: T) {
        let shared = &*self.shared;
        if shared.terminated.load(Ordering::Acquire) || shared.detached.load(Ordering::Acquire) {
            shared.ignore("deliver");
            return;
        }

        let queued = shared.admit();
        if let Some(capacity) = shared.capacity {
            if queued >= capacity {
                shared.release(1);
                tracing::warn!(
                    "pushsrc '{}': pending queue full ({} elements), failing stream",
                    shared.name,
                    capacity
                );
                self.terminate(Signal::Fail(Error::Overflow { capacity }), "deliver");
                return;
            }
        }

        // Counted before the send so a discard on the pull side always
        // observes it.
        shared.total_delivered.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(Signal::Item(item)).is_err() {
            shared.total_delivered.fetch_sub(1, Ordering::AcqRel);
            shared.release(1);
            shared.ignore("deliver");
        }
    }

    fn fail(&self, error: Error) {
        self.terminate(Signal::Fail(error), "fail");
    }

    fn finish(&self) {
        self.terminate(Signal::Finish, "finish");
    }
}

/// Pull side of the bridge.
///
/// # Example
///
/// ```rust,ignore
/// use scorestream::elements::PushSrc;
/// use scorestream::element::PushHandle;
///
/// let (mut src, handle) = PushSrc::<u32>::channel();
///
/// // Transport thread:
/// handle.deliver(1);
/// handle.finish();
///
/// // Pipeline task:
/// let batch = src.request().await;
/// assert_eq!(batch.items, vec![1]);
/// assert!(batch.is_terminal());
/// ```
pub struct PushSrc<T> {
    rx: AsyncReceiver<Signal<T>>,
    shared: Arc<Shared>,
    queue: VecDeque<T>,
    state: StreamState,
    log_batches: bool,
    total_emitted: u64,
    batches: u64,
}

impl<T: Send> PushSrc<T> {
    /// Create a paired pull stream and push handle with default settings.
    pub fn channel() -> (Self, PushSrcHandle<T>) {
        Self::create(SourceConfig::default())
    }

    /// Create a paired pull stream and push handle.
    ///
    /// The two halves share this adapter's state and are created exactly once
    /// per stream.
    pub fn create(config: SourceConfig) -> (Self, PushSrcHandle<T>) {
        let (tx, rx) = kanal::unbounded();
        let shared = Arc::new(Shared {
            metrics: BridgeMetrics::new(config.metrics_label()),
            name: config.name,
            capacity: config.capacity,
            terminated: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            total_delivered: AtomicU64::new(0),
            total_ignored: AtomicU64::new(0),
        });

        let src = Self {
            rx: rx.to_async(),
            shared: Arc::clone(&shared),
            queue: VecDeque::new(),
            state: StreamState::NotStarted,
            log_batches: config.log_batches,
            total_emitted: 0,
            batches: 0,
        };

        (src, PushSrcHandle { tx, shared })
    }

    /// Raise demand and wait until it can be served.
    ///
    /// - A non-empty backlog is returned whole, as one ordered batch.
    /// - Once the stream has ended, the terminal signal rides on the batch that
    ///   drains the last elements, and every later call returns it again with
    ///   no elements.
    /// - Otherwise this suspends until the next `deliver`, `fail` or `finish`.
    pub async fn request(&mut self) -> PullBatch<T> {
        self.start();
        loop {
            self.drain_mailbox();
            if let Some(batch) = self.serve() {
                return batch;
            }

            match self.rx.recv().await {
                Ok(signal) => self.apply(signal),
                Err(_) => self.on_disconnect(),
            }
        }
    }

    /// Raise demand without suspending.
    ///
    /// Returns `None` where [`request`](Self::request) would suspend.
    pub fn try_request(&mut self) -> Option<PullBatch<T>> {
        self.start();
        self.drain_mailbox();
        self.serve()
    }

    /// Adapt into a `Stream` of batches.
    ///
    /// The stream yields `Ok(batch)` for every non-empty batch, then either
    /// ends (completion) or yields one `Err` (failure) and ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>>>
    where
        T: 'static,
    {
        enum Step<T> {
            Pulling(PushSrc<T>),
            Failing(Error),
            Done,
        }

        futures::stream::unfold(Step::Pulling(self), |step| async move {
            match step {
                Step::Pulling(mut src) => {
                    let batch = src.request().await;
                    match batch.end {
                        None => Some((Ok(batch.items), Step::Pulling(src))),
                        Some(end) => match end.into_result() {
                            Ok(()) if batch.items.is_empty() => None,
                            Ok(()) => Some((Ok(batch.items), Step::Done)),
                            Err(e) if batch.items.is_empty() => Some((Err(e), Step::Done)),
                            Err(e) => Some((Ok(batch.items), Step::Failing(e))),
                        },
                    }
                }
                Step::Failing(e) => Some((Err(e), Step::Done)),
                Step::Done => None,
            }
        })
    }

    /// Current stream state.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Whether the terminal signal has been observed.
    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Get statistics.
    pub fn stats(&self) -> PushSrcStats {
        PushSrcStats {
            queued: self.shared.in_flight.load(Ordering::Acquire),
            total_delivered: self.shared.total_delivered.load(Ordering::Acquire),
            total_emitted: self.total_emitted,
            total_ignored: self.shared.total_ignored.load(Ordering::Relaxed),
            batches: self.batches,
            state: self.state.clone(),
        }
    }

    fn start(&mut self) {
        if self.state == StreamState::NotStarted {
            tracing::debug!("pushsrc '{}': first demand", self.shared.name);
            self.state = StreamState::Started;
        }
    }

    /// Move everything currently in the mailbox into the pending queue.
    fn drain_mailbox(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(Some(signal)) => self.apply(signal),
                Ok(None) => break,
                Err(_) => {
                    self.on_disconnect();
                    break;
                }
            }
        }
    }

    fn apply(&mut self, signal: Signal<T>) {
        if self.state.is_terminal() {
            // An element that passed the gate just before the terminal call.
            if matches!(signal, Signal::Item(_)) {
                self.shared.total_delivered.fetch_sub(1, Ordering::AcqRel);
                self.shared.release(1);
            }
            self.shared.ignore(signal.call());
            return;
        }

        match signal {
            Signal::Item(item) => {
                self.shared.metrics.record_delivered();
                self.queue.push_back(item);
            }
            Signal::Fail(e) => {
                tracing::debug!("pushsrc '{}': failed: {}", self.shared.name, e);
                self.shared.metrics.record_failed();
                self.state = StreamState::Failed(e);
            }
            Signal::Finish => {
                tracing::debug!("pushsrc '{}': finished", self.shared.name);
                self.shared.metrics.record_eos();
                self.state = StreamState::Completed;
            }
        }
    }

    /// Every handle was dropped.
    fn on_disconnect(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        tracing::warn!(
            "pushsrc '{}': push handle dropped without a terminal signal",
            self.shared.name
        );
        self.shared.metrics.record_failed();
        self.state = StreamState::Failed(Error::Transport(
            "push handle dropped without a terminal signal".into(),
        ));
    }

    /// Serve demand from the pending queue, or `None` to suspend.
    fn serve(&mut self) -> Option<PullBatch<T>> {
        let end = self.state.end();
        if self.queue.is_empty() && end.is_none() {
            return None;
        }

        let items: Vec<T> = self.queue.drain(..).collect();
        if !items.is_empty() {
            self.shared.release(items.len());
            self.total_emitted += items.len() as u64;
            self.batches += 1;
            self.shared.metrics.record_batch(items.len());
        }
        if self.log_batches {
            trace_batch(&self.shared.name, items.len(), end.is_some());
        }

        Some(PullBatch { items, end })
    }
}

impl<T> Drop for PushSrc<T> {
    fn drop(&mut self) {
        self.shared.detached.store(true, Ordering::Release);

        let mut stranded = self.queue.len();
        while let Ok(Some(signal)) = self.rx.try_recv() {
            if matches!(signal, Signal::Item(_)) {
                stranded += 1;
            }
        }
        if stranded > 0 {
            self.shared.release(stranded);
        }

        if !self.state.is_terminal() {
            tracing::debug!(
                "pushsrc '{}': detached before terminal signal ({} queued)",
                self.shared.name,
                self.queue.len()
            );
        }
    }
}

/// Statistics about PushSrc operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PushSrcStats {
    /// Elements accepted but not yet served.
    pub queued: usize,
    /// Total elements accepted by the handle.
    pub total_delivered: u64,
    /// Total elements served to the consumer.
    pub total_emitted: u64,
    /// Calls ignored because the stream was already terminal or detached.
    pub total_ignored: u64,
    /// Non-empty batches served.
    pub batches: u64,
    /// Stream state as seen by the pull side.
    pub state: StreamState,
}
