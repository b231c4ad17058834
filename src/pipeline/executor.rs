//! Stream executor using Tokio.
//!
//! The executor spawns one Tokio task per stream. That task is the stream's
//! single execution context: it raises demand on the [`PushSrc`], runs the
//! transform, and feeds the [`PushSink`]. Transport threads never touch the
//! pipeline directly; they only post to the source adapter's mailbox.

use crate::element::{PushHandle, StreamEnd};
use crate::elements::{PushSink, PushSrc};
use crate::error::{Error, Result};
use crate::observability::{TracingConfig, trace_batch};
use crate::pipeline::{EventReceiver, EventSender, StreamEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Configuration for the stream executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Name used for the stream span and logs.
    pub name: String,
    /// On cancellation, fail the sink's handle with [`Error::Cancelled`].
    ///
    /// When `false`, a cancelled stream leaves the external handle untouched
    /// and the transport is expected to notice the detached source itself.
    pub signal_cancel: bool,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Span settings for the stream task.
    pub tracing: TracingConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: String::from("stream"),
            signal_cancel: true,
            event_capacity: 64,
            tracing: TracingConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Set the stream name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set whether cancellation is signalled to the sink.
    pub fn signal_cancel(mut self, signal: bool) -> Self {
        self.signal_cancel = signal;
        self
    }
}

/// How a stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The source completed and every element reached the sink.
    Completed,
    /// The source or the transform failed.
    Failed(Error),
    /// The stream was cancelled through its handle.
    Cancelled,
}

/// Statistics for a finished stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStats {
    /// Non-empty batches pulled from the source.
    pub batches: u64,
    /// Elements forwarded to the sink.
    pub elements: u64,
    /// Terminal outcome.
    pub outcome: StreamOutcome,
}

/// Handle to a running stream.
pub struct StreamHandle {
    task: JoinHandle<StreamStats>,
    cancel: Option<oneshot::Sender<()>>,
    events: EventSender,
}

impl StreamHandle {
    /// Wait for the stream to finish.
    ///
    /// Returns the stream statistics; the outcome inside them tells how the
    /// stream ended. An `Err` means the stream task itself panicked.
    pub async fn wait(self) -> Result<StreamStats> {
        self.task
            .await
            .map_err(|e| Error::Pipeline(format!("stream task panicked: {e}")))
    }

    /// Cancel the stream.
    ///
    /// The task stops at its next suspension point and detaches from the
    /// source. Calling this more than once has no further effect.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Whether the stream task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Subscribe to stream events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }
}

/// Executor that drives a source adapter through a transform into a sink
/// adapter.
pub struct StreamExecutor {
    config: ExecutorConfig,
}

impl StreamExecutor {
    /// Create a new executor with default configuration.
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
        }
    }

    /// Create a new executor with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Get the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a stream to completion.
    pub async fn run<I, O, H, F>(
        &self,
        source: PushSrc<I>,
        transform: F,
        sink: PushSink<O, H>,
    ) -> Result<StreamStats>
    where
        I: Send + 'static,
        O: Send + 'static,
        H: PushHandle<O> + 'static,
        F: FnMut(I) -> Result<O> + Send + 'static,
    {
        self.start(source, transform, sink).wait().await
    }

    /// Start a stream and return a handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<I, O, H, F>(
        &self,
        source: PushSrc<I>,
        transform: F,
        sink: PushSink<O, H>,
    ) -> StreamHandle
    where
        I: Send + 'static,
        O: Send + 'static,
        H: PushHandle<O> + 'static,
        F: FnMut(I) -> Result<O> + Send + 'static,
    {
        let events = EventSender::new(self.config.event_capacity);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let span = self.config.tracing.span(&self.config.name);

        let task = tokio::spawn(
            drive(
                self.config.clone(),
                source,
                transform,
                sink,
                cancel_rx,
                events.clone(),
            )
            .instrument(span),
        );

        StreamHandle {
            task,
            cancel: Some(cancel_tx),
            events,
        }
    }
}

impl Default for StreamExecutor {
    fn default() -> Self {
        Self::new()
    }
}

async fn drive<I, O, H, F>(
    config: ExecutorConfig,
    mut source: PushSrc<I>,
    mut transform: F,
    mut sink: PushSink<O, H>,
    mut cancel: oneshot::Receiver<()>,
    events: EventSender,
) -> StreamStats
where
    I: Send,
    H: PushHandle<O>,
    F: FnMut(I) -> Result<O>,
{
    tracing::debug!("stream '{}' started", config.name);
    events.send(StreamEvent::Started);

    let mut batches: u64 = 0;
    let mut elements: u64 = 0;
    // Dropping the StreamHandle without cancelling leaves the stream running.
    let mut cancel_armed = true;

    let outcome = 'drive: loop {
        let batch = tokio::select! {
            biased;
            res = &mut cancel, if cancel_armed => {
                match res {
                    Ok(()) => break 'drive StreamOutcome::Cancelled,
                    Err(_) => {
                        cancel_armed = false;
                        continue;
                    }
                }
            }
            batch = source.request() => batch,
        };

        if !batch.items.is_empty() {
            batches += 1;
            events.send(StreamEvent::Batch {
                len: batch.items.len(),
            });
        }
        if config.tracing.batch_events {
            trace_batch(&config.name, batch.items.len(), batch.end.is_some());
        }

        for item in batch.items {
            match transform(item) {
                Ok(output) => {
                    sink.on_element(output);
                    elements += 1;
                }
                Err(e) => {
                    tracing::error!("stream '{}': transform error: {}", config.name, e);
                    break 'drive StreamOutcome::Failed(e);
                }
            }
        }

        match batch.end {
            None => continue,
            Some(StreamEnd::Eos) => break StreamOutcome::Completed,
            Some(StreamEnd::Failed(e)) => {
                tracing::debug!("stream '{}': source failed: {}", config.name, e);
                break StreamOutcome::Failed(e);
            }
        }
    };

    // Release the source adapter before notifying the sink.
    drop(source);

    match &outcome {
        StreamOutcome::Completed => {
            sink.on_complete();
            events.send_eos();
        }
        StreamOutcome::Failed(e) => {
            sink.on_failed(e.clone());
            events.send_error(e.to_string());
        }
        StreamOutcome::Cancelled => {
            tracing::debug!("stream '{}' cancelled", config.name);
            if config.signal_cancel {
                sink.on_failed(Error::Cancelled);
            }
            events.send(StreamEvent::Cancelled);
        }
    }

    tracing::debug!(
        "stream '{}' finished ({} batches, {} elements)",
        config.name,
        batches,
        elements
    );

    StreamStats {
        batches,
        elements,
        outcome,
    }
}
