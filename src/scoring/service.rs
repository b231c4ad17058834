//! Scoring service: one bridged stream per call.
//!
//! ```text
//! transport ──PushSrcHandle<Record>──> PushSrc ──> assemble + score ──> PushSink ──> response handle
//! ```

use crate::element::PushHandle;
use crate::elements::{PushSink, PushSrc, PushSrcHandle, SinkConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::observability::{BridgeMetrics, init_metrics};
use crate::pipeline::{ExecutorConfig, StreamExecutor, StreamHandle, StreamStats};
use crate::scoring::{FeatureTransform, Model, Record};
use crate::transport::{ResponseStream, response_channel};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One scored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Identifier of the input record.
    pub id: String,
    /// Model output.
    pub value: f32,
}

/// Configuration for a [`ScoringService`].
///
/// Per-call adapter names are derived from the configured names plus the
/// call number. Metrics stay labelled with the configured names, so the number
/// of series does not grow with the number of calls.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Source adapter settings (input side).
    pub source: SourceConfig,
    /// Sink adapter settings (output side).
    pub sink: SinkConfig,
    /// Executor settings.
    pub executor: ExecutorConfig,
}

impl ServiceConfig {
    /// Bound the per-call pending queue.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.source.capacity = Some(capacity);
        self
    }

    /// Set whether normal completion closes the response stream.
    pub fn close_on_complete(mut self, close: bool) -> Self {
        self.sink.close_on_complete = close;
        self
    }

    /// Set whether a cancelled call fails its response stream.
    pub fn signal_cancel(mut self, signal: bool) -> Self {
        self.executor.signal_cancel = signal;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        if self.executor.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Scores streams of records with one model.
pub struct ScoringService {
    model: Arc<dyn Model>,
    features: Arc<dyn FeatureTransform>,
    config: ServiceConfig,
    calls: AtomicU64,
}

impl ScoringService {
    /// Create a service with default configuration.
    pub fn new(model: impl Model + 'static, features: impl FeatureTransform + 'static) -> Self {
        init_metrics();
        Self {
            model: Arc::new(model),
            features: Arc::new(features),
            config: ServiceConfig::default(),
            calls: AtomicU64::new(0),
        }
    }

    /// Create a service with a specific configuration.
    ///
    /// Fails if the configuration is invalid or the feature dimension does
    /// not match the model.
    pub fn with_config(
        model: impl Model + 'static,
        features: impl FeatureTransform + 'static,
        config: ServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        init_metrics();
        if let Some(dim) = model.dimension() {
            if dim != features.dimension() {
                return Err(Error::InvalidConfig(format!(
                    "model '{}' expects {} features, transform produces {}",
                    model.name(),
                    dim,
                    features.dimension()
                )));
            }
        }
        Ok(Self {
            model: Arc::new(model),
            features: Arc::new(features),
            config,
            calls: AtomicU64::new(0),
        })
    }

    /// Score a single record synchronously.
    pub fn score_one(&self, record: &Record) -> Result<Score> {
        score_record(self.model.as_ref(), self.features.as_ref(), record)
    }

    /// Open a scoring call writing into `response`.
    ///
    /// The returned call exposes the push handle the transport feeds with
    /// incoming records. Must be called from within a Tokio runtime.
    pub fn open_call<H>(&self, response: H) -> ScoringCall
    where
        H: PushHandle<Score> + 'static,
    {
        let id = self.calls.fetch_add(1, Ordering::Relaxed);

        let source = &self.config.source;
        let source_config = source
            .clone()
            .with_metrics_label(source.metrics_label())
            .with_name(format!("{}-{}", source.name, id));
        let sink = &self.config.sink;
        let sink_config = sink
            .clone()
            .with_metrics_label(sink.metrics_label())
            .with_name(format!("{}-{}", sink.name, id));
        let executor_config = self
            .config
            .executor
            .clone()
            .with_name(format!("{}-{}", self.config.executor.name, id));

        let (source, input) = PushSrc::create(source_config);
        let sink = PushSink::with_config(response, sink_config);

        let model = Arc::clone(&self.model);
        let features = Arc::clone(&self.features);
        let metrics = BridgeMetrics::new(&self.config.executor.name);
        let transform = move |record: Record| {
            let _timer = metrics.start_score_timer();
            score_record(model.as_ref(), features.as_ref(), &record)
        };

        tracing::debug!("opening scoring call {} with model '{}'", id, self.model.name());
        let stream = StreamExecutor::with_config(executor_config).start(source, transform, sink);

        ScoringCall { id, input, stream }
    }

    /// Server-streaming convenience: score `records` and return the response
    /// stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn score_stream<I>(&self, records: I) -> ResponseStream<Score>
    where
        I: IntoIterator<Item = Record>,
    {
        let (tx, responses) = response_channel();
        let call = self.open_call(tx);
        for record in records {
            call.input().deliver(record);
        }
        call.input().finish();
        responses
    }

    /// Number of calls opened so far.
    pub fn calls_opened(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Get the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// A running scoring call.
pub struct ScoringCall {
    id: u64,
    input: PushSrcHandle<Record>,
    stream: StreamHandle,
}

impl ScoringCall {
    /// Call number within its service.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Push handle for incoming records.
    pub fn input(&self) -> &PushSrcHandle<Record> {
        &self.input
    }

    /// Cancel the call.
    pub fn cancel(&mut self) {
        self.stream.cancel();
    }

    /// Wait for the call to finish.
    pub async fn wait(self) -> Result<StreamStats> {
        self.stream.wait().await
    }
}

fn score_record(model: &dyn Model, features: &dyn FeatureTransform, record: &Record) -> Result<Score> {
    let vector = features.assemble(record)?;
    let value = model.score(&vector)?;
    Ok(Score {
        id: record.id.clone(),
        value,
    })
}
