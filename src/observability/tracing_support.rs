//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Configuration for tracing behavior.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to create a span per stream.
    pub stream_spans: bool,
    /// Whether the executor logs every batch it pulls (can be noisy).
    pub batch_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            stream_spans: true,
            batch_events: false,
        }
    }
}

impl TracingConfig {
    /// Enable everything.
    pub fn all() -> Self {
        Self {
            stream_spans: true,
            batch_events: true,
        }
    }

    /// Disable all spans and per-batch events.
    pub fn none() -> Self {
        Self {
            stream_spans: false,
            batch_events: false,
        }
    }

    /// Span for a stream, or a disabled span if stream spans are off.
    pub fn span(&self, name: &str) -> Span {
        if self.stream_spans {
            span_stream(name)
        } else {
            Span::none()
        }
    }
}

/// Create a span covering one stream's lifetime.
///
/// # Example
///
/// ```rust,ignore
/// use scorestream::observability::span_stream;
///
/// let span = span_stream("score-call-7");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_stream(name: &str) -> Span {
    span!(Level::INFO, "stream", name = %name)
}

/// Log a served batch.
#[inline]
pub fn trace_batch(stream: &str, len: usize, terminal: bool) {
    tracing::trace!(stream = %stream, len, terminal, "batch served");
}

/// Log a call that arrived after the terminal signal.
#[inline]
pub fn trace_ignored(stream: &str, call: &'static str) {
    tracing::trace!(stream = %stream, call, "ignored call on terminal stream");
}

/// Log capture for unit tests.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing::subscriber::DefaultGuard;

    /// Output written while the guard from [`capture`] is alive.
    #[derive(Clone, Default)]
    pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Capture every event on the current thread, down to `trace`.
    pub(crate) fn capture() -> (Captured, DefaultGuard) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.stream_spans);
        assert!(!config.batch_events);
    }

    #[test]
    fn test_disabled_span() {
        let span = TracingConfig::none().span("quiet");
        assert!(span.is_disabled());
    }

    #[test]
    fn test_helpers_do_not_panic() {
        let _guard = span_stream("s").entered();
        trace_batch("s", 3, false);
        trace_ignored("s", "deliver");
    }
}
