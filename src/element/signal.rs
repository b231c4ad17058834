//! Pull-side results and the per-stream state machine.

use crate::error::Error;
use std::fmt;

/// How a stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    /// Normal completion.
    Eos,
    /// Terminated with an error.
    Failed(Error),
}

impl StreamEnd {
    /// Whether the stream ended normally.
    pub fn is_eos(&self) -> bool {
        matches!(self, StreamEnd::Eos)
    }

    /// Convert into a `Result`, mapping `Failed` to its error.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            StreamEnd::Eos => Ok(()),
            StreamEnd::Failed(e) => Err(e),
        }
    }
}

/// Per-adapter stream state.
///
/// Transitions are monotone: `NotStarted -> Started -> {Completed | Failed}`.
/// Nothing leaves a terminal state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StreamState {
    /// No demand has been raised yet.
    #[default]
    NotStarted,
    /// Demand has been raised at least once; no terminal signal yet.
    Started,
    /// `finish()` was observed.
    Completed,
    /// `fail(e)` was observed.
    Failed(Error),
}

impl StreamState {
    /// Whether the state is `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Completed | StreamState::Failed(_))
    }

    /// The terminal signal for this state, if any.
    pub fn end(&self) -> Option<StreamEnd> {
        match self {
            StreamState::Completed => Some(StreamEnd::Eos),
            StreamState::Failed(e) => Some(StreamEnd::Failed(e.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::NotStarted => write!(f, "not-started"),
            StreamState::Started => write!(f, "started"),
            StreamState::Completed => write!(f, "completed"),
            StreamState::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

/// Answer to one `request()`.
///
/// `items` is the entire backlog at the time demand was served, in arrival
/// order. When `end` is set, no element enqueued before the terminal signal
/// is missing from this or an earlier batch, and no element follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct PullBatch<T> {
    /// Elements in arrival order.
    pub items: Vec<T>,
    /// Terminal signal following `items`, if the stream has ended.
    pub end: Option<StreamEnd>,
}

impl<T> PullBatch<T> {
    /// A batch of elements with no terminal signal.
    pub fn items(items: Vec<T>) -> Self {
        Self { items, end: None }
    }

    /// A batch carrying only a terminal signal.
    pub fn terminal(end: StreamEnd) -> Self {
        Self {
            items: Vec::new(),
            end: Some(end),
        }
    }

    /// Whether this batch ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.end.is_some()
    }

    /// Number of elements in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
