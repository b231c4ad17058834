//! Error types for Scorestream.

use thiserror::Error;

/// Result type alias using Scorestream's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Scorestream operations.
///
/// Errors are `Clone` because a terminal failure is re-observed by every
/// `request()` issued after the stream has ended.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Failure reported by the external push handle (e.g. connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// Failure raised inside the pipeline engine.
    #[error("pipeline failure: {0}")]
    Pipeline(String),

    /// The bounded pending queue rejected an element.
    #[error("pending queue overflow: capacity {capacity} exceeded")]
    Overflow {
        /// Configured capacity of the source adapter.
        capacity: usize,
    },

    /// The stream was torn down before a terminal signal was observed.
    #[error("stream cancelled")]
    Cancelled,

    /// Feature assembly failed for a record.
    #[error("feature error: {0}")]
    Feature(String),

    /// The model rejected its input.
    #[error("model error: {0}")]
    Model(String),

    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error originated at the external push handle.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Overflow { .. })
    }

    /// Whether this error originated inside the pipeline.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            Error::Pipeline(_) | Error::Feature(_) | Error::Model(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Transport("reset".into()).is_transport());
        assert!(Error::Overflow { capacity: 4 }.is_transport());
        assert!(Error::Model("dim".into()).is_pipeline());
        assert!(!Error::Cancelled.is_transport());
        assert!(!Error::Cancelled.is_pipeline());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Overflow { capacity: 8 };
        assert_eq!(err.to_string(), "pending queue overflow: capacity 8 exceeded");
        assert_eq!(
            Error::Transport("connection reset".into()).to_string(),
            "transport error: connection reset"
        );
    }
}
