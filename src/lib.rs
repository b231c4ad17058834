//! # Scorestream
//!
//! A push/pull bridge between an RPC-style streaming transport and a
//! demand-driven stream-processing engine, with a model scoring service on top.
//!
//! The transport pushes records through a handle whenever they arrive; the
//! engine pulls them when it has demand. Two adapters connect the sides:
//!
//! - [`elements::PushSrc`]: the transport pushes, the engine pulls
//! - [`elements::PushSink`]: the engine pushes results back into a transport handle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scorestream::prelude::*;
//! use futures::StreamExt;
//!
//! let service = ScoringService::new(
//!     LinearModel::new(vec![0.5, 2.0], 1.0),
//!     ColumnAssembler::new(["age", "income"]),
//! );
//!
//! let records = vec![Record::new("a").with("age", 30.0).with("income", 1.5)];
//! let mut scores = service.score_stream(records);
//! while let Some(score) = scores.next().await {
//!     println!("{:?}", score?);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod element;
pub mod elements;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod scoring;
pub mod transport;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::element::{PullBatch, PushHandle, StreamEnd, StreamState};
    pub use crate::elements::{PushSink, PushSrc, PushSrcHandle, SinkConfig, SourceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{StreamExecutor, StreamHandle, StreamOutcome};
    pub use crate::scoring::{
        ColumnAssembler, FeatureTransform, LinearModel, Model, Record, Score, ScoringService,
    };
    pub use crate::transport::{ResponseSender, ResponseStream, response_channel};
}

pub use error::{Error, Result};
