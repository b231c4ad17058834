//! Built-in stream elements.
//!
//! ## Sources
//! - [`PushSrc`]: Accepts elements from a push handle, serves them on demand
//!
//! ## Sinks
//! - [`PushSink`]: Forwards pipeline output into an external push handle

pub mod app;

pub use app::{
    PushSink, PushSinkStats, PushSrc, PushSrcHandle, PushSrcStats, SinkConfig, SourceConfig,
};
