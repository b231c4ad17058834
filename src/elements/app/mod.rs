//! Bridge adapters between the RPC transport and the pipeline.
//!
//! - [`PushSrc`]: push-driven producer in, demand-gated pull stream out
//! - [`PushSink`]: pipeline output in, external push handle out

mod pushsink;
mod pushsrc;

pub use pushsink::{PushSink, PushSinkStats, SinkConfig};
pub use pushsrc::{PushSrc, PushSrcHandle, PushSrcStats, SourceConfig};
