//! Stream execution.
//!
//! The pipeline engine owns one Tokio task per stream and drives both bridge
//! adapters from it:
//!
//! - [`StreamExecutor`]: starts streams and returns a [`StreamHandle`]
//! - [`StreamEvent`]: async events emitted while a stream runs
//!
//! # Example
//!
//! ```rust,ignore
//! use scorestream::elements::{PushSink, PushSrc};
//! use scorestream::pipeline::StreamExecutor;
//! use scorestream::transport::response_channel;
//!
//! let (source, input) = PushSrc::channel();
//! let (tx, responses) = response_channel();
//!
//! let handle = StreamExecutor::new().start(source, |x: u32| Ok(x * 2), PushSink::new(tx));
//! ```

mod events;
mod executor;

pub use events::{EventReceiver, EventSender, StreamEvent};
pub use executor::{ExecutorConfig, StreamExecutor, StreamHandle, StreamOutcome, StreamStats};
