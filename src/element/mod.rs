//! Stream contracts shared by the bridge adapters.
//!
//! Two concurrency models meet at the RPC boundary:
//!
//! - [`PushHandle`]: callback-style contract. The owner (usually the
//!   transport) calls `deliver`/`fail`/`finish` whenever it likes, from any
//!   thread.
//! - Pull side: the pipeline raises demand with `request()` and receives a
//!   [`PullBatch`] holding the whole current backlog, optionally followed by
//!   the terminal [`StreamEnd`].
//!
//! ```text
//! transport ──PushHandle──> PushSrc ──request()──> engine ──> PushSink ──PushHandle──> transport
//! ```
//!
//! # Terminal signals
//!
//! A stream ends exactly once, with either [`StreamEnd::Eos`] or
//! [`StreamEnd::Failed`]. Calls on a handle after its terminal signal are
//! ignored rather than treated as errors.

mod signal;
mod traits;

pub use signal::{PullBatch, StreamEnd, StreamState};
pub use traits::PushHandle;
