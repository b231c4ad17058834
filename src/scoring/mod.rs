//! Model scoring on top of the bridge.
//!
//! - [`FeatureTransform`] / [`ColumnAssembler`]: records to feature vectors
//! - [`Model`] / [`LinearModel`]: feature vectors to scores
//! - [`ScoringService`]: opens one bridged stream per call

mod features;
mod model;
mod service;

pub use features::{ColumnAssembler, FeatureTransform, Record};
pub use model::{LinearModel, Link, Model};
pub use service::{Score, ScoringCall, ScoringService, ServiceConfig};
