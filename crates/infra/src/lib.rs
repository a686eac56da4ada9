//! Infrastructure adapters for the analytics boundaries.
//!
//! In-memory implementations of `HistoryProvider`, `PredictionStore` and
//! `PredictionSink` for tests, local runs and embedding.

pub mod history;
pub mod prediction_store;
pub mod sink;

pub use history::InMemoryHistoryProvider;
pub use prediction_store::InMemoryPredictionStore;
pub use sink::{InMemoryPredictionSink, TracingPredictionSink};
