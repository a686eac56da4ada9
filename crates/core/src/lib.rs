//! `urbanpulse-core`: shared primitives for the analytics pipeline.
//!
//! Pure types only: domain tags, identifiers and the error taxonomy. No IO.

pub mod domain;
pub mod error;
pub mod id;

pub use domain::Domain;
pub use error::{AnalyticsError, AnalyticsResult};
pub use id::{EntityId, PredictionId};
