//! `urbanpulse-analytics`
//!
//! **Responsibility:** predictive analytics over municipal sensor history.
//!
//! - Storage agnostic: history, prediction persistence and publication are traits
//!   implemented by callers (see `urbanpulse-infra`).
//! - Deterministic: identical history gives bit-identical features and predictions.
//! - Stateless inference: models are refit from the freshest window; the model cache
//!   only short-circuits fits on identical data.

pub mod accuracy;
pub mod aqi;
pub mod cache;
pub mod config;
pub mod engine;
pub mod features;
pub mod history;
pub mod model;
pub mod prediction;
pub mod reading;
pub mod stats;
pub mod store;

pub use accuracy::{AccuracyMetric, AccuracyRecord, AccuracyTracker, PredictionTypeAccuracy};
pub use cache::{ModelCache, TrainingFingerprint};
pub use config::{AnalyticsConfig, DomainSettings};
pub use engine::AnalyticsEngine;
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureBuilder, FeatureSet, FeatureVector, Observation, TrainingSet};
pub use history::HistoryProvider;
pub use model::{Forecast, ForecastModel, LogisticClassifier, ModelError, ModelFamily, ModelKind, RidgeRegressor};
pub use prediction::Prediction;
pub use reading::{Reading, ReadingValues};
pub use store::{ALERT_TOPIC, PREDICTION_TOPIC, PredictionSink, PredictionStore};

pub use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId, PredictionId};
