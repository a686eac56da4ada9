//! Forecast model family.
//!
//! One small capability set ([`ForecastModel`]) with one variant per model family,
//! selected from per-domain configuration at call time.

mod linalg;
mod logistic;
mod ridge;
mod scaler;

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use urbanpulse_core::AnalyticsError;

use crate::config::AnalyticsConfig;
use crate::features::FeatureVector;

pub use logistic::LogisticClassifier;
pub use ridge::RidgeRegressor;

/// Which kind of estimator a domain uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Continuous forecast (load, demand, index).
    Regressor,
    /// Binary risk; the predicted value is a probability.
    Classifier,
}

impl ModelFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Regressor => "regressor",
            ModelFamily::Classifier => "classifier",
        }
    }
}

impl core::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regressor" | "regression" => Ok(ModelFamily::Regressor),
            "classifier" | "classification" => Ok(ModelFamily::Classifier),
            other => Err(AnalyticsError::invalid_input(format!(
                "unknown model family: {other}"
            ))),
        }
    }
}

/// Model-internal failure. The engine adds domain/entity context.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("degenerate training data: {0}")]
    Degenerate(String),

    #[error("model has not been fitted")]
    NotFitted,

    #[error("sample/target length mismatch ({samples} samples, {targets} targets)")]
    LengthMismatch { samples: usize, targets: usize },
}

/// Point estimate plus a confidence score in \[0, 1\].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub value: f64,
    pub confidence: f64,
}

impl Forecast {
    pub(crate) fn new(value: f64, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { value, confidence }
    }
}

pub trait ForecastModel: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// Train on feature vectors paired with the value that followed each window.
    fn fit(&mut self, samples: &[FeatureVector], targets: &[f64]) -> Result<(), ModelError>;

    fn predict(&self, vector: &FeatureVector) -> Result<Forecast, ModelError>;

    fn is_fitted(&self) -> bool;
}

/// Concrete model selected by domain configuration.
#[derive(Debug, Clone)]
pub enum ModelKind {
    Regressor(RidgeRegressor),
    Classifier(LogisticClassifier),
}

impl ModelKind {
    pub fn for_family(family: ModelFamily, config: &AnalyticsConfig) -> Self {
        match family {
            ModelFamily::Regressor => ModelKind::Regressor(
                RidgeRegressor::new(config.ridge_lambda).with_holdout_fraction(config.holdout_fraction),
            ),
            ModelFamily::Classifier => ModelKind::Classifier(LogisticClassifier::new(
                config.classifier_iterations,
                config.classifier_learning_rate,
            )),
        }
    }
}

impl ForecastModel for ModelKind {
    fn family(&self) -> ModelFamily {
        match self {
            ModelKind::Regressor(m) => m.family(),
            ModelKind::Classifier(m) => m.family(),
        }
    }

    fn fit(&mut self, samples: &[FeatureVector], targets: &[f64]) -> Result<(), ModelError> {
        match self {
            ModelKind::Regressor(m) => m.fit(samples, targets),
            ModelKind::Classifier(m) => m.fit(samples, targets),
        }
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Forecast, ModelError> {
        match self {
            ModelKind::Regressor(m) => m.predict(vector),
            ModelKind::Classifier(m) => m.predict(vector),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            ModelKind::Regressor(m) => m.is_fitted(),
            ModelKind::Classifier(m) => m.is_fitted(),
        }
    }
}

pub(crate) fn check_training_input(samples: &[FeatureVector], targets: &[f64]) -> Result<(), ModelError> {
    if samples.len() != targets.len() {
        return Err(ModelError::LengthMismatch {
            samples: samples.len(),
            targets: targets.len(),
        });
    }
    if samples.len() < 2 {
        return Err(ModelError::Degenerate(format!(
            "need at least 2 training samples, got {}",
            samples.len()
        )));
    }
    if targets.iter().any(|t| !t.is_finite()) {
        return Err(ModelError::Degenerate("non-finite target value".to_string()));
    }
    if samples
        .iter()
        .any(|s| s.as_slice().iter().any(|x| !x.is_finite()))
    {
        return Err(ModelError::Degenerate("non-finite feature value".to_string()));
    }
    Ok(())
}
