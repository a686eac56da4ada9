//! Prediction accuracy tracking.
//!
//! Records are a projection of (prediction, realized value) pairs and can be rebuilt
//! at any time; they are never the source of truth.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, PredictionId};

use crate::config::AnalyticsConfig;
use crate::features::window_start;
use crate::model::ModelFamily;
use crate::prediction::Prediction;

/// How `mean_error` is computed for a domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyMetric {
    MeanAbsoluteError,
    /// `mean_error` is the misclassification rate; `accuracy_rate` is set.
    AccuracyRate,
}

impl From<ModelFamily> for AccuracyMetric {
    fn from(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Regressor => AccuracyMetric::MeanAbsoluteError,
            ModelFamily::Classifier => AccuracyMetric::AccuracyRate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub domain: Domain,
    pub window_days: i64,
    pub metric: AccuracyMetric,
    pub mean_error: f64,
    pub accuracy_rate: Option<f64>,
    pub mean_confidence: f64,
    pub sample_count: usize,
    pub by_prediction_type: Vec<PredictionTypeAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionTypeAccuracy {
    pub prediction_type: String,
    pub sample_count: usize,
    pub mean_confidence: f64,
    pub mean_error: f64,
}

#[derive(Debug, Clone)]
struct Outcome {
    domain: Domain,
    prediction_type: String,
    generated_at: DateTime<Utc>,
    predicted: f64,
    realized: f64,
    confidence: f64,
}

#[derive(Debug, Default)]
struct Totals {
    count: usize,
    error: f64,
    correct: usize,
    confidence: f64,
}

impl Totals {
    fn add(&mut self, o: &Outcome, metric: AccuracyMetric) {
        self.count += 1;
        self.confidence += o.confidence;
        match metric {
            AccuracyMetric::MeanAbsoluteError => self.error += (o.predicted - o.realized).abs(),
            AccuracyMetric::AccuracyRate => {
                if (o.predicted >= 0.5) == (o.realized >= 0.5) {
                    self.correct += 1;
                }
            }
        }
    }

    fn mean_error(&self, metric: AccuracyMetric) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match metric {
            AccuracyMetric::MeanAbsoluteError => self.error / self.count as f64,
            AccuracyMetric::AccuracyRate => 1.0 - self.correct as f64 / self.count as f64,
        }
    }

    fn mean_confidence(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.confidence / self.count as f64
        }
    }
}

/// Compares predictions against realized values.
#[derive(Debug)]
pub struct AccuracyTracker {
    metrics: BTreeMap<Domain, AccuracyMetric>,
    outcomes: RwLock<HashMap<PredictionId, Outcome>>,
}

impl AccuracyTracker {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            metrics: Domain::ALL
                .into_iter()
                .map(|d| (d, config.domain(d).model_family.into()))
                .collect(),
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    pub fn metric(&self, domain: Domain) -> AccuracyMetric {
        self.metrics
            .get(&domain)
            .copied()
            .unwrap_or(AccuracyMetric::MeanAbsoluteError)
    }

    /// Record the realized value for a prediction. Recording the same prediction
    /// again replaces the earlier outcome.
    pub fn record_outcome(&self, prediction: &Prediction, realized_value: f64) -> AnalyticsResult<()> {
        if !realized_value.is_finite() {
            return Err(AnalyticsError::invalid_input(format!(
                "realized value for prediction {} must be finite",
                prediction.id
            )));
        }
        let mut map = self
            .outcomes
            .write()
            .map_err(|_| AnalyticsError::storage("accuracy tracker lock poisoned"))?;
        map.insert(
            prediction.id,
            Outcome {
                domain: prediction.domain,
                prediction_type: prediction.prediction_type.clone(),
                generated_at: prediction.generated_at,
                predicted: prediction.predicted_value,
                realized: realized_value,
                confidence: prediction.confidence_score,
            },
        );
        Ok(())
    }

    pub fn has_outcome(&self, id: PredictionId) -> bool {
        self.outcomes
            .read()
            .map(|m| m.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn accuracy(&self, domain: Domain, window_days: i64) -> AnalyticsResult<AccuracyRecord> {
        self.accuracy_at(domain, window_days, Utc::now())
    }

    /// Aggregate over resolved predictions generated in the trailing `window_days`.
    pub fn accuracy_at(
        &self,
        domain: Domain,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<AccuracyRecord> {
        let since = window_start(now, window_days, "accuracy window")?;
        let metric = self.metric(domain);

        let map = self
            .outcomes
            .read()
            .map_err(|_| AnalyticsError::storage("accuracy tracker lock poisoned"))?;

        let mut overall = Totals::default();
        let mut by_type: BTreeMap<&str, Totals> = BTreeMap::new();
        for o in map
            .values()
            .filter(|o| o.domain == domain && o.generated_at >= since && o.generated_at <= now)
        {
            overall.add(o, metric);
            by_type
                .entry(o.prediction_type.as_str())
                .or_default()
                .add(o, metric);
        }

        let accuracy_rate = match metric {
            AccuracyMetric::AccuracyRate if overall.count > 0 => Some(1.0 - overall.mean_error(metric)),
            _ => None,
        };

        Ok(AccuracyRecord {
            domain,
            window_days,
            metric,
            mean_error: overall.mean_error(metric),
            accuracy_rate,
            mean_confidence: overall.mean_confidence(),
            sample_count: overall.count,
            by_prediction_type: by_type
                .into_iter()
                .map(|(t, totals)| PredictionTypeAccuracy {
                    prediction_type: t.to_string(),
                    sample_count: totals.count,
                    mean_confidence: totals.mean_confidence(),
                    mean_error: totals.mean_error(metric),
                })
                .collect(),
        })
    }
}
