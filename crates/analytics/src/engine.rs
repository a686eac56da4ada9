//! The analytics component: feature assembly, model fitting, persistence and
//! accuracy tracking behind one owner.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId};

use crate::accuracy::{AccuracyRecord, AccuracyTracker};
use crate::cache::{ModelCache, TrainingFingerprint};
use crate::config::AnalyticsConfig;
use crate::features::{FeatureBuilder, FeatureSet, covariate_names};
use crate::history::HistoryProvider;
use crate::model::{ForecastModel, ModelFamily, ModelKind};
use crate::prediction::{Prediction, derived_labels};
use crate::store::{ALERT_TOPIC, PREDICTION_TOPIC, PredictionSink, PredictionStore};

/// Owns the model cache and accuracy records for its lifetime.
///
/// Models are refit from the freshest history on every call unless the training
/// window is bit-identical to a cached one. All methods take `&self` and may be
/// called concurrently.
pub struct AnalyticsEngine<H, S> {
    config: AnalyticsConfig,
    history: H,
    store: S,
    sink: Option<Arc<dyn PredictionSink>>,
    features: FeatureBuilder,
    models: ModelCache,
    tracker: AccuracyTracker,
}

impl<H, S> AnalyticsEngine<H, S>
where
    H: HistoryProvider,
    S: PredictionStore,
{
    pub fn new(config: AnalyticsConfig, history: H, store: S) -> Self {
        let config = config.normalized();
        Self {
            features: FeatureBuilder::new(&config),
            tracker: AccuracyTracker::new(&config),
            models: ModelCache::new(),
            sink: None,
            config,
            history,
            store,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PredictionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn tracker(&self) -> &AccuracyTracker {
        &self.tracker
    }

    pub fn feature_builder(&self) -> &FeatureBuilder {
        &self.features
    }

    pub fn cached_models(&self) -> usize {
        self.models.len()
    }

    pub fn predict(
        &self,
        domain: Domain,
        entity_id: &EntityId,
        prediction_type: &str,
        historical_days: i64,
    ) -> AnalyticsResult<Prediction> {
        self.predict_at(domain, entity_id, prediction_type, historical_days, Utc::now())
    }

    /// [`predict`](Self::predict) over the configured `default_lookback_days`.
    pub fn predict_default(
        &self,
        domain: Domain,
        entity_id: &EntityId,
        prediction_type: &str,
    ) -> AnalyticsResult<Prediction> {
        self.predict(domain, entity_id, prediction_type, self.config.default_lookback_days)
    }

    /// Fetch history, fit, predict, persist and publish.
    pub fn predict_at(
        &self,
        domain: Domain,
        entity_id: &EntityId,
        prediction_type: &str,
        historical_days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Prediction> {
        let prediction_type = prediction_type.trim();
        if prediction_type.is_empty() {
            warn!(domain = %domain, entity = %entity_id, "rejected prediction request without a type");
            return Err(AnalyticsError::invalid_input("prediction_type must not be empty"));
        }

        let settings = self.config.domain(domain);
        let set = self
            .features
            .fetch(&self.history, entity_id, domain, historical_days, now)?;
        let model = self.fitted_model(entity_id, domain, settings.model_family, &set)?;

        let forecast = model
            .predict(&set.query)
            .map_err(|e| AnalyticsError::model_fit(domain, entity_id, e.to_string()))?;
        let value = match settings.model_family {
            // Every regressed quantity (load, passengers, AQI) is non-negative.
            ModelFamily::Regressor => forecast.value.max(0.0),
            ModelFamily::Classifier => forecast.value,
        };

        let prediction = Prediction::new(
            entity_id.clone(),
            domain,
            prediction_type,
            value,
            forecast.confidence,
            now,
        )
        .with_target_at(set.anchor)
        .with_metadata(derived_labels(domain, value))
        .with_metadata_entry("model_family", json!(settings.model_family.as_str()))
        .with_metadata_entry("training_samples", json!(set.training.len()))
        .with_metadata_entry("reading_count", json!(set.observations.len()))
        .with_metadata_entry("covariates", json!(covariate_names(domain)));

        self.store.save(prediction.clone())?;

        info!(
            domain = %domain,
            entity = %entity_id,
            prediction_type,
            value = prediction.predicted_value,
            confidence = prediction.confidence_score,
            "prediction generated"
        );

        if let Some(sink) = &self.sink {
            sink.publish(PREDICTION_TOPIC, &prediction);
            if settings.model_family == ModelFamily::Classifier && value > self.config.alert_threshold {
                sink.publish(ALERT_TOPIC, &prediction);
            }
        }

        Ok(prediction)
    }

    fn fitted_model(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        family: ModelFamily,
        set: &FeatureSet,
    ) -> AnalyticsResult<ModelKind> {
        let fingerprint = self.config.cache_models.then(|| {
            TrainingFingerprint::of(&set.observations, self.features.sample_window(), family)
        });

        if let Some(fp) = &fingerprint {
            if let Some(model) = self.models.get(entity_id, domain, fp)? {
                debug!(domain = %domain, entity = %entity_id, "model cache hit");
                return Ok(model);
            }
            debug!(domain = %domain, entity = %entity_id, "model cache miss");
        }

        let mut model = ModelKind::for_family(family, &self.config);
        model
            .fit(&set.training.samples, &set.training.targets)
            .map_err(|e| AnalyticsError::model_fit(domain, entity_id, e.to_string()))?;

        if let Some(fp) = fingerprint {
            self.models.insert(entity_id, domain, fp, model.clone())?;
        }
        Ok(model)
    }

    pub fn accuracy(&self, domain: Domain, days: i64) -> AnalyticsResult<AccuracyRecord> {
        self.tracker.accuracy(domain, days)
    }

    pub fn accuracy_at(
        &self,
        domain: Domain,
        days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<AccuracyRecord> {
        self.tracker.accuracy_at(domain, days, now)
    }

    pub fn record_outcome(&self, prediction: &Prediction, realized_value: f64) -> AnalyticsResult<()> {
        self.tracker.record_outcome(prediction, realized_value)
    }

    /// Stored predictions for an entity, newest first.
    pub fn history(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        limit: usize,
    ) -> AnalyticsResult<Vec<Prediction>> {
        self.store.history(entity_id, domain, limit)
    }

    /// Stored predictions across a domain, newest first.
    pub fn recent(&self, domain: Domain, limit: usize) -> AnalyticsResult<Vec<Prediction>> {
        self.store.recent(domain, limit)
    }

    /// Resolve stored predictions whose target time has been observed.
    ///
    /// Looks at the `limit` most recent predictions for the entity; each one without an
    /// outcome is matched to the first reading at or after its `target_at`. Returns the
    /// number of newly resolved predictions. Calling it again resolves nothing new.
    pub fn reconcile(&self, entity_id: &EntityId, domain: Domain, limit: usize) -> AnalyticsResult<usize> {
        let pending: Vec<Prediction> = self
            .store
            .history(entity_id, domain, limit)?
            .into_iter()
            .filter(|p| !self.tracker.has_outcome(p.id))
            .collect();

        let Some(earliest) = pending.iter().map(|p| p.target_at).min() else {
            return Ok(0);
        };

        let mut realized: Vec<(DateTime<Utc>, f64)> = self
            .history
            .readings(entity_id, domain, earliest)?
            .iter()
            .filter(|r| r.domain() == domain)
            .filter_map(|r| r.target().map(|v| (r.timestamp, v)))
            .collect();
        realized.sort_by_key(|(ts, _)| *ts);

        let mut resolved = 0;
        for p in &pending {
            let idx = realized.partition_point(|(ts, _)| *ts < p.target_at);
            if let Some((_, value)) = realized.get(idx) {
                self.tracker.record_outcome(p, *value)?;
                resolved += 1;
            }
        }

        if resolved > 0 {
            info!(domain = %domain, entity = %entity_id, resolved, "reconciled prediction outcomes");
        }
        Ok(resolved)
    }
}
