//! Persistence and publication boundaries for predictions.

use urbanpulse_core::{AnalyticsResult, Domain, EntityId};

use crate::prediction::Prediction;

/// Topic every prediction is published on.
pub const PREDICTION_TOPIC: &str = "ml.prediction";

/// Topic for high-risk classifier outputs.
pub const ALERT_TOPIC: &str = "ml.prediction.alert";

/// Prediction persistence (external collaborator).
pub trait PredictionStore: Send + Sync {
    fn save(&self, prediction: Prediction) -> AnalyticsResult<()>;

    /// Most recent predictions for an entity, newest first.
    fn history(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        limit: usize,
    ) -> AnalyticsResult<Vec<Prediction>>;

    /// Most recent predictions across all entities of a domain, newest first.
    fn recent(&self, domain: Domain, limit: usize) -> AnalyticsResult<Vec<Prediction>>;
}

/// Outbound notifications for produced predictions.
///
/// Kept separate from the store: publication is fire-and-forget and must never fail
/// a prediction that was already persisted.
pub trait PredictionSink: Send + Sync {
    fn publish(&self, topic: &str, prediction: &Prediction);
}

impl<S> PredictionStore for std::sync::Arc<S>
where
    S: PredictionStore + ?Sized,
{
    fn save(&self, prediction: Prediction) -> AnalyticsResult<()> {
        (**self).save(prediction)
    }

    fn history(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        limit: usize,
    ) -> AnalyticsResult<Vec<Prediction>> {
        (**self).history(entity_id, domain, limit)
    }

    fn recent(&self, domain: Domain, limit: usize) -> AnalyticsResult<Vec<Prediction>> {
        (**self).recent(domain, limit)
    }
}

impl<S> PredictionSink for std::sync::Arc<S>
where
    S: PredictionSink + ?Sized,
{
    fn publish(&self, topic: &str, prediction: &Prediction) {
        (**self).publish(topic, prediction)
    }
}
