use std::sync::RwLock;

use urbanpulse_analytics::{Prediction, PredictionStore};
use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId};

/// Append-only in-memory prediction log.
#[derive(Debug, Default)]
pub struct InMemoryPredictionStore {
    inner: RwLock<Vec<Prediction>>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest first by `generated_at`; ties keep the later save first.
    fn newest_first<F>(&self, limit: usize, keep: F) -> AnalyticsResult<Vec<Prediction>>
    where
        F: Fn(&Prediction) -> bool,
    {
        let log = self
            .inner
            .read()
            .map_err(|_| AnalyticsError::storage("prediction store lock poisoned"))?;
        let mut matching: Vec<&Prediction> = log.iter().rev().filter(|p| keep(p)).collect();
        matching.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(matching.into_iter().take(limit).cloned().collect())
    }
}

impl PredictionStore for InMemoryPredictionStore {
    fn save(&self, prediction: Prediction) -> AnalyticsResult<()> {
        let mut log = self
            .inner
            .write()
            .map_err(|_| AnalyticsError::storage("prediction store lock poisoned"))?;
        if log.iter().any(|p| p.id == prediction.id) {
            return Err(AnalyticsError::storage(format!(
                "prediction {} already stored",
                prediction.id
            )));
        }
        log.push(prediction);
        Ok(())
    }

    fn history(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        limit: usize,
    ) -> AnalyticsResult<Vec<Prediction>> {
        self.newest_first(limit, |p| &p.entity_id == entity_id && p.domain == domain)
    }

    fn recent(&self, domain: Domain, limit: usize) -> AnalyticsResult<Vec<Prediction>> {
        self.newest_first(limit, |p| p.domain == domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn prediction(entity: &str, domain: Domain, minutes: i64) -> Prediction {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Prediction::new(
            EntityId::new(entity).unwrap(),
            domain,
            domain.default_prediction_type(),
            minutes as f64,
            0.5,
            t0 + Duration::minutes(minutes),
        )
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let store = InMemoryPredictionStore::new();
        for m in [10, 30, 20] {
            store.save(prediction("bus-7", Domain::Transport, m)).unwrap();
        }
        store.save(prediction("bus-8", Domain::Transport, 40)).unwrap();

        let bus7 = EntityId::new("bus-7").unwrap();
        let values: Vec<f64> = store
            .history(&bus7, Domain::Transport, 2)
            .unwrap()
            .iter()
            .map(|p| p.predicted_value)
            .collect();
        assert_eq!(values, vec![30.0, 20.0]);

        assert!(store.history(&bus7, Domain::Energy, 10).unwrap().is_empty());
        assert_eq!(store.recent(Domain::Transport, 10).unwrap()[0].predicted_value, 40.0);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = InMemoryPredictionStore::new();
        let p = prediction("m", Domain::Energy, 0);
        store.save(p.clone()).unwrap();
        assert!(matches!(store.save(p), Err(AnalyticsError::Storage(_))));
    }
}
