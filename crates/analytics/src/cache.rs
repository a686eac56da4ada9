//! Fitted-model cache.
//!
//! Purely a performance layer. A hit requires the cached model's training window to
//! match the requested one bit for bit; the digest only short-circuits mismatches.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::RwLock;

use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId};

use crate::features::Observation;
use crate::model::{ModelFamily, ModelKind};

/// Exact identity of a training window: every timestamp, value and covariate bit
/// pattern plus the window size and model family.
///
/// Equality compares the digest first and then the full bit patterns, so a digest
/// collision can never alias two different windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrainingFingerprint {
    digest: u64,
    sample_window: usize,
    family: ModelFamily,
    bits: Vec<[u64; 4]>,
}

impl TrainingFingerprint {
    pub fn of(observations: &[Observation], sample_window: usize, family: ModelFamily) -> Self {
        let bits: Vec<[u64; 4]> = observations
            .iter()
            .map(|o| {
                [
                    o.timestamp.timestamp_micros() as u64,
                    o.value.to_bits(),
                    o.covariates[0].to_bits(),
                    o.covariates[1].to_bits(),
                ]
            })
            .collect();

        let mut h = DefaultHasher::new();
        sample_window.hash(&mut h);
        family.hash(&mut h);
        bits.hash(&mut h);

        Self {
            digest: h.finish(),
            sample_window,
            family,
            bits,
        }
    }

    pub fn digest(&self) -> u64 {
        self.digest
    }
}

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: TrainingFingerprint,
    model: ModelKind,
}

/// One fitted model per (entity, domain), starting empty and filled lazily.
#[derive(Debug, Default)]
pub struct ModelCache {
    inner: RwLock<HashMap<(EntityId, Domain), Entry>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached model if it was trained on exactly `fingerprint`.
    pub fn get(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        fingerprint: &TrainingFingerprint,
    ) -> AnalyticsResult<Option<ModelKind>> {
        let map = self
            .inner
            .read()
            .map_err(|_| AnalyticsError::storage("model cache lock poisoned"))?;
        Ok(map
            .get(&(entity_id.clone(), domain))
            .filter(|e| &e.fingerprint == fingerprint)
            .map(|e| e.model.clone()))
    }

    /// Store a model, replacing whatever was cached for the same (entity, domain).
    pub fn insert(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        fingerprint: TrainingFingerprint,
        model: ModelKind,
    ) -> AnalyticsResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| AnalyticsError::storage("model cache lock poisoned"))?;
        map.insert((entity_id.clone(), domain), Entry { fingerprint, model });
        Ok(())
    }

    pub fn invalidate(&self, entity_id: &EntityId, domain: Domain) -> AnalyticsResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| AnalyticsError::storage("model cache lock poisoned"))?;
        map.remove(&(entity_id.clone(), domain));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use chrono::{Duration, TimeZone, Utc};

    fn observations(n: usize) -> Vec<Observation> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Observation {
                timestamp: t0 + Duration::hours(i as i64),
                value: i as f64,
                covariates: [0.0, 0.0],
            })
            .collect()
    }

    fn model() -> ModelKind {
        ModelKind::for_family(ModelFamily::Regressor, &AnalyticsConfig::default())
    }

    #[test]
    fn hit_requires_identical_training_window() {
        let cache = ModelCache::new();
        let id = EntityId::new("m1").unwrap();
        let obs = observations(10);
        let fp = TrainingFingerprint::of(&obs, 4, ModelFamily::Regressor);

        cache.insert(&id, Domain::Energy, fp.clone(), model()).unwrap();
        assert!(cache.get(&id, Domain::Energy, &fp).unwrap().is_some());

        // One new reading changes the fingerprint -> miss.
        let fp_new = TrainingFingerprint::of(&observations(11), 4, ModelFamily::Regressor);
        assert_ne!(fp, fp_new);
        assert!(cache.get(&id, Domain::Energy, &fp_new).unwrap().is_none());
    }

    #[test]
    fn value_change_changes_fingerprint() {
        let mut obs = observations(10);
        let before = TrainingFingerprint::of(&obs, 4, ModelFamily::Regressor);
        obs[3].value += 1e-9;
        assert_ne!(before, TrainingFingerprint::of(&obs, 4, ModelFamily::Regressor));
        assert_ne!(
            TrainingFingerprint::of(&obs, 4, ModelFamily::Regressor),
            TrainingFingerprint::of(&obs, 4, ModelFamily::Classifier)
        );
    }

    #[test]
    fn insert_replaces_previous_entry_for_same_entity() {
        let cache = ModelCache::new();
        let id = EntityId::new("m1").unwrap();
        let fp_a = TrainingFingerprint::of(&observations(10), 4, ModelFamily::Regressor);
        let fp_b = TrainingFingerprint::of(&observations(12), 4, ModelFamily::Regressor);

        cache.insert(&id, Domain::Energy, fp_a.clone(), model()).unwrap();
        cache.insert(&id, Domain::Energy, fp_b, model()).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&id, Domain::Energy, &fp_a).unwrap().is_none());

        cache.invalidate(&id, Domain::Energy).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn digest_collision_still_misses() {
        let cache = ModelCache::new();
        let id = EntityId::new("m1").unwrap();
        let cached = TrainingFingerprint::of(&observations(10), 4, ModelFamily::Regressor);

        let mut shifted = observations(10);
        shifted[0].value = 42.0;
        let colliding = TrainingFingerprint {
            digest: cached.digest(),
            ..TrainingFingerprint::of(&shifted, 4, ModelFamily::Regressor)
        };
        assert_eq!(colliding.digest(), cached.digest());

        cache.insert(&id, Domain::Energy, cached, model()).unwrap();
        assert!(cache.get(&id, Domain::Energy, &colliding).unwrap().is_none());
    }
}
