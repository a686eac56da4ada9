use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use urbanpulse_analytics::{HistoryProvider, Reading};
use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId};

/// In-memory reading history, keyed by entity and domain.
///
/// Entities must be registered (explicitly or by ingesting a reading) before they can
/// be queried; an unknown entity is `NotFound`, a known one with no readings is empty.
#[derive(Debug, Default)]
pub struct InMemoryHistoryProvider {
    inner: RwLock<HashMap<(EntityId, Domain), Vec<Reading>>>,
}

impl InMemoryHistoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an entity known without any readings.
    pub fn register(&self, entity_id: EntityId, domain: Domain) -> AnalyticsResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| AnalyticsError::storage("history lock poisoned"))?;
        map.entry((entity_id, domain)).or_default();
        Ok(())
    }

    /// Append a reading, keeping each series ordered by timestamp.
    pub fn ingest(&self, reading: Reading) -> AnalyticsResult<()> {
        let key = (reading.entity_id.clone(), reading.domain());
        let mut map = self
            .inner
            .write()
            .map_err(|_| AnalyticsError::storage("history lock poisoned"))?;
        let series = map.entry(key).or_default();
        // Equal timestamps keep arrival order.
        let idx = series.partition_point(|r| r.timestamp <= reading.timestamp);
        series.insert(idx, reading);
        Ok(())
    }

    pub fn ingest_all<I>(&self, readings: I) -> AnalyticsResult<usize>
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut count = 0;
        for reading in readings {
            self.ingest(reading)?;
            count += 1;
        }
        debug!(count, "ingested readings");
        Ok(count)
    }

    /// Registered entities of a domain, sorted.
    pub fn entities(&self, domain: Domain) -> AnalyticsResult<Vec<EntityId>> {
        let map = self
            .inner
            .read()
            .map_err(|_| AnalyticsError::storage("history lock poisoned"))?;
        let mut ids: Vec<EntityId> = map
            .keys()
            .filter(|(_, d)| *d == domain)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn reading_count(&self, entity_id: &EntityId, domain: Domain) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|map| map.get(&(entity_id.clone(), domain)).map(Vec::len))
            .unwrap_or(0)
    }
}

impl HistoryProvider for InMemoryHistoryProvider {
    fn readings(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        since: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Reading>> {
        let map = self
            .inner
            .read()
            .map_err(|_| AnalyticsError::storage("history lock poisoned"))?;
        let series = map
            .get(&(entity_id.clone(), domain))
            .ok_or_else(|| AnalyticsError::not_found(domain, entity_id))?;
        let start = series.partition_point(|r| r.timestamp < since);
        Ok(series[start..].to_vec())
    }
}
