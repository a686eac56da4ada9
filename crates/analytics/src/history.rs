//! Read side of the ingestion pipeline.

use chrono::{DateTime, Utc};

use urbanpulse_core::{AnalyticsResult, Domain, EntityId};

use crate::reading::Reading;

/// Source of historical readings.
///
/// Implementations live outside this crate (database, in-memory test store).
pub trait HistoryProvider: Send + Sync {
    /// Readings for `entity_id` with `timestamp >= since`, ordered by timestamp ascending.
    ///
    /// Fails with `AnalyticsError::NotFound` if the entity is unknown in `domain`.
    /// A known entity with no readings yields an empty vector.
    fn readings(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        since: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Reading>>;
}

impl<H> HistoryProvider for std::sync::Arc<H>
where
    H: HistoryProvider + ?Sized,
{
    fn readings(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        since: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Reading>> {
        (**self).readings(entity_id, domain, since)
    }
}
