//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

use crate::domain::Domain;
use crate::id::EntityId;

/// Result type used across the pipeline.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Pipeline-level error.
///
/// Every variant carries enough context (domain, entity, reason) for callers to
/// log and surface it. Nothing in the core retries; retry policy belongs to the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Not enough history to build features. Recoverable by retrying later or
    /// widening the lookback window.
    #[error("insufficient data for {domain} entity {entity_id}: {actual} usable reading(s), {required} required")]
    InsufficientData {
        domain: Domain,
        entity_id: EntityId,
        required: usize,
        actual: usize,
    },

    /// Training data was degenerate (zero variance, single-class labels, ...).
    #[error("model fit failed for {domain} entity {entity_id}: {reason}")]
    ModelFit {
        domain: Domain,
        entity_id: EntityId,
        reason: String,
    },

    /// Malformed caller input (bad waypoints, non-positive windows, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The history provider does not know the entity.
    #[error("{} {} {} not found", .domain, .domain.entity_kind(), .entity_id)]
    NotFound { domain: Domain, entity_id: EntityId },

    /// A backing store failed (lock poisoning, IO in external adapters).
    #[error("storage error: {0}")]
    Storage(String),
}

impl AnalyticsError {
    pub fn insufficient_data(
        domain: Domain,
        entity_id: &EntityId,
        required: usize,
        actual: usize,
    ) -> Self {
        Self::InsufficientData {
            domain,
            entity_id: entity_id.clone(),
            required,
            actual,
        }
    }

    pub fn model_fit(domain: Domain, entity_id: &EntityId, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            domain,
            entity_id: entity_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(domain: Domain, entity_id: &EntityId) -> Self {
        Self::NotFound {
            domain,
            entity_id: entity_id.clone(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the caller may reasonably retry later (more data may arrive).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::Storage(_))
    }
}
