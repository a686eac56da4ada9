use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use urbanpulse_core::{Domain, EntityId, PredictionId};

use crate::aqi;

/// A stored forecast or risk score for one entity.
///
/// Immutable once created; persistence is owned by the `PredictionStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: PredictionId,
    pub entity_id: EntityId,
    pub domain: Domain,
    pub prediction_type: String,
    pub predicted_value: f64,

    /// Confidence in \[0, 1\].
    pub confidence_score: f64,

    pub generated_at: DateTime<Utc>,

    /// Time the value is predicted for (`generated_at` + domain horizon).
    pub target_at: DateTime<Utc>,

    /// Free-form metadata (derived labels, model family, sample counts).
    pub metadata: JsonValue,
}

impl Prediction {
    pub fn new(
        entity_id: EntityId,
        domain: Domain,
        prediction_type: impl Into<String>,
        predicted_value: f64,
        confidence_score: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PredictionId::new(),
            entity_id,
            domain,
            prediction_type: prediction_type.into(),
            predicted_value,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            generated_at,
            target_at: generated_at,
            metadata: JsonValue::Null,
        }
    }

    pub fn with_target_at(mut self, target_at: DateTime<Utc>) -> Self {
        self.target_at = target_at;
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set one metadata key, turning `Null` metadata into an object.
    pub fn with_metadata_entry(mut self, key: &str, value: JsonValue) -> Self {
        if !self.metadata.is_object() {
            self.metadata = json!({});
        }
        if let Some(map) = self.metadata.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        self
    }
}

/// Domain-specific labels reported alongside a predicted value.
pub fn derived_labels(domain: Domain, value: f64) -> JsonValue {
    match domain {
        Domain::Energy => json!({ "unit": "kWh" }),
        Domain::Water => json!({ "risk_level": risk_level(value) }),
        Domain::Transport => json!({ "demand_level": demand_level(value) }),
        Domain::AirQuality => json!({ "quality_level": aqi::quality_level(value) }),
    }
}

pub fn risk_level(probability: f64) -> &'static str {
    if probability > 0.7 {
        "high"
    } else if probability > 0.3 {
        "medium"
    } else {
        "low"
    }
}

pub fn demand_level(passengers: f64) -> &'static str {
    if passengers > 30.0 {
        "high"
    } else if passengers > 15.0 {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn confidence_is_clamped() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let p = Prediction::new(
            EntityId::new("m1").unwrap(),
            Domain::Energy,
            "consumption_24h",
            12.0,
            1.7,
            now,
        );
        assert_eq!(p.confidence_score, 1.0);
        assert_eq!(p.target_at, now);
    }

    #[test]
    fn metadata_entries_accumulate() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let p = Prediction::new(EntityId::new("s1").unwrap(), Domain::Water, "leak_probability", 0.9, 0.9, now)
            .with_metadata(derived_labels(Domain::Water, 0.9))
            .with_metadata_entry("model_family", json!("classifier"));
        assert_eq!(p.metadata["risk_level"], "high");
        assert_eq!(p.metadata["model_family"], "classifier");
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(risk_level(0.7), "medium");
        assert_eq!(risk_level(0.31), "medium");
        assert_eq!(risk_level(0.1), "low");
        assert_eq!(demand_level(31.0), "high");
        assert_eq!(demand_level(15.0), "low");
        assert_eq!(derived_labels(Domain::AirQuality, 75.0)["quality_level"], "moderate");
    }
}
