//! Raw sensor readings as delivered by the ingestion side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use urbanpulse_core::{Domain, EntityId};

use crate::aqi;

/// One timestamped measurement for an entity. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub values: ReadingValues,
}

/// Domain-specific measurement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum ReadingValues {
    Energy {
        power_consumption: f64,
        voltage: Option<f64>,
        current: Option<f64>,
        power_factor: Option<f64>,
    },
    Water {
        flow_rate: Option<f64>,
        pressure: Option<f64>,
        leak_detected: bool,
    },
    Transport {
        passengers: Option<u32>,
        speed: Option<f64>,
        fuel_level: Option<f64>,
        latitude: f64,
        longitude: f64,
    },
    AirQuality {
        aqi: Option<f64>,
        pm25: Option<f64>,
        pm10: Option<f64>,
        temperature: Option<f64>,
        humidity: Option<f64>,
    },
}

impl Reading {
    pub fn new(entity_id: EntityId, timestamp: DateTime<Utc>, values: ReadingValues) -> Self {
        Self {
            entity_id,
            timestamp,
            values,
        }
    }

    pub fn domain(&self) -> Domain {
        self.values.domain()
    }

    /// The value models are trained to predict, if this reading carries one.
    pub fn target(&self) -> Option<f64> {
        self.values.target()
    }

    /// Two domain covariates (missing measurements count as 0.0).
    pub fn covariates(&self) -> [f64; 2] {
        self.values.covariates()
    }
}

impl ReadingValues {
    pub fn domain(&self) -> Domain {
        match self {
            ReadingValues::Energy { .. } => Domain::Energy,
            ReadingValues::Water { .. } => Domain::Water,
            ReadingValues::Transport { .. } => Domain::Transport,
            ReadingValues::AirQuality { .. } => Domain::AirQuality,
        }
    }

    pub fn target(&self) -> Option<f64> {
        let value = match self {
            ReadingValues::Energy {
                power_consumption, ..
            } => Some(*power_consumption),
            ReadingValues::Water { leak_detected, .. } => {
                Some(if *leak_detected { 1.0 } else { 0.0 })
            }
            ReadingValues::Transport { passengers, .. } => passengers.map(f64::from),
            ReadingValues::AirQuality {
                aqi, pm25, pm10, ..
            } => aqi.or_else(|| aqi::calculate_aqi(*pm25, *pm10)),
        };
        value.filter(|v| v.is_finite())
    }

    pub fn covariates(&self) -> [f64; 2] {
        let (a, b) = match self {
            ReadingValues::Energy {
                voltage,
                power_factor,
                ..
            } => (*voltage, *power_factor),
            ReadingValues::Water {
                flow_rate,
                pressure,
                ..
            } => (*flow_rate, *pressure),
            ReadingValues::Transport {
                speed, fuel_level, ..
            } => (*speed, *fuel_level),
            ReadingValues::AirQuality {
                temperature,
                humidity,
                ..
            } => (*temperature, *humidity),
        };
        [finite_or_zero(a), finite_or_zero(b)]
    }
}

fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entity() -> EntityId {
        EntityId::new("e-1").unwrap()
    }

    #[test]
    fn water_target_is_leak_indicator() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let r = Reading::new(
            entity(),
            ts,
            ReadingValues::Water {
                flow_rate: Some(3.5),
                pressure: None,
                leak_detected: true,
            },
        );
        assert_eq!(r.domain(), Domain::Water);
        assert_eq!(r.target(), Some(1.0));
        assert_eq!(r.covariates(), [3.5, 0.0]);
    }

    #[test]
    fn transport_without_passengers_has_no_target() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let r = Reading::new(
            entity(),
            ts,
            ReadingValues::Transport {
                passengers: None,
                speed: Some(40.0),
                fuel_level: Some(0.5),
                latitude: 51.09,
                longitude: 32.35,
            },
        );
        assert_eq!(r.target(), None);
    }

    #[test]
    fn air_quality_falls_back_to_particulate_aqi() {
        let values = ReadingValues::AirQuality {
            aqi: None,
            pm25: Some(13.0),
            pm10: None,
            temperature: Some(20.0),
            humidity: Some(f64::NAN),
        };
        assert_eq!(values.target(), Some(51.0));
        assert_eq!(values.covariates(), [20.0, 0.0]);
    }

    #[test]
    fn non_finite_target_is_dropped() {
        let values = ReadingValues::Energy {
            power_consumption: f64::INFINITY,
            voltage: None,
            current: None,
            power_factor: None,
        };
        assert_eq!(values.target(), None);
    }
}
