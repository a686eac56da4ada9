//! Measurement domains.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// An independent measurement/prediction category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Energy,
    Water,
    Transport,
    #[serde(alias = "air-quality", alias = "airquality")]
    AirQuality,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Energy,
        Domain::Water,
        Domain::Transport,
        Domain::AirQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Energy => "energy",
            Domain::Water => "water",
            Domain::Transport => "transport",
            Domain::AirQuality => "air_quality",
        }
    }

    /// Kind of entity readings in this domain belong to.
    pub fn entity_kind(self) -> &'static str {
        match self {
            Domain::Energy => "meter",
            Domain::Water => "sensor",
            Domain::Transport => "vehicle",
            Domain::AirQuality => "station",
        }
    }

    /// Prediction type produced when the caller does not ask for a specific one.
    pub fn default_prediction_type(self) -> &'static str {
        match self {
            Domain::Energy => "consumption_24h",
            Domain::Water => "leak_probability",
            Domain::Transport => "passenger_demand",
            Domain::AirQuality => "aqi_24h",
        }
    }

    /// Prefix used for per-domain environment variables (`URBANPULSE_<PREFIX>_...`).
    pub fn env_prefix(self) -> &'static str {
        match self {
            Domain::Energy => "ENERGY",
            Domain::Water => "WATER",
            Domain::Transport => "TRANSPORT",
            Domain::AirQuality => "AIR_QUALITY",
        }
    }
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" => Ok(Domain::Energy),
            "water" => Ok(Domain::Water),
            "transport" => Ok(Domain::Transport),
            "air_quality" | "air-quality" | "airquality" => Ok(Domain::AirQuality),
            other => Err(AnalyticsError::invalid_input(format!(
                "unknown domain: {other}"
            ))),
        }
    }
}
