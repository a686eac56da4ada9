use serde::{Deserialize, Serialize};

use urbanpulse_core::{AnalyticsError, AnalyticsResult};

use crate::geo::haversine_km;

/// A geographic point to visit. Input-only; has no persisted identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            label: None,
        }
    }

    pub fn labeled(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            label: Some(label.into()),
        }
    }

    pub fn distance_km(&self, other: &Waypoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        let name = self.label.as_deref().unwrap_or("<unlabeled>");
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(AnalyticsError::invalid_input(format!(
                "waypoint {name}: latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(AnalyticsError::invalid_input(format!(
                "waypoint {name}: longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Ordered visiting plan. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    pub total_distance_km: f64,
}

impl Route {
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn labels(&self) -> Vec<Option<&str>> {
        self.waypoints.iter().map(|w| w.label.as_deref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Waypoint::new(91.0, 0.0).validate().is_err());
        assert!(Waypoint::new(0.0, -180.5).validate().is_err());
        assert!(Waypoint::new(f64::NAN, 0.0).validate().is_err());
        assert!(Waypoint::labeled(-90.0, 180.0, "pole").validate().is_ok());
    }

    #[test]
    fn label_is_optional_on_the_wire() {
        let w: Waypoint = serde_json::from_str(r#"{"latitude": 1.0, "longitude": 2.0}"#).unwrap();
        assert_eq!(w, Waypoint::new(1.0, 2.0));
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"latitude":1.0,"longitude":2.0}"#
        );
    }
}
