//! Simplified air quality index helpers.

/// AQI from PM2.5 / PM10 concentrations (µg/m³), taking the worse of the two.
///
/// Piecewise-linear breakpoints, simplified from the EPA tables. Returns `None`
/// when neither pollutant is present.
pub fn calculate_aqi(pm25: Option<f64>, pm10: Option<f64>) -> Option<f64> {
    let sub_indices = [pm25.map(pm25_index), pm10.map(pm10_index)];
    sub_indices
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .map(f64::trunc)
}

fn pm25_index(c: f64) -> f64 {
    if c <= 12.0 {
        (50.0 / 12.0) * c
    } else if c <= 35.4 {
        50.0 + ((100.0 - 50.0) / (35.4 - 12.1)) * (c - 12.1)
    } else if c <= 55.4 {
        100.0 + ((150.0 - 100.0) / (55.4 - 35.5)) * (c - 35.5)
    } else if c <= 150.4 {
        150.0 + ((200.0 - 150.0) / (150.4 - 55.5)) * (c - 55.5)
    } else {
        200.0 + ((300.0 - 200.0) / (250.0 - 150.5)) * (c - 150.5)
    }
}

fn pm10_index(c: f64) -> f64 {
    if c <= 54.0 {
        (50.0 / 54.0) * c
    } else if c <= 154.0 {
        50.0 + ((100.0 - 50.0) / (154.0 - 55.0)) * (c - 55.0)
    } else if c <= 254.0 {
        100.0 + ((150.0 - 100.0) / (254.0 - 155.0)) * (c - 155.0)
    } else {
        150.0 + ((200.0 - 150.0) / (354.0 - 255.0)) * (c - 255.0)
    }
}

/// Human-readable band for an AQI value.
pub fn quality_level(aqi: f64) -> &'static str {
    if aqi <= 50.0 {
        "good"
    } else if aqi <= 100.0 {
        "moderate"
    } else if aqi <= 150.0 {
        "unhealthy_sensitive"
    } else if aqi <= 200.0 {
        "unhealthy"
    } else {
        "very_unhealthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_worst_pollutant() {
        // PM2.5 of 13 -> ~51.9, PM10 of 100 -> ~72.7
        assert_eq!(calculate_aqi(Some(13.0), Some(100.0)), Some(72.0));
        assert_eq!(calculate_aqi(Some(13.0), None), Some(51.0));
    }

    #[test]
    fn none_without_pollutants() {
        assert_eq!(calculate_aqi(None, None), None);
    }

    #[test]
    fn bands() {
        assert_eq!(quality_level(42.0), "good");
        assert_eq!(quality_level(100.0), "moderate");
        assert_eq!(quality_level(120.0), "unhealthy_sensitive");
        assert_eq!(quality_level(180.0), "unhealthy");
        assert_eq!(quality_level(301.0), "very_unhealthy");
    }
}
