//! Analytics configuration.
//!
//! Defaults mirror the production thresholds; every field can be overridden from
//! `URBANPULSE_*` environment variables.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use urbanpulse_core::Domain;

use crate::model::ModelFamily;

/// Lower bound applied to every domain's `min_readings`.
pub const MIN_READINGS_FLOOR: usize = 5;

/// Upper bounds enforced by [`AnalyticsConfig::normalized`].
pub const MAX_SAMPLE_WINDOW: usize = 1_024;
pub const MAX_HORIZON_HOURS: f64 = 8_760.0;
pub const MAX_LOOKBACK_DAYS: i64 = 3_650;

/// Per-domain model settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainSettings {
    /// Usable readings required in the lookback window before features are built.
    pub min_readings: usize,
    /// Regressor or classifier. Chosen per domain, never inferred.
    pub model_family: ModelFamily,
    /// How far past `now` the prediction targets.
    pub horizon_hours: f64,
}

impl DomainSettings {
    pub fn defaults_for(domain: Domain) -> Self {
        match domain {
            Domain::Energy => Self {
                min_readings: 10,
                model_family: ModelFamily::Regressor,
                horizon_hours: 24.0,
            },
            Domain::Water => Self {
                min_readings: 20,
                model_family: ModelFamily::Classifier,
                horizon_hours: 0.0,
            },
            Domain::Transport => Self {
                min_readings: 10,
                model_family: ModelFamily::Regressor,
                horizon_hours: 0.0,
            },
            Domain::AirQuality => Self {
                min_readings: 10,
                model_family: ModelFamily::Regressor,
                horizon_hours: 24.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub default_lookback_days: i64,
    /// Readings per training sample (and in the inference window).
    pub sample_window: usize,
    /// Share of the newest training samples held out to score regressors.
    pub holdout_fraction: f64,
    pub ridge_lambda: f64,
    pub classifier_iterations: usize,
    pub classifier_learning_rate: f64,
    /// Classifier probability above which an alert is published.
    pub alert_threshold: f64,
    pub cache_models: bool,
    pub domains: BTreeMap<Domain, DomainSettings>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: 30,
            sample_window: 4,
            holdout_fraction: 0.2,
            ridge_lambda: 1e-3,
            classifier_iterations: 500,
            classifier_learning_rate: 0.1,
            alert_threshold: 0.7,
            cache_models: true,
            domains: Domain::ALL
                .into_iter()
                .map(|d| (d, DomainSettings::defaults_for(d)))
                .collect(),
        }
    }
}

impl AnalyticsConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (tests, config files flattened to env-style keys).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        cfg.default_lookback_days = parse_or(&lookup, "URBANPULSE_LOOKBACK_DAYS", cfg.default_lookback_days);
        cfg.sample_window = parse_or(&lookup, "URBANPULSE_SAMPLE_WINDOW", cfg.sample_window);
        cfg.holdout_fraction = parse_or(&lookup, "URBANPULSE_HOLDOUT_FRACTION", cfg.holdout_fraction);
        cfg.ridge_lambda = parse_or(&lookup, "URBANPULSE_RIDGE_LAMBDA", cfg.ridge_lambda);
        cfg.classifier_iterations =
            parse_or(&lookup, "URBANPULSE_CLASSIFIER_ITERATIONS", cfg.classifier_iterations);
        cfg.classifier_learning_rate =
            parse_or(&lookup, "URBANPULSE_CLASSIFIER_LEARNING_RATE", cfg.classifier_learning_rate);
        cfg.alert_threshold = parse_or(&lookup, "URBANPULSE_ALERT_THRESHOLD", cfg.alert_threshold);
        cfg.cache_models = parse_or(&lookup, "URBANPULSE_CACHE_MODELS", cfg.cache_models);

        for domain in Domain::ALL {
            let prefix = domain.env_prefix();
            let mut s = DomainSettings::defaults_for(domain);
            s.min_readings = parse_or(
                &lookup,
                &format!("URBANPULSE_{prefix}_MIN_READINGS"),
                s.min_readings,
            );
            s.model_family = parse_or(&lookup, &format!("URBANPULSE_{prefix}_MODEL"), s.model_family);
            s.horizon_hours = parse_or(
                &lookup,
                &format!("URBANPULSE_{prefix}_HORIZON_HOURS"),
                s.horizon_hours,
            );
            cfg.domains.insert(domain, s);
        }

        cfg.normalized()
    }

    /// Settings for a domain, with `min_readings` clamped so at least two
    /// training samples always exist.
    pub fn domain(&self, domain: Domain) -> DomainSettings {
        let mut s = self
            .domains
            .get(&domain)
            .copied()
            .unwrap_or_else(|| DomainSettings::defaults_for(domain));
        s.min_readings = s.min_readings.max(self.min_readings_floor());
        s
    }

    fn min_readings_floor(&self) -> usize {
        MIN_READINGS_FLOOR.max(self.sample_window.saturating_add(2))
    }

    /// Clamp out-of-range values back into something usable.
    pub fn normalized(mut self) -> Self {
        if self.sample_window == 0 {
            warn!("sample_window must be >= 1; using 1");
            self.sample_window = 1;
        }
        if self.sample_window > MAX_SAMPLE_WINDOW {
            warn!(value = self.sample_window, "sample_window too large; using {MAX_SAMPLE_WINDOW}");
            self.sample_window = MAX_SAMPLE_WINDOW;
        }
        if !(self.holdout_fraction.is_finite() && (0.0..0.5).contains(&self.holdout_fraction)) {
            warn!(value = self.holdout_fraction, "holdout_fraction out of range; using 0.2");
            self.holdout_fraction = 0.2;
        }
        if !(self.ridge_lambda.is_finite() && self.ridge_lambda >= 0.0) {
            warn!(value = self.ridge_lambda, "ridge_lambda must be >= 0; using 1e-3");
            self.ridge_lambda = 1e-3;
        }
        if !(self.classifier_learning_rate.is_finite() && self.classifier_learning_rate > 0.0) {
            warn!("classifier_learning_rate must be > 0; using 0.1");
            self.classifier_learning_rate = 0.1;
        }
        if self.default_lookback_days <= 0 {
            warn!("default_lookback_days must be > 0; using 30");
            self.default_lookback_days = 30;
        }
        if self.default_lookback_days > MAX_LOOKBACK_DAYS {
            warn!(value = self.default_lookback_days, "default_lookback_days too large; using {MAX_LOOKBACK_DAYS}");
            self.default_lookback_days = MAX_LOOKBACK_DAYS;
        }
        for s in self.domains.values_mut() {
            if !(s.horizon_hours.is_finite() && s.horizon_hours >= 0.0) {
                s.horizon_hours = 0.0;
            } else if s.horizon_hours > MAX_HORIZON_HOURS {
                warn!(value = s.horizon_hours, "horizon_hours too large; using {MAX_HORIZON_HOURS}");
                s.horizon_hours = MAX_HORIZON_HOURS;
            }
        }
        self
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "unparsable config value; keeping default");
                default
            }
        },
    }
}
