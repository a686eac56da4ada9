//! Feature assembly: readings -> fixed-shape numeric vectors.
//!
//! Training samples and the inference vector go through the same `vectorize`
//! function, so the field order is identical by construction.

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use urbanpulse_core::{AnalyticsError, AnalyticsResult, Domain, EntityId};

use crate::config::{AnalyticsConfig, DomainSettings};
use crate::history::HistoryProvider;
use crate::reading::Reading;
use crate::stats::{mean, ols_slope, stddev_sample};

pub const FEATURE_COUNT: usize = 13;

/// Field order of every [`FeatureVector`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "last_value",
    "window_mean",
    "window_std",
    "window_min",
    "window_max",
    "trend_slope_per_hour",
    "lead_hours",
    "hour_sin",
    "hour_cos",
    "weekday_sin",
    "weekday_cos",
    "covariate_a_mean",
    "covariate_b_mean",
];

/// Names of the two covariate slots for a domain.
pub fn covariate_names(domain: Domain) -> [&'static str; 2] {
    match domain {
        Domain::Energy => ["voltage", "power_factor"],
        Domain::Water => ["flow_rate", "pressure"],
        Domain::Transport => ["speed", "fuel_level"],
        Domain::AirQuality => ["temperature", "humidity"],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

/// A reading reduced to what the models consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub covariates: [f64; 2],
}

/// Paired training data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub samples: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Everything the engine needs for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub observations: Vec<Observation>,
    pub training: TrainingSet,
    pub query: FeatureVector,
    /// Time the query vector predicts for.
    pub anchor: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    sample_window: usize,
    config: AnalyticsConfig,
}

impl FeatureBuilder {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            sample_window: config.sample_window.max(1),
            config: config.clone(),
        }
    }

    pub fn sample_window(&self) -> usize {
        self.sample_window
    }

    fn settings(&self, domain: Domain) -> DomainSettings {
        self.config.domain(domain)
    }

    /// Fetch the lookback window and reduce it to the inference vector.
    pub fn build<H>(
        &self,
        history: &H,
        entity_id: &EntityId,
        domain: Domain,
        lookback_days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<FeatureVector>
    where
        H: HistoryProvider + ?Sized,
    {
        Ok(self.fetch(history, entity_id, domain, lookback_days, now)?.query)
    }

    /// Fetch the lookback window and assemble training data plus query vector.
    pub fn fetch<H>(
        &self,
        history: &H,
        entity_id: &EntityId,
        domain: Domain,
        lookback_days: i64,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<FeatureSet>
    where
        H: HistoryProvider + ?Sized,
    {
        let since = window_start(now, lookback_days, "lookback window")?;
        let readings = history.readings(entity_id, domain, since)?;
        self.assemble(entity_id, domain, &readings, now)
    }

    /// Pure part of [`fetch`](Self::fetch): identical readings give bit-identical output.
    pub fn assemble(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        readings: &[Reading],
        now: DateTime<Utc>,
    ) -> AnalyticsResult<FeatureSet> {
        let settings = self.settings(domain);
        let observations = self.observations(entity_id, domain, readings, now)?;

        let anchor = hours(settings.horizon_hours)
            .and_then(|h| now.checked_add_signed(h))
            .ok_or_else(|| {
                AnalyticsError::invalid_input(format!(
                    "horizon of {} hours from {now} is out of range",
                    settings.horizon_hours
                ))
            })?;
        let training = self.training_set(&observations);
        let query = self.query_vector(&observations, anchor);

        debug!(
            domain = %domain,
            entity = %entity_id,
            readings = observations.len(),
            samples = training.len(),
            "assembled features"
        );

        Ok(FeatureSet {
            observations,
            training,
            query,
            anchor,
        })
    }

    /// Usable observations taken at or before `until`, oldest first. Fails when fewer
    /// than the domain minimum exist.
    pub fn observations(
        &self,
        entity_id: &EntityId,
        domain: Domain,
        readings: &[Reading],
        until: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Observation>> {
        let mut observations: Vec<Observation> = readings
            .iter()
            .filter(|r| r.domain() == domain && &r.entity_id == entity_id && r.timestamp <= until)
            .filter_map(|r| {
                r.target().map(|value| Observation {
                    timestamp: r.timestamp,
                    value,
                    covariates: r.covariates(),
                })
            })
            .collect();
        observations.sort_by_key(|o| o.timestamp);

        let required = self.settings(domain).min_readings;
        if observations.len() < required {
            return Err(AnalyticsError::insufficient_data(
                domain,
                entity_id,
                required,
                observations.len(),
            ));
        }
        Ok(observations)
    }

    /// Slide a `sample_window` window over the history; each window predicts the next value.
    pub fn training_set(&self, observations: &[Observation]) -> TrainingSet {
        let w = self.sample_window;
        let mut set = TrainingSet::default();
        if observations.len() <= w {
            return set;
        }
        for end in w..observations.len() {
            let target = &observations[end];
            set.samples
                .push(vectorize(&observations[end - w..end], target.timestamp));
            set.targets.push(target.value);
        }
        set
    }

    /// Vector over the trailing `sample_window` observations, predicting for `anchor`.
    pub fn query_vector(&self, observations: &[Observation], anchor: DateTime<Utc>) -> FeatureVector {
        let start = observations.len().saturating_sub(self.sample_window);
        vectorize(&observations[start..], anchor)
    }
}

/// Reduce a window of observations to a feature vector predicting for `anchor`.
///
/// An empty window yields all-zero statistics with only the calendar encodings set.
pub fn vectorize(window: &[Observation], anchor: DateTime<Utc>) -> FeatureVector {
    let values: Vec<f64> = window.iter().map(|o| o.value).collect();

    let last_value = values.last().copied().unwrap_or(0.0);
    let window_mean = mean(&values);
    let window_std = stddev_sample(&values, window_mean);
    let window_min = values.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let window_max = values.iter().copied().reduce(f64::max).unwrap_or(0.0);

    let (trend, lead_hours) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => {
            let xs: Vec<f64> = window
                .iter()
                .map(|o| hours_between(first.timestamp, o.timestamp))
                .collect();
            (ols_slope(&xs, &values), hours_between(last.timestamp, anchor))
        }
        _ => (0.0, 0.0),
    };

    let hour = f64::from(anchor.hour()) + f64::from(anchor.minute()) / 60.0;
    let hour_angle = TAU * hour / 24.0;
    let weekday_angle = TAU * f64::from(anchor.weekday().num_days_from_monday()) / 7.0;

    let cov_a: Vec<f64> = window.iter().map(|o| o.covariates[0]).collect();
    let cov_b: Vec<f64> = window.iter().map(|o| o.covariates[1]).collect();

    FeatureVector([
        last_value,
        window_mean,
        window_std,
        window_min,
        window_max,
        trend,
        lead_hours,
        hour_angle.sin(),
        hour_angle.cos(),
        weekday_angle.sin(),
        weekday_angle.cos(),
        mean(&cov_a),
        mean(&cov_b),
    ])
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

fn hours(h: f64) -> Option<Duration> {
    Duration::try_milliseconds((h * 3_600_000.0).round() as i64)
}

/// Start of a trailing window of `days` ending at `now`.
///
/// Non-positive windows and windows reaching past the representable calendar are
/// `InvalidInput`.
pub(crate) fn window_start(now: DateTime<Utc>, days: i64, what: &str) -> AnalyticsResult<DateTime<Utc>> {
    if days <= 0 {
        return Err(AnalyticsError::invalid_input(format!(
            "{what} must be positive (got {days} days)"
        )));
    }
    Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| AnalyticsError::invalid_input(format!("{what} of {days} days is out of range")))
}
