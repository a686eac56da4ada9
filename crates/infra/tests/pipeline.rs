//! End-to-end prediction pipeline over the in-memory adapters.

use std::f64::consts::TAU;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use urbanpulse_analytics::{
    ALERT_TOPIC, AccuracyMetric, AnalyticsConfig, AnalyticsEngine, AnalyticsError, Domain,
    EntityId, FEATURE_COUNT, PREDICTION_TOPIC, Reading, ReadingValues,
};
use urbanpulse_infra::{InMemoryHistoryProvider, InMemoryPredictionSink, InMemoryPredictionStore};

type Engine = AnalyticsEngine<Arc<InMemoryHistoryProvider>, Arc<InMemoryPredictionStore>>;

struct Harness {
    history: Arc<InMemoryHistoryProvider>,
    store: Arc<InMemoryPredictionStore>,
    sink: Arc<InMemoryPredictionSink>,
    engine: Engine,
}

fn harness() -> Harness {
    urbanpulse_observability::init();
    let history = Arc::new(InMemoryHistoryProvider::new());
    let store = Arc::new(InMemoryPredictionStore::new());
    let sink = Arc::new(InMemoryPredictionSink::new());
    let engine = AnalyticsEngine::new(AnalyticsConfig::default(), history.clone(), store.clone())
        .with_sink(sink.clone());
    Harness {
        history,
        store,
        sink,
        engine,
    }
}

/// Monday midnight.
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
}

fn at(hour: usize) -> DateTime<Utc> {
    t0() + Duration::hours(hour as i64)
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap()
}

fn daily(hour: usize) -> f64 {
    (TAU * (hour % 24) as f64 / 24.0).sin()
}

fn energy_series(entity: &EntityId, hours: usize) -> Vec<Reading> {
    (0..hours)
        .map(|h| {
            Reading::new(
                entity.clone(),
                at(h),
                ReadingValues::Energy {
                    power_consumption: 200.0 + 50.0 * daily(h) + 0.3 * h as f64,
                    voltage: Some(230.0 + daily(h)),
                    current: Some(10.0),
                    power_factor: Some(0.92),
                },
            )
        })
        .collect()
}

/// Dry for the first `leak_from` hours, leaking afterwards.
fn water_series(entity: &EntityId, hours: usize, leak_from: usize) -> Vec<Reading> {
    (0..hours)
        .map(|h| {
            let leaking = h >= leak_from;
            Reading::new(
                entity.clone(),
                at(h),
                ReadingValues::Water {
                    flow_rate: Some(if leaking { 25.0 } else { 10.0 } + 0.1 * daily(h)),
                    pressure: Some(if leaking { 1.5 } else { 4.0 }),
                    leak_detected: leaking,
                },
            )
        })
        .collect()
}

fn transport_series(entity: &EntityId, hours: usize) -> Vec<Reading> {
    (0..hours)
        .map(|h| {
            let passengers = (20.0 + 15.0 * daily(h)).round() as u32;
            Reading::new(
                entity.clone(),
                at(h),
                ReadingValues::Transport {
                    // Every fifth reading lost its passenger count.
                    passengers: (h % 5 != 4).then_some(passengers),
                    speed: Some(30.0 + 5.0 * daily(h)),
                    fuel_level: Some(80.0 - 0.2 * h as f64),
                    latitude: 51.09,
                    longitude: 32.35,
                },
            )
        })
        .collect()
}

fn air_series(entity: &EntityId, hours: usize) -> Vec<Reading> {
    (0..hours)
        .map(|h| {
            Reading::new(
                entity.clone(),
                at(h),
                ReadingValues::AirQuality {
                    aqi: None,
                    pm25: Some(14.0 + 8.0 * daily(h)),
                    pm10: Some(45.0 + 20.0 * daily(h)),
                    temperature: Some(18.0 + 6.0 * daily(h)),
                    humidity: Some(60.0),
                },
            )
        })
        .collect()
}

#[test]
fn energy_forecast_is_persisted_and_published() {
    let h = harness();
    let meter = id("meter-0042");
    h.history.ingest_all(energy_series(&meter, 168)).unwrap();
    let now = at(168);

    let p = h
        .engine
        .predict_at(Domain::Energy, &meter, "consumption_24h", 30, now)
        .unwrap();

    assert_eq!(p.domain, Domain::Energy);
    assert!(p.predicted_value >= 0.0);
    assert!((0.0..=1.0).contains(&p.confidence_score));
    assert_eq!(p.generated_at, now);
    assert_eq!(p.target_at, now + Duration::hours(24));
    assert_eq!(p.metadata["unit"], "kWh");
    assert_eq!(p.metadata["reading_count"], 168);
    assert_eq!(p.metadata["training_samples"], 164);

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.sink.on_topic(PREDICTION_TOPIC), vec![p.clone()]);
    assert!(h.sink.on_topic(ALERT_TOPIC).is_empty());
    assert_eq!(h.engine.history(&meter, Domain::Energy, 10).unwrap(), vec![p]);
}

#[test]
fn leaking_main_raises_an_alert() {
    let h = harness();
    let main = id("main-17");
    h.history.ingest_all(water_series(&main, 80, 40)).unwrap();

    let p = h
        .engine
        .predict_at(Domain::Water, &main, "leak_probability", 30, at(80))
        .unwrap();

    assert!(p.predicted_value > 0.7, "leak probability {}", p.predicted_value);
    assert!((0.0..=1.0).contains(&p.predicted_value));
    assert_eq!(p.metadata["risk_level"], "high");
    assert_eq!(p.metadata["model_family"], "classifier");
    // Horizon is zero for water.
    assert_eq!(p.target_at, at(80));

    assert_eq!(h.sink.on_topic(PREDICTION_TOPIC).len(), 1);
    assert_eq!(h.sink.on_topic(ALERT_TOPIC), vec![p]);
}

#[test]
fn transport_skips_readings_without_passenger_counts() {
    let h = harness();
    let bus = id("bus-12");
    h.history.ingest_all(transport_series(&bus, 100)).unwrap();

    let p = h
        .engine
        .predict_at(Domain::Transport, &bus, "passenger_demand", 30, at(100))
        .unwrap();

    assert_eq!(p.metadata["reading_count"], 80);
    assert!(p.predicted_value >= 0.0);
    let level = p.metadata["demand_level"].as_str().unwrap();
    assert!(["low", "medium", "high"].contains(&level));
    assert_eq!(p.metadata["covariates"], serde_json::json!(["speed", "fuel_level"]));
}

#[test]
fn air_quality_falls_back_to_particulate_aqi() {
    let h = harness();
    let station = id("station-north");
    h.history.ingest_all(air_series(&station, 96)).unwrap();

    let p = h
        .engine
        .predict_at(Domain::AirQuality, &station, "aqi_24h", 30, at(96))
        .unwrap();

    assert_eq!(p.metadata["reading_count"], 96);
    assert!(p.predicted_value >= 0.0);
    assert!(p.metadata["quality_level"].is_string());
    assert_eq!(p.target_at, at(96) + Duration::hours(24));
}

#[test]
fn known_entity_without_readings_is_insufficient() {
    let h = harness();
    let meter = id("meter-new");
    h.history.register(meter.clone(), Domain::Energy).unwrap();

    let err = h
        .engine
        .predict_at(Domain::Energy, &meter, "consumption_24h", 30, at(0))
        .unwrap_err();
    assert!(matches!(
        err,
        AnalyticsError::InsufficientData {
            required: 10,
            actual: 0,
            ..
        }
    ));
    assert!(h.store.is_empty());
    assert!(h.sink.all().is_empty());

    let ghost = id("meter-ghost");
    assert!(matches!(
        h.engine
            .predict_at(Domain::Energy, &ghost, "consumption_24h", 30, at(0)),
        Err(AnalyticsError::NotFound { .. })
    ));
}

#[test]
fn lookback_excludes_older_readings() {
    let h = harness();
    let meter = id("meter-sparse");
    h.history.ingest_all(energy_series(&meter, 24)).unwrap();

    // Only the last 24h before hour 48 are considered: none exist.
    let err = h
        .engine
        .predict_at(Domain::Energy, &meter, "consumption_24h", 1, at(48))
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InsufficientData { actual: 0, .. }));
}

#[test]
fn reconcile_feeds_accuracy() {
    let h = harness();
    let main = id("main-3");
    h.history.ingest_all(water_series(&main, 80, 40)).unwrap();

    // Target hour 60 is already observed; target hour 80 is not.
    let resolved = h
        .engine
        .predict_at(Domain::Water, &main, "leak_probability", 30, at(60))
        .unwrap();
    let pending = h
        .engine
        .predict_at(Domain::Water, &main, "leak_probability", 30, at(80))
        .unwrap();

    assert_eq!(h.engine.reconcile(&main, Domain::Water, 10).unwrap(), 1);
    assert!(h.engine.tracker().has_outcome(resolved.id));
    assert!(!h.engine.tracker().has_outcome(pending.id));
    assert_eq!(h.engine.reconcile(&main, Domain::Water, 10).unwrap(), 0);

    let record = h.engine.accuracy_at(Domain::Water, 7, at(80)).unwrap();
    assert_eq!(record.metric, AccuracyMetric::AccuracyRate);
    assert_eq!(record.sample_count, 1);
    assert_eq!(record.accuracy_rate, Some(1.0));
    assert_eq!(record.by_prediction_type.len(), 1);
    assert_eq!(record.by_prediction_type[0].prediction_type, "leak_probability");

    // Outside the window nothing counts.
    let later = h
        .engine
        .accuracy_at(Domain::Water, 1, at(80) + Duration::days(5))
        .unwrap();
    assert_eq!(later.sample_count, 0);
}

#[test]
fn recent_spans_entities_newest_first() {
    let h = harness();
    let (a, b) = (id("bus-1"), id("bus-2"));
    h.history.ingest_all(transport_series(&a, 60)).unwrap();
    h.history.ingest_all(transport_series(&b, 60)).unwrap();

    h.engine
        .predict_at(Domain::Transport, &a, "passenger_demand", 30, at(50))
        .unwrap();
    h.engine
        .predict_at(Domain::Transport, &b, "passenger_demand", 30, at(55))
        .unwrap();

    let recent = h.engine.recent(Domain::Transport, 10).unwrap();
    let owners: Vec<&str> = recent.iter().map(|p| p.entity_id.as_str()).collect();
    assert_eq!(owners, vec!["bus-2", "bus-1"]);
    assert_eq!(h.engine.recent(Domain::Transport, 1).unwrap().len(), 1);
    assert!(h.engine.recent(Domain::Energy, 10).unwrap().is_empty());
}

#[test]
fn features_are_stable_across_calls() {
    let h = harness();
    let meter = id("meter-stable");
    h.history.ingest_all(energy_series(&meter, 72)).unwrap();

    let builder = h.engine.feature_builder();
    let first = builder
        .build(h.history.as_ref(), &meter, Domain::Energy, 30, at(72))
        .unwrap();
    let second = builder
        .build(h.history.as_ref(), &meter, Domain::Energy, 30, at(72))
        .unwrap();

    assert_eq!(first.len(), FEATURE_COUNT);
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(first.as_slice()), bits(second.as_slice()));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        ..ProptestConfig::default()
    })]

    /// Property: any sufficiently long history yields a full-width vector, twice identically.
    #[test]
    fn feature_vectors_are_deterministic(
        loads in prop::collection::vec(0.0f64..1_000.0, 10..60),
        voltage in 200.0f64..250.0,
    ) {
        let history = Arc::new(InMemoryHistoryProvider::new());
        let meter = id("meter-prop");
        for (h, load) in loads.iter().enumerate() {
            history
                .ingest(Reading::new(
                    meter.clone(),
                    at(h),
                    ReadingValues::Energy {
                        power_consumption: *load,
                        voltage: Some(voltage),
                        current: None,
                        power_factor: None,
                    },
                ))
                .unwrap();
        }

        let engine = AnalyticsEngine::new(
            AnalyticsConfig::default(),
            history.clone(),
            InMemoryPredictionStore::new(),
        );
        let now = at(loads.len());
        let builder = engine.feature_builder();
        let set = builder.fetch(history.as_ref(), &meter, Domain::Energy, 30, now).unwrap();
        let again = builder.build(history.as_ref(), &meter, Domain::Energy, 30, now).unwrap();

        prop_assert_eq!(set.query.len(), FEATURE_COUNT);
        prop_assert_eq!(set.training.len(), loads.len() - engine.config().sample_window);
        for (x, y) in set.query.as_slice().iter().zip(again.as_slice()) {
            prop_assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}
