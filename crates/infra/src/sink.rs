use std::sync::Mutex;

use tracing::info;

use urbanpulse_analytics::{Prediction, PredictionSink};

/// Captures published predictions for inspection in tests.
#[derive(Debug, Default)]
pub struct InMemoryPredictionSink {
    inner: Mutex<Vec<(String, Prediction)>>,
}

impl InMemoryPredictionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<(String, Prediction)> {
        self.inner.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Predictions published on `topic`, in publication order.
    pub fn on_topic(&self, topic: &str) -> Vec<Prediction> {
        self.inner
            .lock()
            .map(|v| {
                v.iter()
                    .filter(|(t, _)| t == topic)
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl PredictionSink for InMemoryPredictionSink {
    fn publish(&self, topic: &str, prediction: &Prediction) {
        if let Ok(mut v) = self.inner.lock() {
            v.push((topic.to_string(), prediction.clone()));
        }
    }
}

/// Emits each publication as a structured log event.
#[derive(Debug, Default, Copy, Clone)]
pub struct TracingPredictionSink;

impl PredictionSink for TracingPredictionSink {
    fn publish(&self, topic: &str, prediction: &Prediction) {
        let payload = serde_json::to_string(prediction).unwrap_or_default();
        info!(
            topic,
            prediction_id = %prediction.id,
            domain = %prediction.domain,
            entity = %prediction.entity_id,
            payload = %payload,
            "prediction published"
        );
    }
}
