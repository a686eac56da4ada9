use crate::features::{FEATURE_COUNT, FeatureVector};

use super::scaler::Scaler;
use super::{Forecast, ForecastModel, ModelError, ModelFamily, check_training_input};

const L2_PENALTY: f64 = 1e-3;

/// Binary logistic regression trained with full-batch gradient descent.
///
/// Weights start at zero and the iteration count is fixed, so fitting is deterministic.
/// Targets `>= 0.5` are the positive class. The predicted value is the positive-class
/// probability; confidence is the probability of the predicted class.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    iterations: usize,
    learning_rate: f64,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    scaler: Scaler,
    bias: f64,
    weights: [f64; FEATURE_COUNT],
    training_accuracy: f64,
}

impl LogisticClassifier {
    pub fn new(iterations: usize, learning_rate: f64) -> Self {
        Self {
            iterations: iterations.max(1),
            learning_rate: if learning_rate.is_finite() && learning_rate > 0.0 {
                learning_rate
            } else {
                0.1
            },
            fitted: None,
        }
    }

    /// Share of training samples classified correctly.
    pub fn training_accuracy(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.training_accuracy)
    }
}

impl ForecastModel for LogisticClassifier {
    fn family(&self) -> ModelFamily {
        ModelFamily::Classifier
    }

    fn fit(&mut self, samples: &[FeatureVector], targets: &[f64]) -> Result<(), ModelError> {
        self.fitted = None;
        check_training_input(samples, targets)?;

        let labels: Vec<f64> = targets
            .iter()
            .map(|t| if *t >= 0.5 { 1.0 } else { 0.0 })
            .collect();
        let positives = labels.iter().filter(|l| **l > 0.5).count();
        if positives == 0 || positives == labels.len() {
            return Err(ModelError::Degenerate(
                "all training labels belong to one class".to_string(),
            ));
        }

        let scaler = Scaler::fit(samples);
        let rows: Vec<[f64; FEATURE_COUNT]> = samples.iter().map(|s| scaler.transform(s)).collect();
        let n = rows.len() as f64;

        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;
        for _ in 0..self.iterations {
            let mut grad_w = [0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;
            for (row, y) in rows.iter().zip(&labels) {
                let err = sigmoid(bias + dot(&weights, row)) - y;
                grad_b += err;
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
            }
            bias -= self.learning_rate * grad_b / n;
            for (w, g) in weights.iter_mut().zip(grad_w) {
                *w -= self.learning_rate * (g / n + L2_PENALTY * *w);
            }
        }

        let correct = rows
            .iter()
            .zip(&labels)
            .filter(|(row, y)| (sigmoid(bias + dot(&weights, row)) >= 0.5) == (**y > 0.5))
            .count();

        self.fitted = Some(Fitted {
            scaler,
            bias,
            weights,
            training_accuracy: correct as f64 / n,
        });
        Ok(())
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Forecast, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        let z = fitted.scaler.transform(vector);
        let p = sigmoid(fitted.bias + dot(&fitted.weights, &z));
        Ok(Forecast::new(p, p.max(1.0 - p)))
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

fn dot(a: &[f64; FEATURE_COUNT], b: &[f64; FEATURE_COUNT]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
