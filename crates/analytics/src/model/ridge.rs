use crate::features::{FEATURE_COUNT, FeatureVector};
use crate::stats::{mean, variance};

use super::linalg::solve;
use super::scaler::Scaler;
use super::{Forecast, ForecastModel, ModelError, ModelFamily, check_training_input};

/// Held-out scoring needs at least this many samples; below it the in-sample R² is used.
const MIN_SAMPLES_FOR_HOLDOUT: usize = 5;

/// L2-regularised linear regression over standardised features.
///
/// Confidence is the skill of the model on the newest held-out samples relative to
/// predicting the training mean, clamped to \[0, 1\]. The served model is refit on
/// every sample after scoring.
#[derive(Debug, Clone)]
pub struct RidgeRegressor {
    lambda: f64,
    holdout_fraction: f64,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    scaler: Scaler,
    intercept: f64,
    weights: [f64; FEATURE_COUNT],
    confidence: f64,
    training_samples: usize,
}

impl RidgeRegressor {
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda: if lambda.is_finite() { lambda.max(0.0) } else { 0.0 },
            holdout_fraction: 0.2,
            fitted: None,
        }
    }

    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        if fraction.is_finite() {
            self.holdout_fraction = fraction.clamp(0.0, 0.5);
        }
        self
    }

    pub fn confidence(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.confidence)
    }

    pub fn training_samples(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.training_samples)
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| &f.weights[..])
    }

    fn solve_weights(&self, samples: &[FeatureVector], targets: &[f64]) -> Result<Fitted, ModelError> {
        let scaler = Scaler::fit(samples);
        let y_mean = mean(targets);
        let rows: Vec<[f64; FEATURE_COUNT]> = samples.iter().map(|s| scaler.transform(s)).collect();

        // Normal equations: (XᵀX + λnI) w = Xᵀ(y - ȳ). A strictly positive ridge keeps
        // constant (all-zero) columns solvable.
        let n = samples.len() as f64;
        let ridge = self.lambda.max(1e-9) * n;
        let mut xtx = vec![vec![0.0; FEATURE_COUNT]; FEATURE_COUNT];
        let mut xty = vec![0.0; FEATURE_COUNT];
        for (row, y) in rows.iter().zip(targets) {
            let yc = y - y_mean;
            for i in 0..FEATURE_COUNT {
                xty[i] += row[i] * yc;
                for j in 0..FEATURE_COUNT {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, r) in xtx.iter_mut().enumerate() {
            r[i] += ridge;
        }

        let solution = solve(xtx, xty)
            .ok_or_else(|| ModelError::Degenerate("normal equations are singular".to_string()))?;
        let mut weights = [0.0; FEATURE_COUNT];
        weights.copy_from_slice(&solution);

        Ok(Fitted {
            scaler,
            intercept: y_mean,
            weights,
            confidence: 0.0,
            training_samples: samples.len(),
        })
    }

    fn held_out_skill(&self, samples: &[FeatureVector], targets: &[f64]) -> Option<f64> {
        let n = samples.len();
        if n < MIN_SAMPLES_FOR_HOLDOUT || self.holdout_fraction <= 0.0 {
            return None;
        }
        let k = ((n as f64 * self.holdout_fraction).round() as usize).clamp(1, n - 2);
        let split = n - k;
        let (train_x, test_x) = samples.split_at(split);
        let (train_y, test_y) = targets.split_at(split);
        if variance(train_y) <= f64::EPSILON {
            return None;
        }

        let model = self.solve_weights(train_x, train_y).ok()?;
        let baseline = mean(train_y);
        let mut mse_model = 0.0;
        let mut mse_naive = 0.0;
        for (x, y) in test_x.iter().zip(test_y) {
            mse_model += (y - evaluate(&model, x)).powi(2);
            mse_naive += (y - baseline).powi(2);
        }
        Some(skill(mse_model, mse_naive))
    }
}

impl ForecastModel for RidgeRegressor {
    fn family(&self) -> ModelFamily {
        ModelFamily::Regressor
    }

    fn fit(&mut self, samples: &[FeatureVector], targets: &[f64]) -> Result<(), ModelError> {
        self.fitted = None;
        check_training_input(samples, targets)?;
        if variance(targets) <= f64::EPSILON {
            return Err(ModelError::Degenerate("targets have zero variance".to_string()));
        }

        let mut fitted = self.solve_weights(samples, targets)?;
        let confidence = match self.held_out_skill(samples, targets) {
            Some(c) => c,
            None => {
                let y_mean = mean(targets);
                let ss_res: f64 = samples
                    .iter()
                    .zip(targets)
                    .map(|(x, y)| (y - evaluate(&fitted, x)).powi(2))
                    .sum();
                let ss_tot: f64 = targets.iter().map(|y| (y - y_mean).powi(2)).sum();
                skill(ss_res, ss_tot)
            }
        };
        fitted.confidence = confidence;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Forecast, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(Forecast::new(evaluate(fitted, vector), fitted.confidence))
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

fn evaluate(fitted: &Fitted, vector: &FeatureVector) -> f64 {
    let z = fitted.scaler.transform(vector);
    fitted.intercept
        + z.iter()
            .zip(fitted.weights.iter())
            .map(|(x, w)| x * w)
            .sum::<f64>()
}

/// `1 - err/baseline`, clamped. A zero baseline scores 1 only for a perfect model.
fn skill(err: f64, baseline: f64) -> f64 {
    if baseline <= f64::EPSILON {
        return if err <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - err / baseline).clamp(0.0, 1.0)
}
