use crate::features::{FEATURE_COUNT, FeatureVector};

/// Per-feature standardisation. Constant features map to 0.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scaler {
    means: [f64; FEATURE_COUNT],
    scales: [f64; FEATURE_COUNT],
}

impl Scaler {
    pub(crate) fn fit(samples: &[FeatureVector]) -> Self {
        let n = samples.len().max(1) as f64;
        let mut means = [0.0; FEATURE_COUNT];
        let mut scales = [1.0; FEATURE_COUNT];

        for s in samples {
            for (m, x) in means.iter_mut().zip(s.as_slice()) {
                *m += x / n;
            }
        }
        for j in 0..FEATURE_COUNT {
            let var = samples
                .iter()
                .map(|s| {
                    let d = s.as_slice()[j] - means[j];
                    d * d
                })
                .sum::<f64>()
                / n;
            let sd = var.sqrt();
            if sd > 1e-12 {
                scales[j] = sd;
            }
        }
        Self { means, scales }
    }

    pub(crate) fn transform(&self, v: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (j, x) in v.as_slice().iter().enumerate() {
            out[j] = (x - self.means[j]) / self.scales[j];
        }
        out
    }
}
