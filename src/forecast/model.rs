//! Gradient-boosted demand model over (hour-of-day, weekday) features.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::tree::{Features, RegressionTree, TreeParams};
use crate::config::ModelConfig;
use crate::types::{SeriesPoint, hour_of_day, weekday_index};

/// Trained least-squares boosting ensemble.
///
/// Prediction is `init + learning_rate * sum(tree(x))`, where `init` is the
/// mean training target.
#[derive(Debug, Clone)]
pub struct DemandModel {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

fn features(hour: usize, weekday: usize) -> Features {
    [hour as f64, weekday as f64]
}

impl DemandModel {
    /// Fits the model to an hourly series.
    ///
    /// Returns `None` (untrained) when the series is shorter than
    /// `config.min_training_points` or every target is identical. Training
    /// is deterministic for a given series and `config.seed`.
    pub fn train(series: &[SeriesPoint], config: &ModelConfig) -> Option<Self> {
        if series.len() < config.min_training_points.max(1) {
            debug!(
                points = series.len(),
                required = config.min_training_points,
                "not enough history, model left untrained"
            );
            return None;
        }

        let samples: Vec<Features> = series
            .iter()
            .map(|p| features(hour_of_day(p.timestamp), weekday_index(p.timestamp)))
            .collect();
        let targets: Vec<f64> = series.iter().map(|p| p.value).collect();

        let first = targets[0];
        if targets.iter().all(|&v| v == first) {
            debug!(value = first, "constant target, model left untrained");
            return None;
        }

        let n = targets.len();
        let init = targets.iter().sum::<f64>() / n as f64;
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
        };
        let sample_size = ((n as f64 * config.subsample).round() as usize).clamp(1, n);
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut fitted = vec![init; n];
        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&fitted)
                .map(|(y, f)| y - f)
                .collect();

            let rows = if sample_size < n {
                let mut rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(&samples, &residuals, rows, params, &mut rng);
            for (f, x) in fitted.iter_mut().zip(&samples) {
                *f += config.learning_rate * tree.predict(x);
            }
            trees.push(tree);
        }

        debug!(
            points = n,
            trees = trees.len(),
            init,
            "trained demand model"
        );
        Some(Self {
            init,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    /// Predicts demand for an hour of day (0..24) and weekday (Monday = 0).
    pub fn predict(&self, hour: usize, weekday: usize) -> f64 {
        let x = features(hour, weekday);
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict(&x)).sum::<f64>()
    }

    /// Predicts demand for the hour containing `ts`.
    pub fn predict_at(&self, ts: DateTime<Utc>) -> f64 {
        self.predict(hour_of_day(ts), weekday_index(ts))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
