//! Random forest regressor
//!
//! Bagged ensemble of CART regression trees. Each tree is grown on a bootstrap
//! resample of the training rows, considering all four metric features at
//! every split; the forest predicts the mean of its trees.
//!
//! Tree `t` draws from an RNG seeded with `seed + t`, so serial and
//! `parallel` builds of the same configuration are bit-identical.

use super::tree::{RegressionTree, TreeParams};
use super::{FeatureVector, Regressor};
use crate::analysis::METRIC_COUNT;
use crate::config::ForestConfig;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ensemble-of-decision-trees regressor.
///
/// # Example
///
/// ```rust
/// use pid_analyzer::config::ForestConfig;
/// use pid_analyzer::estimator::{RandomForestRegressor, Regressor};
///
/// let features = vec![
///     [10.0, 50.0, 2.0, 0.1],
///     [20.0, 80.0, 8.0, 0.3],
///     [15.0, 60.0, 5.0, 0.2],
/// ];
/// let labels = vec![1.0, 3.0, 2.0];
///
/// let mut forest = RandomForestRegressor::new(ForestConfig::default())?;
/// forest.fit(&features, &labels)?;
/// let kp = forest.predict_one(&[15.0, 63.0, 5.0, 0.2])?;
/// assert!((1.0..=3.0).contains(&kp));
/// # Ok::<(), pid_analyzer::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            config: ForestConfig::default(),
            trees: Vec::new(),
        }
    }
}

impl RandomForestRegressor {
    /// Create an unfitted forest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the hyper-parameters are invalid
    pub fn new(config: ForestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            trees: Vec::new(),
        })
    }

    /// Hyper-parameters
    #[must_use]
    pub const fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Whether `fit` has completed successfully
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Number of fitted trees
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn grow_tree(&self, features: &[FeatureVector], labels: &[f64], index: usize) -> RegressionTree {
        let n = labels.len();
        let rows: Vec<usize> = if self.config.bootstrap {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(index as u64));
            (0..n).map(|_| rng.gen_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        RegressionTree::fit(features, labels, rows, params)
    }

    #[cfg(feature = "parallel")]
    fn grow_trees(&self, features: &[FeatureVector], labels: &[f64]) -> Vec<RegressionTree> {
        use rayon::prelude::*;
        (0..self.config.n_trees)
            .into_par_iter()
            .map(|t| self.grow_tree(features, labels, t))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn grow_trees(&self, features: &[FeatureVector], labels: &[f64]) -> Vec<RegressionTree> {
        (0..self.config.n_trees)
            .map(|t| self.grow_tree(features, labels, t))
            .collect()
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, features: &[FeatureVector], labels: &[f64]) -> Result<()> {
        validate_training_set(features, labels)?;
        self.trees = self.grow_trees(features, labels);
        tracing::debug!(
            rows = labels.len(),
            trees = self.trees.len(),
            "fitted random forest"
        );
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict_one(&self, features: &FeatureVector) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::Training("predict called before fit".to_string()));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(Error::Training(format!(
                "prediction input must be finite, got {features:?}"
            )));
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

fn validate_training_set(features: &[FeatureVector], labels: &[f64]) -> Result<()> {
    if features.is_empty() {
        return Err(Error::Training("no training rows".to_string()));
    }
    if features.len() != labels.len() {
        return Err(Error::Training(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    if let Some(row) = features.iter().position(|f| f.iter().any(|v| !v.is_finite())) {
        return Err(Error::Training(format!("non-finite feature in row {row}")));
    }
    if let Some(row) = labels.iter().position(|v| !v.is_finite()) {
        return Err(Error::Training(format!("non-finite label in row {row}")));
    }

    let first = features[0];
    let varies = (0..METRIC_COUNT)
        .any(|c| features.iter().any(|f| f[c].to_bits() != first[c].to_bits()));
    if !varies {
        return Err(Error::Training(
            "degenerate features: every metric column is constant".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_set() -> (Vec<FeatureVector>, Vec<f64>) {
        let features = (0_i32..12)
            .map(|i| {
                let x = f64::from(i);
                [x, 10.0 * x, 0.5 * x, 0.1]
            })
            .collect();
        let labels = (0..12).map(|i| if i < 6 { 1.0 } else { 5.0 }).collect();
        (features, labels)
    }

    #[test]
    fn test_forest_fit_predict() {
        let (features, labels) = training_set();
        let mut forest = RandomForestRegressor::default();
        forest.fit(&features, &labels).unwrap();

        assert!(forest.is_fitted());
        assert_eq!(forest.tree_count(), 100);
        let low = forest.predict_one(&[0.0, 0.0, 0.0, 0.1]).unwrap();
        let high = forest.predict_one(&[11.0, 110.0, 5.5, 0.1]).unwrap();
        assert!(low < 2.0, "low={low}");
        assert!(high > 4.0, "high={high}");
    }

    #[test]
    fn test_forest_is_deterministic() {
        let (features, labels) = training_set();
        let mut a = RandomForestRegressor::default();
        let mut b = RandomForestRegressor::default();
        a.fit(&features, &labels).unwrap();
        b.fit(&features, &labels).unwrap();

        let x = [5.5, 55.0, 2.75, 0.1];
        assert_eq!(
            a.predict_one(&x).unwrap().to_bits(),
            b.predict_one(&x).unwrap().to_bits()
        );
    }

    #[test]
    fn test_forest_predictions_stay_in_label_range() {
        let (features, labels) = training_set();
        let mut forest = RandomForestRegressor::default();
        forest.fit(&features, &labels).unwrap();
        for x in [[-100.0, 0.0, 0.0, 0.0], [1e6, 1e6, 1e6, 1e6]] {
            let y = forest.predict_one(&x).unwrap();
            assert!((1.0..=5.0).contains(&y));
        }
    }

    #[test]
    fn test_forest_predict_before_fit() {
        let forest = RandomForestRegressor::default();
        assert!(matches!(forest.predict_one(&[0.0; 4]), Err(Error::Training(_))));
    }

    #[test]
    fn test_forest_rejects_constant_features() {
        let mut forest = RandomForestRegressor::default();
        let err = forest
            .fit(&[[1.0; 4], [1.0; 4], [1.0; 4]], &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(format!("{err}").contains("degenerate"));
    }

    #[test]
    fn test_forest_rejects_nan_and_mismatch() {
        let mut forest = RandomForestRegressor::default();
        assert!(forest
            .fit(&[[f64::NAN, 0.0, 0.0, 0.0], [1.0; 4]], &[1.0, 2.0])
            .is_err());
        assert!(forest.fit(&[[0.0; 4], [1.0; 4]], &[1.0]).is_err());
        assert!(forest.fit(&[], &[]).is_err());
    }

    #[test]
    fn test_forest_without_bootstrap_interpolates_training_rows() {
        let (features, labels) = training_set();
        let config = ForestConfig {
            n_trees: 5,
            bootstrap: false,
            ..ForestConfig::default()
        };
        let mut forest = RandomForestRegressor::new(config).unwrap();
        forest.fit(&features, &labels).unwrap();
        for (x, y) in features.iter().zip(&labels) {
            assert!((forest.predict_one(x).unwrap() - y).abs() < 1e-12);
        }
    }
}
