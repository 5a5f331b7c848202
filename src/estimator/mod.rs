//! Data-driven gain recommendation
//!
//! Learns the association between response metrics and the gains that
//! produced them, then asks "which gains go with the dataset's average
//! response?".
//!
//! Three independent [`Regressor`]s are fit, one per gain, each on the
//! feature rows `[rise_time, settling_time, overshoot, steady_state_error]`
//! of every record. Each model is then evaluated at the column-wise mean of
//! those rows.
//!
//! ## Limitations
//!
//! - The three models know nothing of each other: the recommended triple is
//!   not checked for closed-loop stability, and gains are not forced positive.
//!   The estimator reproduces the statistical association in the data, nothing
//!   more.
//! - The recommendation targets the dataset's mean operating point. It is not
//!   specific to a setpoint, a mode, or a single record.
//! - Every call retrains from scratch; no model state survives between calls.

mod forest;
mod tree;

pub use forest::RandomForestRegressor;

use crate::analysis::METRIC_COUNT;
use crate::config::ForestConfig;
use crate::error::Stage;
use crate::experiment::{feature_rows, label_column, ExperimentResult, Gain, Gains};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of records the estimator trains on
pub const MIN_TRAINING_RECORDS: usize = 3;

/// Metric feature row: `[rise_time, settling_time, overshoot, steady_state_error]`
pub type FeatureVector = [f64; METRIC_COUNT];

/// Regression capability the estimator is built on.
///
/// Any model satisfying this contract can stand in for the forest, e.g. a
/// fixed-output stub in tests.
pub trait Regressor {
    /// Fit the model to `features` → `labels`, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// Returns error if the model cannot be fit to the data
    fn fit(&mut self, features: &[FeatureVector], labels: &[f64]) -> Result<()>;

    /// Predict the label of one feature row.
    ///
    /// # Errors
    ///
    /// Returns error if the model is unfitted or the input is unusable
    fn predict_one(&self, features: &FeatureVector) -> Result<f64>;
}

/// Recommended gains for the dataset's mean response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainRecommendation {
    /// Recommended proportional gain
    pub kp: f64,
    /// Recommended integral gain
    pub ki: f64,
    /// Recommended derivative gain
    pub kd: f64,
    /// Column-wise mean of the training features the models were evaluated at
    pub mean_features: FeatureVector,
    /// Number of records trained on
    pub records_used: usize,
}

impl GainRecommendation {
    /// Recommended gains as a triple
    #[must_use]
    pub const fn gains(&self) -> Gains {
        Gains::new(self.kp, self.ki, self.kd)
    }
}

/// `Kp: 1.234` / `Ki: ...` / `Kd: ...`, one per line, three decimals.
impl fmt::Display for GainRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kp: {:.3}", self.kp)?;
        writeln!(f, "Ki: {:.3}", self.ki)?;
        writeln!(f, "Kd: {:.3}", self.kd)
    }
}

/// Trains one regressor per gain and predicts at the mean metric vector.
///
/// # Example
///
/// ```rust
/// use pid_analyzer::analysis::StepMetrics;
/// use pid_analyzer::config::ForestConfig;
/// use pid_analyzer::estimator::GainEstimator;
/// use pid_analyzer::experiment::{ExperimentResult, Gains};
///
/// let record = |kp: f64, rise: f64| {
///     let metrics = StepMetrics {
///         rise_time: rise,
///         settling_time: 4.0 * rise,
///         overshoot: kp * 3.0,
///         steady_state_error: 0.1,
///     };
///     ExperimentResult::new(37.0, Gains::new(kp, 0.1, 0.5), metrics)
/// };
/// let records = vec![record(1.0, 30.0), record(2.0, 20.0), record(3.0, 10.0)];
///
/// let recommendation = GainEstimator::new(ForestConfig::default())?.recommend(&records)?;
/// assert!(recommendation.kp.is_finite());
/// assert_eq!(recommendation.records_used, 3);
/// # Ok::<(), pid_analyzer::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct GainEstimator<R = RandomForestRegressor> {
    prototype: R,
}

impl Default for GainEstimator<RandomForestRegressor> {
    fn default() -> Self {
        Self {
            prototype: RandomForestRegressor::default(),
        }
    }
}

impl GainEstimator<RandomForestRegressor> {
    /// Estimator backed by a random forest with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the forest configuration is invalid
    pub fn new(config: ForestConfig) -> Result<Self> {
        Ok(Self {
            prototype: RandomForestRegressor::new(config)?,
        })
    }
}

impl<R: Regressor + Clone> GainEstimator<R> {
    /// Estimator backed by clones of `prototype` (one fresh clone per gain and call).
    #[must_use]
    pub const fn with_regressor(prototype: R) -> Self {
        Self { prototype }
    }

    /// Train on `records` and recommend gains for their mean metrics.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] with fewer than [`MIN_TRAINING_RECORDS`] records
    /// - [`Error::Training`] if any model fails to fit or predict, or predicts a
    ///   non-finite gain
    pub fn recommend(&self, records: &[ExperimentResult]) -> Result<GainRecommendation> {
        if records.len() < MIN_TRAINING_RECORDS {
            return Err(Error::insufficient(
                Stage::Training,
                "training gain estimator",
                MIN_TRAINING_RECORDS,
                records.len(),
            ));
        }

        let features = feature_rows(records);
        let mean = column_means(&features);

        let mut predicted = [0.0; 3];
        for (slot, gain) in predicted.iter_mut().zip(Gain::ALL) {
            *slot = self.fit_predict(&features, &label_column(records, gain), &mean, gain)?;
        }
        let [kp, ki, kd] = predicted;

        tracing::info!(
            records = records.len(),
            kp,
            ki,
            kd,
            "recommended gains"
        );

        Ok(GainRecommendation {
            kp,
            ki,
            kd,
            mean_features: mean,
            records_used: records.len(),
        })
    }

    fn fit_predict(
        &self,
        features: &[FeatureVector],
        labels: &[f64],
        at: &FeatureVector,
        gain: Gain,
    ) -> Result<f64> {
        let wrap = |e: Error| match e {
            Error::Training(msg) => Error::Training(format!("{gain} model: {msg}")),
            other => Error::Training(format!("{gain} model: {other}")),
        };

        let mut model = self.prototype.clone();
        model.fit(features, labels).map_err(wrap)?;
        let value = model.predict_one(at).map_err(wrap)?;
        if !value.is_finite() {
            return Err(Error::Training(format!(
                "{gain} model predicted a non-finite value ({value})"
            )));
        }
        Ok(value)
    }
}

#[allow(clippy::cast_precision_loss)]
fn column_means(rows: &[FeatureVector]) -> FeatureVector {
    let mut mean = [0.0; METRIC_COUNT];
    for row in rows {
        for (acc, value) in mean.iter_mut().zip(row) {
            *acc += value;
        }
    }
    for acc in &mut mean {
        *acc /= rows.len() as f64;
    }
    mean
}
