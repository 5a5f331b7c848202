//! Analyzer and estimator configuration
//!
//! Every field has a default matching the bench tool's historical behavior,
//! so an empty JSON object (`{}`) is a valid configuration file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Step-response analysis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Time units elapsed between two consecutive samples
    pub sampling_interval: f64,
    /// Lower rise-time threshold as a fraction of setpoint
    pub rise_low_fraction: f64,
    /// Upper rise-time threshold as a fraction of setpoint
    pub rise_high_fraction: f64,
    /// Settling tolerance band as a fraction of setpoint
    pub settling_band_fraction: f64,
    /// Tail of the series (by sample count, rounded down) averaged for steady-state error
    pub steady_state_fraction: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sampling_interval: 5.0,
            rise_low_fraction: 0.10,
            rise_high_fraction: 0.90,
            settling_band_fraction: 0.05,
            steady_state_fraction: 0.10,
        }
    }
}

impl AnalyzerConfig {
    /// Replace the sampling interval
    #[must_use]
    pub const fn with_sampling_interval(mut self, sampling_interval: f64) -> Self {
        self.sampling_interval = sampling_interval;
        self
    }

    /// Replace the steady-state window fraction
    #[must_use]
    pub const fn with_steady_state_fraction(mut self, fraction: f64) -> Self {
        self.steady_state_fraction = fraction;
        self
    }

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for a non-positive sampling interval and
    /// [`Error::Config`] for fractions outside `(0, 1]` or inverted rise thresholds.
    pub fn validate(&self) -> Result<()> {
        if !self.sampling_interval.is_finite() || self.sampling_interval <= 0.0 {
            return Err(Error::Input(format!(
                "sampling interval must be a positive number, got {}",
                self.sampling_interval
            )));
        }
        for (name, value) in [
            ("rise_low_fraction", self.rise_low_fraction),
            ("rise_high_fraction", self.rise_high_fraction),
            ("settling_band_fraction", self.settling_band_fraction),
            ("steady_state_fraction", self.steady_state_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Config(format!("{name} must be in (0, 1], got {value}")));
            }
        }
        if self.rise_low_fraction >= self.rise_high_fraction {
            return Err(Error::Config(format!(
                "rise_low_fraction ({}) must be below rise_high_fraction ({})",
                self.rise_low_fraction, self.rise_high_fraction
            )));
        }
        Ok(())
    }
}

/// Random forest hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth (`None` grows until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Minimum samples each child of a split must keep
    pub min_samples_leaf: usize,
    /// Draw a bootstrap resample per tree
    pub bootstrap: bool,
    /// RNG seed; identical seeds yield identical forests
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Check hyper-parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a count is zero or the split minimum is below 2.
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::Config("n_trees must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(Error::Config(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::Config("min_samples_leaf must be at least 1".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("max_depth must be at least 1 when set".to_string()));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Metric computation parameters
    pub analyzer: AnalyzerConfig,
    /// Estimator parameters
    pub forest: ForestConfig,
}

impl TunerConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not valid JSON or any value fails validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate().map_err(|e| match e {
            Error::Input(msg) | Error::Config(msg) => {
                Error::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        Ok(config)
    }

    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// Propagates the first section error
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        self.forest.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.analyzer.sampling_interval - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.forest.n_trees, 100);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TunerConfig =
            serde_json::from_str(r#"{"analyzer": {"sampling_interval": 2.5}}"#).unwrap();
        assert!((config.analyzer.sampling_interval - 2.5).abs() < f64::EPSILON);
        assert!((config.analyzer.steady_state_fraction - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.forest, ForestConfig::default());
    }

    #[test]
    fn test_non_positive_interval_is_input_error() {
        let config = AnalyzerConfig::default().with_sampling_interval(0.0);
        assert!(matches!(config.validate(), Err(Error::Input(_))));
    }

    #[test]
    fn test_bad_interval_in_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        std::fs::write(&path, r#"{"analyzer": {"sampling_interval": 0}}"#).unwrap();

        let err = TunerConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("sampling interval")));
        assert_eq!(err.stage(), crate::Stage::Config);
    }

    #[test]
    fn test_inverted_rise_thresholds_rejected() {
        let config = AnalyzerConfig {
            rise_low_fraction: 0.9,
            rise_high_fraction: 0.1,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_forest_zero_trees_rejected() {
        let config = ForestConfig {
            n_trees: 0,
            ..ForestConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
