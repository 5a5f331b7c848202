//! Step-response metrics
//!
//! Computes the four time-domain figures of merit of one experiment from its
//! measured series, sampled at a fixed interval:
//!
//! | Metric | Definition |
//! |--------|------------|
//! | rise time | samples between the first 10% crossing and the next 90% crossing, times the interval |
//! | settling time | (last index outside the ±5% band + 1) times the interval |
//! | overshoot | peak excursion above setpoint, percent of setpoint |
//! | steady-state error | mean absolute deviation over the final 10% of samples |
//!
//! Thresholds and window sizes come from [`AnalyzerConfig`]. All computations
//! are pure: the same series, setpoint and configuration always give the same
//! [`StepMetrics`].

use crate::config::AnalyzerConfig;
use crate::error::Stage;
use crate::extract::Sample;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of metrics per experiment (estimator feature width)
pub const METRIC_COUNT: usize = 4;

/// Performance metrics of one step response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// 10%→90% rise time, 0 when either threshold is never reached
    pub rise_time: f64,
    /// Time until the response stays inside the tolerance band, 0 when it never leaves it
    pub settling_time: f64,
    /// Peak overshoot in percent of setpoint, 0 without overshoot
    pub overshoot: f64,
    /// Mean absolute deviation over the tail window
    pub steady_state_error: f64,
}

impl StepMetrics {
    /// Metrics in estimator feature order:
    /// `[rise_time, settling_time, overshoot, steady_state_error]`
    #[must_use]
    pub const fn features(&self) -> [f64; METRIC_COUNT] {
        [
            self.rise_time,
            self.settling_time,
            self.overshoot,
            self.steady_state_error,
        ]
    }
}

/// Computes [`StepMetrics`] for homogeneous (single-setpoint) series.
#[derive(Debug, Clone, Copy)]
pub struct StepResponseAnalyzer {
    config: AnalyzerConfig,
}

impl Default for StepResponseAnalyzer {
    fn default() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }
}

impl StepResponseAnalyzer {
    /// Create an analyzer.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration fails validation
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compute all four metrics.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSetpoint`] for a zero or non-finite setpoint
    /// - [`Error::InsufficientData`] when the series is too short for the
    ///   steady-state window
    pub fn analyze(&self, series: &[f64], setpoint: f64) -> Result<StepMetrics> {
        check_setpoint(setpoint)?;

        let metrics = StepMetrics {
            rise_time: self.rise_time(series, setpoint),
            settling_time: self.settling_time(series, setpoint),
            overshoot: self.overshoot(series, setpoint)?,
            steady_state_error: self.steady_state_error(series, setpoint)?,
        };

        tracing::debug!(
            samples = series.len(),
            setpoint,
            rise_time = metrics.rise_time,
            settling_time = metrics.settling_time,
            overshoot = metrics.overshoot,
            steady_state_error = metrics.steady_state_error,
            "computed step-response metrics"
        );

        Ok(metrics)
    }

    /// Compute metrics from extracted samples, taking the setpoint from them.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] when `samples` is empty
    /// - [`Error::Input`] when the samples carry different setpoints
    /// - otherwise as [`Self::analyze`]
    pub fn analyze_samples(&self, samples: &[Sample]) -> Result<StepMetrics> {
        let first = samples
            .first()
            .ok_or_else(|| Error::insufficient(Stage::Analysis, "step response", 1, 0))?;
        let setpoint = first.setpoint;

        if let Some(other) = samples.iter().find(|s| s.setpoint.to_bits() != setpoint.to_bits()) {
            return Err(Error::Input(format!(
                "series mixes setpoints {setpoint} and {}; analyze one setpoint at a time",
                other.setpoint
            )));
        }

        let series: Vec<f64> = samples.iter().map(|s| s.input_value).collect();
        self.analyze(&series, setpoint)
    }

    /// Time from the first sample at or above the low threshold to the first
    /// later (or same) sample at or above the high threshold.
    ///
    /// Returns 0 when either threshold is never reached.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rise_time(&self, series: &[f64], setpoint: f64) -> f64 {
        let low = self.config.rise_low_fraction * setpoint;
        let high = self.config.rise_high_fraction * setpoint;

        let mut start = None;
        for (i, &value) in series.iter().enumerate() {
            if start.is_none() && value >= low {
                start = Some(i);
            }
            if let Some(start) = start {
                if value >= high {
                    return (i - start) as f64 * self.config.sampling_interval;
                }
            }
        }
        0.0
    }

    /// `(last index outside the tolerance band + 1) * interval`.
    ///
    /// Returns 0 when no sample leaves the band.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn settling_time(&self, series: &[f64], setpoint: f64) -> f64 {
        let tolerance = self.config.settling_band_fraction * setpoint.abs();
        series
            .iter()
            .rposition(|&value| (value - setpoint).abs() > tolerance)
            .map_or(0.0, |i| (i + 1) as f64 * self.config.sampling_interval)
    }

    /// Peak excursion above setpoint as a percentage of setpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSetpoint`] for a zero or non-finite setpoint
    /// - [`Error::InsufficientData`] for an empty series
    pub fn overshoot(&self, series: &[f64], setpoint: f64) -> Result<f64> {
        check_setpoint(setpoint)?;
        let peak = series
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| Error::insufficient(Stage::Analysis, "overshoot", 1, 0))?;

        if peak > setpoint {
            Ok((peak - setpoint) / setpoint * 100.0)
        } else {
            Ok(0.0)
        }
    }

    /// Mean absolute deviation from setpoint over the last
    /// `floor(len * steady_state_fraction)` samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] when that window is empty
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn steady_state_error(&self, series: &[f64], setpoint: f64) -> Result<f64> {
        let fraction = self.config.steady_state_fraction;
        let window = (series.len() as f64 * fraction).floor() as usize;
        if window == 0 {
            let needed = (1.0 / fraction).ceil() as usize;
            return Err(Error::insufficient(
                Stage::Analysis,
                "steady-state error window",
                needed,
                series.len(),
            ));
        }

        let tail = &series[series.len() - window..];
        let total: f64 = tail.iter().map(|value| (value - setpoint).abs()).sum();
        Ok(total / window as f64)
    }
}

fn check_setpoint(setpoint: f64) -> Result<()> {
    if setpoint == 0.0 || !setpoint.is_finite() {
        return Err(Error::InvalidSetpoint(setpoint));
    }
    Ok(())
}
