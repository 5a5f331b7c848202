//! Experiment Result - gains tried on the bench and the response they produced

use crate::analysis::{StepMetrics, METRIC_COUNT};
use crate::input::parse_scalar;
use crate::Result;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One PID gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gain {
    /// Proportional gain
    Kp,
    /// Integral gain
    Ki,
    /// Derivative gain
    Kd,
}

impl Gain {
    /// All gains in `(kp, ki, kd)` order
    pub const ALL: [Self; 3] = [Self::Kp, Self::Ki, Self::Kd];

    /// Short label (`Kp`, `Ki`, `Kd`)
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kp => "Kp",
            Self::Ki => "Ki",
            Self::Kd => "Kd",
        }
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// PID gain triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
}

impl Gains {
    /// Create a gain triple
    #[must_use]
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// Parse operator text fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Input`] naming the first blank or non-numeric gain
    pub fn parse(kp: &str, ki: &str, kd: &str) -> Result<Self> {
        Ok(Self {
            kp: parse_scalar("Kp", kp)?,
            ki: parse_scalar("Ki", ki)?,
            kd: parse_scalar("Kd", kd)?,
        })
    }

    /// Value of one gain
    #[must_use]
    pub const fn get(&self, gain: Gain) -> f64 {
        match gain {
            Gain::Kp => self.kp,
            Gain::Ki => self.ki,
            Gain::Kd => self.kd,
        }
    }
}

/// Experiment Result represents one analyzed step response.
///
/// Gains are what the operator ran the controller with; metrics are what the
/// analyzer measured. Records are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentResult {
    setpoint: f64,
    #[serde(flatten)]
    gains: Gains,
    #[serde(flatten)]
    metrics: StepMetrics,
    recorded_at: DateTime<Utc>,
}

impl ExperimentResult {
    /// Create a new experiment result stamped with the current time.
    ///
    /// Timestamps are kept at microsecond precision, the resolution of the
    /// experiment table.
    ///
    /// # Arguments
    ///
    /// * `setpoint` - Target value of the experiment
    /// * `gains` - Gains the controller ran with
    /// * `metrics` - Measured response metrics
    #[must_use]
    pub fn new(setpoint: f64, gains: Gains, metrics: StepMetrics) -> Self {
        Self {
            setpoint,
            gains,
            metrics,
            recorded_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Create a builder for constructing a result with optional fields.
    #[must_use]
    pub fn builder(setpoint: f64, gains: Gains, metrics: StepMetrics) -> ExperimentResultBuilder {
        ExperimentResultBuilder::new(setpoint, gains, metrics)
    }

    /// Get the setpoint.
    #[must_use]
    pub const fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Get the gain triple.
    #[must_use]
    pub const fn gains(&self) -> Gains {
        self.gains
    }

    /// Get the proportional gain.
    #[must_use]
    pub const fn kp(&self) -> f64 {
        self.gains.kp
    }

    /// Get the integral gain.
    #[must_use]
    pub const fn ki(&self) -> f64 {
        self.gains.ki
    }

    /// Get the derivative gain.
    #[must_use]
    pub const fn kd(&self) -> f64 {
        self.gains.kd
    }

    /// Get the measured metrics.
    #[must_use]
    pub const fn metrics(&self) -> StepMetrics {
        self.metrics
    }

    /// Get the estimator feature vector.
    #[must_use]
    pub const fn features(&self) -> [f64; METRIC_COUNT] {
        self.metrics.features()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Builder for `ExperimentResult`.
#[derive(Debug)]
pub struct ExperimentResultBuilder {
    setpoint: f64,
    gains: Gains,
    metrics: StepMetrics,
    recorded_at: DateTime<Utc>,
}

impl ExperimentResultBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(setpoint: f64, gains: Gains, metrics: StepMetrics) -> Self {
        Self {
            setpoint,
            gains,
            metrics,
            recorded_at: Utc::now(),
        }
    }

    /// Set a custom timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    /// Build the `ExperimentResult`.
    #[must_use]
    pub fn build(self) -> ExperimentResult {
        ExperimentResult {
            setpoint: self.setpoint,
            gains: self.gains,
            metrics: self.metrics,
            recorded_at: self.recorded_at.trunc_subsecs(6),
        }
    }
}
