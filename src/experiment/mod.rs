//! Experiment records and the training dataset
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentDataset (1) ──< ExperimentResult (N)
//!                              │
//!                              ├── setpoint
//!                              ├── Gains        [operator input: kp, ki, kd]
//!                              └── StepMetrics  [analyzer output]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pid_analyzer::analysis::StepMetrics;
//! use pid_analyzer::experiment::{ExperimentDataset, ExperimentResult, Gains};
//!
//! let metrics = StepMetrics {
//!     rise_time: 15.0,
//!     settling_time: 60.0,
//!     overshoot: 4.2,
//!     steady_state_error: 0.1,
//! };
//!
//! let mut dataset = ExperimentDataset::new();
//! dataset.append(ExperimentResult::new(37.0, Gains::new(2.0, 0.1, 0.5), metrics));
//! assert_eq!(dataset.len(), 1);
//!
//! dataset.remove_at(0)?;
//! assert!(dataset.is_empty());
//! # Ok::<(), pid_analyzer::Error>(())
//! ```

mod dataset;
mod result;

pub use dataset::{feature_rows, label_column, ExperimentDataset};
pub use result::{ExperimentResult, ExperimentResultBuilder, Gain, Gains};
