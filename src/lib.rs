//! # pid-analyzer: Step-Response Analysis and PID Gain Recommendation
//!
//! Turns heater/fan controller logs into tuning advice:
//!
//! ```text
//! log text ──► LogSampleExtractor ──► Sample series
//!                                        │
//!                                        ▼
//!                             StepResponseAnalyzer ──► StepMetrics
//!                                                         │  + operator gains
//!                                                         ▼
//!                                             ExperimentDataset (append)
//!                                                         │  ≥ 3 records
//!                                                         ▼
//!                                              GainEstimator ──► (Kp, Ki, Kd)
//! ```
//!
//! Every stage runs synchronously on the calling thread. The estimator keeps
//! no state between calls: each recommendation retrains from scratch.
//!
//! ## Example Usage
//!
//! ```rust
//! use pid_analyzer::experiment::Gains;
//! use pid_analyzer::extract::OperatingMode;
//! use pid_analyzer::TuningSession;
//!
//! let mut session = TuningSession::builder().build()?;
//!
//! let log: String = (0..20)
//!     .map(|i| {
//!         let input = 37.0 * (1.0 - 0.7_f64.powi(i));
//!         format!("[Air Mode] {{heater: 100, fan: 1, input: {input:.2}, error: {:.2}}}\n", 37.0 - input)
//!     })
//!     .collect();
//!
//! let extraction = session.extract(&log, OperatingMode::AirTemp, 37.0)?;
//! let result = session.record(extraction.samples(), Gains::new(2.0, 0.1, 0.5))?;
//! assert!(result.metrics().rise_time > 0.0);
//! assert_eq!(session.dataset().len(), 1);
//! # Ok::<(), pid_analyzer::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod estimator;
pub mod experiment;
pub mod extract;
pub mod input;
pub mod sequence;
pub mod storage;

pub use error::{Error, Result, Stage};

use analysis::StepResponseAnalyzer;
use config::{AnalyzerConfig, ForestConfig, TunerConfig};
use estimator::{GainEstimator, GainRecommendation};
use experiment::{ExperimentDataset, ExperimentResult, Gains};
use extract::{Extraction, LogSampleExtractor, OperatingMode, Sample};
use sequence::{MemorySequence, SequenceGenerator};
use std::fmt;
use std::path::{Path, PathBuf};

/// One operator's tuning session: the analysis pipeline plus its dataset.
///
/// Not internally synchronized. Run one operation at a time; move the
/// session to a worker thread if the caller must stay responsive while
/// the estimator trains.
pub struct TuningSession {
    config: TunerConfig,
    analyzer: StepResponseAnalyzer,
    estimator: GainEstimator,
    dataset: ExperimentDataset,
    sequence: Box<dyn SequenceGenerator + Send>,
}

impl fmt::Debug for TuningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TuningSession")
            .field("config", &self.config)
            .field("records", &self.dataset.len())
            .finish_non_exhaustive()
    }
}

impl TuningSession {
    /// Create a new session builder
    #[must_use]
    pub fn builder() -> TuningSessionBuilder {
        TuningSessionBuilder::default()
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Accumulated experiment records
    #[must_use]
    pub const fn dataset(&self) -> &ExperimentDataset {
        &self.dataset
    }

    /// Mutable access to the records, e.g. to load a saved table
    pub fn dataset_mut(&mut self) -> &mut ExperimentDataset {
        &mut self.dataset
    }

    /// Scan a log for `mode` telemetry, stamping `setpoint` on every sample.
    ///
    /// # Errors
    ///
    /// - [`Error::Input`] for a non-finite setpoint
    /// - [`Error::Extraction`] when no line matches
    #[tracing::instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn extract(&self, text: &str, mode: OperatingMode, setpoint: f64) -> Result<Extraction> {
        LogSampleExtractor::new(mode, setpoint)?.extract(text)
    }

    /// Write samples to `dir` as the next numbered `Data_monitor{n}.parquet`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory, counter or table cannot be written
    #[tracing::instrument(skip(self, samples), fields(samples = samples.len()))]
    pub fn export_samples(&mut self, dir: &Path, samples: &[Sample]) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let index = self.sequence.next()?;
        let path = dir.join(storage::sample_file_name(index));
        storage::write_samples_parquet(&path, samples)?;
        tracing::info!(path = %path.display(), "exported samples");
        Ok(path)
    }

    /// Analyze one experiment without touching the dataset.
    ///
    /// # Errors
    ///
    /// Propagates analyzer errors (empty or mixed-setpoint series, invalid
    /// setpoint, too few samples for the steady-state window)
    pub fn analyze(&self, samples: &[Sample], gains: Gains) -> Result<ExperimentResult> {
        let metrics = self.analyzer.analyze_samples(samples)?;
        Ok(ExperimentResult::new(samples[0].setpoint, gains, metrics))
    }

    /// Analyze one experiment and append it to the dataset.
    ///
    /// The dataset changes only if the analysis succeeds in full.
    ///
    /// # Errors
    ///
    /// As [`Self::analyze`]
    #[tracing::instrument(skip(self, samples), fields(samples = samples.len()))]
    pub fn record(&mut self, samples: &[Sample], gains: Gains) -> Result<ExperimentResult> {
        let result = self.analyze(samples, gains)?;
        Ok(self.push(result))
    }

    /// Analyze a bare measured series and append it to the dataset.
    ///
    /// # Errors
    ///
    /// Propagates analyzer errors
    pub fn record_series(
        &mut self,
        series: &[f64],
        setpoint: f64,
        gains: Gains,
    ) -> Result<ExperimentResult> {
        let metrics = self.analyzer.analyze(series, setpoint)?;
        Ok(self.push(ExperimentResult::new(setpoint, gains, metrics)))
    }

    /// Remove the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if `index` is out of range
    pub fn remove_at(&mut self, index: usize) -> Result<ExperimentResult> {
        self.dataset.remove_at(index)
    }

    /// Retrain on the current dataset and recommend gains.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] with fewer than three records
    /// - [`Error::Training`] if a model cannot be fit
    #[tracing::instrument(skip(self), fields(records = self.dataset.len()))]
    pub fn recommend(&self) -> Result<GainRecommendation> {
        self.estimator.recommend(self.dataset.snapshot())
    }

    fn push(&mut self, result: ExperimentResult) -> ExperimentResult {
        self.dataset.append(result.clone());
        result
    }
}

/// Session builder
#[derive(Default)]
pub struct TuningSessionBuilder {
    config: TunerConfig,
    sequence: Option<Box<dyn SequenceGenerator + Send>>,
}

impl TuningSessionBuilder {
    /// Replace the whole configuration
    #[must_use]
    pub const fn config(mut self, config: TunerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set step-response analysis parameters
    #[must_use]
    pub const fn analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.config.analyzer = analyzer;
        self
    }

    /// Set estimator parameters
    #[must_use]
    pub const fn forest(mut self, forest: ForestConfig) -> Self {
        self.config.forest = forest;
        self
    }

    /// Set the sequence generator used to name exports (default: in-memory from 1)
    #[must_use]
    pub fn sequence<S: SequenceGenerator + Send + 'static>(mut self, sequence: S) -> Self {
        self.sequence = Some(Box::new(sequence));
        self
    }

    /// Build the session
    ///
    /// # Errors
    ///
    /// Returns error if the configuration fails validation
    pub fn build(self) -> Result<TuningSession> {
        self.config.validate()?;
        Ok(TuningSession {
            analyzer: StepResponseAnalyzer::new(self.config.analyzer)?,
            estimator: GainEstimator::new(self.config.forest)?,
            config: self.config,
            dataset: ExperimentDataset::new(),
            sequence: self
                .sequence
                .unwrap_or_else(|| Box::new(MemorySequence::new())),
        })
    }
}
