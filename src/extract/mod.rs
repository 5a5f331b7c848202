//! Log sample extraction
//!
//! Controller logs interleave loop telemetry with unrelated lines. Each
//! [`OperatingMode`] tags its telemetry lines differently:
//!
//! ```text
//! [Air Mode] {heater: 120, fan: 1, input: 35.20, error: 1.80}
//! [Baby Mode] {heater: 64, fan: 0, input: 36.90, error: 0.10}
//! [Humidity Mode] {heater: 0, fan: 1, input: 61.00, error: -1.00}
//! ```
//!
//! Lines that do not carry the selected mode's tag are skipped. Scanning the
//! whole text without a single match is an error: it means the log and the
//! selected mode do not belong together.
//!
//! ## Example
//!
//! ```rust
//! use pid_analyzer::extract::{LogSampleExtractor, OperatingMode};
//!
//! let log = "boot ok\n[Baby Mode] {heater: 64, fan: 0, input: 36.90, error: 0.10}\n";
//! let extraction = LogSampleExtractor::new(OperatingMode::Baby, 37.0)?.extract(log)?;
//! assert_eq!(extraction.samples().len(), 1);
//! assert_eq!(extraction.lines_scanned(), 2);
//! # Ok::<(), pid_analyzer::Error>(())
//! ```

mod line;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Controller operating mode; selects the log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingMode {
    /// Air temperature regulation
    #[serde(rename = "Air Temp")]
    AirTemp,
    /// Infant (skin) temperature regulation
    #[serde(rename = "Baby")]
    Baby,
    /// Relative humidity regulation
    #[serde(rename = "Humidity")]
    Humidity,
}

impl OperatingMode {
    /// All modes, in menu order
    pub const ALL: [Self; 3] = [Self::AirTemp, Self::Baby, Self::Humidity];

    /// Operator-facing name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AirTemp => "Air Temp",
            Self::Baby => "Baby",
            Self::Humidity => "Humidity",
        }
    }

    /// Literal that opens a telemetry block for this mode
    #[must_use]
    pub const fn line_tag(self) -> &'static str {
        match self {
            Self::AirTemp => "[Air Mode] {heater: ",
            Self::Baby => "[Baby Mode] {heater: ",
            Self::Humidity => "[Humidity Mode] {heater: ",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for OperatingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(Error::Input("mode is required".to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.display_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::Input(format!(
                    "unknown mode {name:?}; expected one of \"Air Temp\", \"Baby\", \"Humidity\""
                ))
            })
    }
}

/// One observed instant of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Target value, constant across one extraction run
    pub setpoint: f64,
    /// Heater drive level
    pub heater_output: i64,
    /// Measured process value
    pub input_value: f64,
    /// Controller error as logged
    pub error: f64,
}

/// Result of scanning one log.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    mode: OperatingMode,
    samples: Vec<Sample>,
    lines_scanned: usize,
}

impl Extraction {
    /// Mode the log was scanned with
    #[must_use]
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Extracted samples in log order
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of physical lines inspected
    #[must_use]
    pub const fn lines_scanned(&self) -> usize {
        self.lines_scanned
    }

    /// Measured values in log order
    #[must_use]
    pub fn input_series(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.input_value).collect()
    }

    /// Consume into the sample vector
    #[must_use]
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// Turns raw log text into [`Sample`]s for one mode and setpoint.
#[derive(Debug, Clone, Copy)]
pub struct LogSampleExtractor {
    mode: OperatingMode,
    setpoint: f64,
}

impl LogSampleExtractor {
    /// Create an extractor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] if `setpoint` is not finite
    pub fn new(mode: OperatingMode, setpoint: f64) -> Result<Self> {
        if !setpoint.is_finite() {
            return Err(Error::Input(format!("setpoint must be finite, got {setpoint}")));
        }
        Ok(Self { mode, setpoint })
    }

    /// Create an extractor from operator text fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when the mode or setpoint is blank or unparseable
    pub fn from_input(mode: &str, setpoint: &str) -> Result<Self> {
        let mode = mode.parse()?;
        let setpoint = crate::input::parse_scalar("setpoint", setpoint)?;
        Self::new(mode, setpoint)
    }

    /// Selected mode
    #[must_use]
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Setpoint stamped on every sample
    #[must_use]
    pub const fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Scan `text` line by line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] when no line matches the mode's format
    pub fn extract(&self, text: &str) -> Result<Extraction> {
        let tag = self.mode.line_tag();
        let mut lines_scanned = 0;
        let mut samples = Vec::new();

        for line in text.lines() {
            lines_scanned += 1;
            if let Some(fields) = line::scan(line, tag) {
                samples.push(Sample {
                    setpoint: self.setpoint,
                    heater_output: fields.heater,
                    input_value: fields.input,
                    error: fields.error,
                });
            }
        }

        tracing::debug!(
            mode = %self.mode,
            lines_scanned,
            matched = samples.len(),
            "scanned controller log"
        );

        if samples.is_empty() {
            return Err(Error::Extraction {
                mode: self.mode.display_name().to_string(),
                lines_scanned,
            });
        }

        Ok(Extraction {
            mode: self.mode,
            samples,
            lines_scanned,
        })
    }

    /// Read a log file in full and scan it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as [`Self::extract`]
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let bytes = std::fs::read(path.as_ref())?;
        // Serial consoles occasionally inject garbage bytes; keep the readable lines
        let text = String::from_utf8_lossy(&bytes);
        self.extract(&text)
    }
}
