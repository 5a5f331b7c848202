//! Experiment Dataset - ordered collection of analyzed experiments
//!
//! Records accumulate across tuning sessions and setpoints; the estimator
//! trains on whatever the dataset holds at the time of the call.

use super::{ExperimentResult, Gain};
use crate::analysis::METRIC_COUNT;
use crate::{Error, Result};

/// Insertion-ordered, append-only (except explicit removal) record list.
///
/// ## Design
///
/// Single writer, no internal synchronization. Removal by position shifts
/// later records down by one but never alters their contents.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExperimentDataset {
    records: Vec<ExperimentResult>,
}

impl ExperimentDataset {
    /// Create a new empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Add a record at the end. No deduplication.
    pub fn append(&mut self, result: ExperimentResult) {
        self.records.push(result);
        tracing::debug!(records = self.records.len(), "appended experiment result");
    }

    /// Remove and return the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if `index` is out of range
    pub fn remove_at(&mut self, index: usize) -> Result<ExperimentResult> {
        if index >= self.records.len() {
            return Err(Error::Index {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        tracing::debug!(index, records = self.records.len(), "removed experiment result");
        Ok(removed)
    }

    /// Remove several records, addressed by their positions before removal.
    ///
    /// Duplicate indices are removed once. Either every index is valid and
    /// all are removed, or nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] for the first out-of-range index
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<Vec<ExperimentResult>> {
        let len = self.records.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::Index { index, len });
        }

        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        // Back to front so earlier positions stay valid
        let mut removed: Vec<ExperimentResult> = sorted
            .iter()
            .rev()
            .map(|&i| self.records.remove(i))
            .collect();
        removed.reverse();
        Ok(removed)
    }

    /// Get a record by position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ExperimentResult> {
        self.records.get(index)
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExperimentResult> {
        self.records.iter()
    }

    /// Immutable ordered view for training.
    #[must_use]
    pub fn snapshot(&self) -> &[ExperimentResult] {
        &self.records
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Metric feature rows, one per record.
    #[must_use]
    pub fn features(&self) -> Vec<[f64; METRIC_COUNT]> {
        feature_rows(&self.records)
    }

    /// One gain column, one value per record.
    #[must_use]
    pub fn labels(&self, gain: Gain) -> Vec<f64> {
        label_column(&self.records, gain)
    }
}

impl From<Vec<ExperimentResult>> for ExperimentDataset {
    fn from(records: Vec<ExperimentResult>) -> Self {
        Self { records }
    }
}

impl Extend<ExperimentResult> for ExperimentDataset {
    fn extend<I: IntoIterator<Item = ExperimentResult>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ExperimentDataset {
    type Item = &'a ExperimentResult;
    type IntoIter = std::slice::Iter<'a, ExperimentResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Metric feature rows of `records`.
#[must_use]
pub fn feature_rows(records: &[ExperimentResult]) -> Vec<[f64; METRIC_COUNT]> {
    records.iter().map(ExperimentResult::features).collect()
}

/// One gain column of `records`.
#[must_use]
pub fn label_column(records: &[ExperimentResult], gain: Gain) -> Vec<f64> {
    records.iter().map(|r| r.gains().get(gain)).collect()
}
