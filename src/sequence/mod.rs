//! Sequence numbers for naming exported artifacts
//!
//! Exports are named `Data_monitor{n}` with `n` drawn from a
//! [`SequenceGenerator`]. The in-memory generator suits tests and one-shot
//! sessions; [`FileSequence`] keeps the counter in a small text file so
//! numbering continues across runs.
//!
//! # Example
//!
//! ```rust
//! use pid_analyzer::sequence::{MemorySequence, SequenceGenerator};
//!
//! let mut seq = MemorySequence::new();
//! assert_eq!(seq.next()?, 1);
//! assert_eq!(seq.next()?, 2);
//! # Ok::<(), pid_analyzer::Error>(())
//! ```

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Source of strictly increasing sequence numbers.
pub trait SequenceGenerator {
    /// Return the next number; every call returns a larger value than the last.
    ///
    /// # Errors
    ///
    /// Returns error if a durable backend cannot be read or updated
    fn next(&mut self) -> Result<u64>;
}

impl<S: SequenceGenerator + ?Sized> SequenceGenerator for Box<S> {
    fn next(&mut self) -> Result<u64> {
        (**self).next()
    }
}

/// In-memory counter starting at 1. Lost on process exit.
#[derive(Debug, Clone)]
pub struct MemorySequence {
    next: u64,
}

impl MemorySequence {
    /// Counter whose first value is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Counter whose first value is `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for MemorySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator for MemorySequence {
    fn next(&mut self) -> Result<u64> {
        let value = self.next;
        self.next = value
            .checked_add(1)
            .ok_or_else(|| Error::Storage("sequence counter overflow".to_string()))?;
        Ok(value)
    }
}

/// Counter persisted as a decimal number in a text file.
///
/// The file holds the value the *next* call returns. A missing file starts
/// the sequence at 1.
#[derive(Debug, Clone)]
pub struct FileSequence {
    path: PathBuf,
}

impl FileSequence {
    /// Counter backed by `path` (created on first use).
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_current(&self) -> Result<u64> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => text.trim().parse().map_err(|e| {
                Error::Storage(format!(
                    "counter file {} is corrupt ({:?}): {e}",
                    self.path.display(),
                    text.trim()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(1),
            Err(e) => Err(e.into()),
        }
    }
}

impl SequenceGenerator for FileSequence {
    fn next(&mut self) -> Result<u64> {
        let value = self.read_current()?;
        let following = value
            .checked_add(1)
            .ok_or_else(|| Error::Storage("sequence counter overflow".to_string()))?;
        std::fs::write(&self.path, following.to_string())?;
        tracing::debug!(path = %self.path.display(), value, "advanced file sequence");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sequence_increments() {
        let mut seq = MemorySequence::new();
        let values: Vec<u64> = (0..3).map(|_| seq.next().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_sequence_overflow() {
        let mut seq = MemorySequence::starting_at(u64::MAX);
        assert!(seq.next().is_err());
    }

    #[test]
    fn test_file_sequence_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log_counter.txt");

        let mut first = FileSequence::new(&path);
        assert_eq!(first.next().unwrap(), 1);
        assert_eq!(first.next().unwrap(), 2);

        let mut second = FileSequence::new(&path);
        assert_eq!(second.next().unwrap(), 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "4");
    }

    #[test]
    fn test_file_sequence_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log_counter.txt");
        std::fs::write(&path, "twelve").unwrap();
        assert!(matches!(FileSequence::new(&path).next(), Err(Error::Storage(_))));
    }

    #[test]
    fn test_boxed_generator() {
        let mut seq: Box<dyn SequenceGenerator> = Box::new(MemorySequence::starting_at(10));
        assert_eq!(seq.next().unwrap(), 10);
    }
}
