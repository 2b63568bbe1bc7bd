//! Sequence numbers that survive restarts
//!
//! The LSA sequence file holds one decimal integer packing three 20-bit
//! counters:
//!
//! ```text
//!  59        40 39        20 19         0
//! +------------+------------+------------+
//! | adjacency  | coordinate |    name    |
//! +------------+------------+------------+
//! ```
//!
//! On restart every counter is bumped by `RESTART_BUMP` so neighbours always
//! see a strictly larger number than anything sent before.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SUB_COUNTER_BITS: u32 = 20;
pub const SUB_COUNTER_MAX: u64 = (1 << SUB_COUNTER_BITS) - 1;
pub const RESTART_BUMP: u64 = 10;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Unpack `(name, coordinate, adjacency)`.
pub fn split(combined: u64) -> (u64, u64, u64) {
    (
        combined & SUB_COUNTER_MAX,
        (combined >> SUB_COUNTER_BITS) & SUB_COUNTER_MAX,
        (combined >> (2 * SUB_COUNTER_BITS)) & SUB_COUNTER_MAX,
    )
}

pub fn combine(name: u64, coordinate: u64, adjacency: u64) -> u64 {
    (name & SUB_COUNTER_MAX)
        | ((coordinate & SUB_COUNTER_MAX) << SUB_COUNTER_BITS)
        | ((adjacency & SUB_COUNTER_MAX) << (2 * SUB_COUNTER_BITS))
}

fn read_decimal(path: &Path) -> Option<u64> {
    match fs::read_to_string(path) {
        Ok(text) => match text.trim().parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "sequence file unreadable");
                None
            }
        },
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no sequence file");
            None
        }
    }
}

fn write_decimal(path: &Path, value: u64) -> Result<(), SequenceError> {
    let persist_err = |source| SequenceError::Persist {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }
    fs::write(path, value.to_string()).map_err(persist_err)
}

/// Add with saturation at `SUB_COUNTER_MAX`.
fn bump(counter: &str, value: u64, by: u64) -> u64 {
    let next = value.saturating_add(by);
    if next > SUB_COUNTER_MAX {
        warn!(counter, value, "sequence counter saturated");
        return SUB_COUNTER_MAX;
    }
    next
}

/// LSA sequence numbers for name, coordinate and adjacency advertisements.
#[derive(Debug, Clone)]
pub struct SequencingManager {
    name_seq: u64,
    coordinate_seq: u64,
    adjacency_seq: u64,
    path: PathBuf,
}

impl SequencingManager {
    /// All counters at zero, persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name_seq: 0,
            coordinate_seq: 0,
            adjacency_seq: 0,
            path: path.into(),
        }
    }

    /// Resume from the file at `path`.
    ///
    /// A missing or unparsable file starts every counter at zero. Otherwise
    /// each counter is bumped by `RESTART_BUMP` and the result written back
    /// before returning.
    pub fn init_from_persisted(path: impl Into<PathBuf>) -> Result<Self, SequenceError> {
        let mut manager = Self::new(path);
        let Some(combined) = read_decimal(&manager.path) else {
            return Ok(manager);
        };

        let (name, coordinate, adjacency) = split(combined);
        manager.name_seq = bump("name", name, RESTART_BUMP);
        manager.coordinate_seq = bump("coordinate", coordinate, RESTART_BUMP);
        manager.adjacency_seq = bump("adjacency", adjacency, RESTART_BUMP);
        manager.persist()?;

        info!(
            name = manager.name_seq,
            coordinate = manager.coordinate_seq,
            adjacency = manager.adjacency_seq,
            "LSA sequence numbers resumed"
        );
        Ok(manager)
    }

    /// Overwrite the sequence file with the current combined value.
    pub fn persist(&self) -> Result<(), SequenceError> {
        write_decimal(&self.path, self.combined())
    }

    pub fn combined(&self) -> u64 {
        combine(self.name_seq, self.coordinate_seq, self.adjacency_seq)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name_seq(&self) -> u64 {
        self.name_seq
    }

    pub fn coordinate_seq(&self) -> u64 {
        self.coordinate_seq
    }

    pub fn adjacency_seq(&self) -> u64 {
        self.adjacency_seq
    }

    pub fn set_name_seq(&mut self, value: u64) {
        self.name_seq = bump("name", value, 0);
    }

    pub fn set_coordinate_seq(&mut self, value: u64) {
        self.coordinate_seq = bump("coordinate", value, 0);
    }

    pub fn set_adjacency_seq(&mut self, value: u64) {
        self.adjacency_seq = bump("adjacency", value, 0);
    }

    /// Returns the new value.
    pub fn increment_name_seq(&mut self) -> u64 {
        self.name_seq = bump("name", self.name_seq, 1);
        self.name_seq
    }

    pub fn increment_coordinate_seq(&mut self) -> u64 {
        self.coordinate_seq = bump("coordinate", self.coordinate_seq, 1);
        self.coordinate_seq
    }

    pub fn increment_adjacency_seq(&mut self) -> u64 {
        self.adjacency_seq = bump("adjacency", self.adjacency_seq, 1);
        self.adjacency_seq
    }
}

impl fmt::Display for SequencingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={} coordinate={} adjacency={} combined={}",
            self.name_seq,
            self.coordinate_seq,
            self.adjacency_seq,
            self.combined()
        )
    }
}

/// Sequence number of this router's own certificates.
#[derive(Debug, Clone)]
pub struct CertificateSequence {
    seq: u64,
    path: PathBuf,
}

impl CertificateSequence {
    /// One past the persisted value, or 1 without a readable file. Written
    /// back immediately.
    pub fn init_from_persisted(path: impl Into<PathBuf>) -> Result<Self, SequenceError> {
        let path = path.into();
        let seq = read_decimal(&path).map_or(1, |last| last.saturating_add(1));
        let sequence = Self { seq, path };
        sequence.persist()?;
        info!(seq, "certificate sequence number");
        Ok(sequence)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn persist(&self) -> Result<(), SequenceError> {
        write_decimal(&self.path, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_layout() {
        let combined = (3 << 40) | (2 << 20) | 1;
        assert_eq!(split(combined), (1, 2, 3));
        assert_eq!(combine(1, 2, 3), combined);
        assert_eq!(split(u64::MAX), (SUB_COUNTER_MAX, SUB_COUNTER_MAX, SUB_COUNTER_MAX));
    }

    #[test]
    fn test_missing_file_starts_at_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nlsrSeqNo.txt");

        let sm = SequencingManager::init_from_persisted(&path).unwrap();
        assert_eq!(sm.combined(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_file_starts_at_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nlsrSeqNo.txt");
        fs::write(&path, "not a number").unwrap();

        let sm = SequencingManager::init_from_persisted(&path).unwrap();
        assert_eq!((sm.name_seq(), sm.coordinate_seq(), sm.adjacency_seq()), (0, 0, 0));
    }

    #[test]
    fn test_restart_bump_is_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nlsrSeqNo.txt");
        fs::write(&path, combine(5, 6, 7).to_string()).unwrap();

        let sm = SequencingManager::init_from_persisted(&path).unwrap();
        assert_eq!((sm.name_seq(), sm.coordinate_seq(), sm.adjacency_seq()), (15, 16, 17));
        assert_eq!(fs::read_to_string(&path).unwrap(), combine(15, 16, 17).to_string());
    }

    #[test]
    fn test_increment_saturates() {
        let mut sm = SequencingManager::new("/unused");
        sm.set_name_seq(SUB_COUNTER_MAX - 1);
        assert_eq!(sm.increment_name_seq(), SUB_COUNTER_MAX);
        assert_eq!(sm.increment_name_seq(), SUB_COUNTER_MAX);
        // Saturation never bleeds into the neighbouring field
        assert_eq!(sm.coordinate_seq(), 0);

        sm.set_adjacency_seq(u64::MAX);
        assert_eq!(sm.adjacency_seq(), SUB_COUNTER_MAX);
    }

    #[test]
    fn test_restart_bump_saturates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nlsrSeqNo.txt");
        fs::write(&path, combine(SUB_COUNTER_MAX - 3, 0, 0).to_string()).unwrap();

        let sm = SequencingManager::init_from_persisted(&path).unwrap();
        assert_eq!(sm.name_seq(), SUB_COUNTER_MAX);
        assert_eq!(sm.coordinate_seq(), RESTART_BUMP);
    }

    #[test]
    fn test_certificate_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nlsrCertSeqNo.txt");

        assert_eq!(CertificateSequence::init_from_persisted(&path).unwrap().seq(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1");
        assert_eq!(CertificateSequence::init_from_persisted(&path).unwrap().seq(), 2);

        fs::write(&path, "41\n").unwrap();
        assert_eq!(CertificateSequence::init_from_persisted(&path).unwrap().seq(), 42);
    }

    #[test]
    fn test_display() {
        let mut sm = SequencingManager::new("/unused");
        sm.increment_coordinate_seq();
        assert_eq!(sm.to_string(), format!("name=0 coordinate=1 adjacency=0 combined={}", 1 << 20));
    }
}
