//! Logging collaborators
//!
//! The experiment core only needs three capabilities from its logger: a setup
//! hook, `log(record)`, and a `previously_logged` dedup check. Transport and
//! storage are entirely the collaborator's business.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::error::LogResult;

use super::record::{ExposureKey, ExposureRecord};

/// Destination for exposure and event records.
///
/// Methods take `&self` so one collaborator can be shared by many
/// independent experiment instances; implementations synchronize internally.
pub trait ExposureLogger {
    /// One-time setup, run when an experiment is constructed.
    fn configure(&self) -> LogResult<()> {
        Ok(())
    }

    /// Persist or forward one record.
    fn log(&self, record: &ExposureRecord) -> LogResult<()>;

    /// Whether this logical exposure was already logged elsewhere.
    fn previously_logged(&self, _key: &ExposureKey) -> LogResult<bool> {
        Ok(false)
    }
}

impl<L: ExposureLogger + ?Sized> ExposureLogger for &L {
    fn configure(&self) -> LogResult<()> {
        (**self).configure()
    }

    fn log(&self, record: &ExposureRecord) -> LogResult<()> {
        (**self).log(record)
    }

    fn previously_logged(&self, key: &ExposureKey) -> LogResult<bool> {
        (**self).previously_logged(key)
    }
}

impl<L: ExposureLogger + ?Sized> ExposureLogger for Arc<L> {
    fn configure(&self) -> LogResult<()> {
        (**self).configure()
    }

    fn log(&self, record: &ExposureRecord) -> LogResult<()> {
        (**self).log(record)
    }

    fn previously_logged(&self, key: &ExposureKey) -> LogResult<bool> {
        (**self).previously_logged(key)
    }
}

impl<L: ExposureLogger + ?Sized> ExposureLogger for Box<L> {
    fn configure(&self) -> LogResult<()> {
        (**self).configure()
    }

    fn log(&self, record: &ExposureRecord) -> LogResult<()> {
        (**self).log(record)
    }

    fn previously_logged(&self, key: &ExposureKey) -> LogResult<bool> {
        (**self).previously_logged(key)
    }
}

/// Logger that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl ExposureLogger for NullLogger {
    fn log(&self, _record: &ExposureRecord) -> LogResult<()> {
        Ok(())
    }
}

/// In-memory logger, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<ExposureRecord>>,
    seen: Mutex<HashSet<ExposureKey>>,
    dedup: bool,
}

impl MemoryLogger {
    /// Logger that records every exposure it receives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger that reports exposures it has already stored as previously logged.
    pub fn deduplicating() -> Self {
        Self {
            dedup: true,
            ..Self::default()
        }
    }

    /// Snapshot of stored records, oldest first.
    pub fn records(&self) -> Vec<ExposureRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all stored records and dedup state.
    pub fn clear(&self) {
        self.records.lock().clear();
        self.seen.lock().clear();
    }
}

impl ExposureLogger for MemoryLogger {
    fn log(&self, record: &ExposureRecord) -> LogResult<()> {
        if self.dedup && record.is_exposure() {
            self.seen.lock().insert(record.key()?);
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn previously_logged(&self, key: &ExposureKey) -> LogResult<bool> {
        Ok(self.dedup && self.seen.lock().contains(key))
    }
}

/// Appends one JSON record per line to a file.
///
/// Exposures written by this process are remembered and reported as
/// previously logged.
#[derive(Debug)]
pub struct JsonLinesLogger {
    path: PathBuf,
    file: Mutex<File>,
    seen: Mutex<HashSet<ExposureKey>>,
}

impl JsonLinesLogger {
    /// Open (or create) the log file in append mode.
    pub fn open(path: impl Into<PathBuf>) -> LogResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            seen: Mutex::new(HashSet::new()),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExposureLogger for JsonLinesLogger {
    fn log(&self, record: &ExposureRecord) -> LogResult<()> {
        let key = if record.is_exposure() {
            Some(record.key()?)
        } else {
            None
        };
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        {
            let mut file = self.file.lock();
            file.write_all(&line)?;
            file.flush()?;
        }
        if let Some(key) = key {
            self.seen.lock().insert(key);
        }
        tracing::debug!(path = ?self.path, event = %record.event, "appended record");
        Ok(())
    }

    fn previously_logged(&self, key: &ExposureKey) -> LogResult<bool> {
        Ok(self.seen.lock().contains(key))
    }
}

/// Read back every record from a JSON-lines log file.
pub fn read_records(path: &Path) -> Result<Vec<ExposureRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open log: {:?}", path))?;
    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("Failed to decode record on line {}", number + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::record::EXPOSURE_EVENT;
    use crate::interpreter::{Params, Value};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn exposure(i: i64) -> ExposureRecord {
        let mut inputs = Params::new();
        inputs.insert("i".into(), Value::Integer(i));
        ExposureRecord {
            event: EXPOSURE_EVENT.into(),
            name: "exp".into(),
            salt: "exp".into(),
            inputs,
            params: Params::new(),
            checksum: None,
            hash_version: "sha1-hex15".into(),
            event_id: Uuid::new_v4(),
            time: Utc::now(),
            extra_data: None,
        }
    }

    #[test]
    fn memory_logger_dedups_only_when_asked() {
        let plain = MemoryLogger::new();
        let dedup = MemoryLogger::deduplicating();
        let record = exposure(1);
        plain.log(&record).unwrap();
        dedup.log(&record).unwrap();

        let key = record.key().unwrap();
        assert!(!plain.previously_logged(&key).unwrap());
        assert!(dedup.previously_logged(&key).unwrap());
        assert!(!dedup.previously_logged(&exposure(2).key().unwrap()).unwrap());
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn plain_memory_logger_keeps_no_dedup_state() {
        let plain = MemoryLogger::new();
        for i in 0..100 {
            plain.log(&exposure(i)).unwrap();
        }
        assert_eq!(plain.len(), 100);
        assert!(plain.seen.lock().is_empty());

        let dedup = MemoryLogger::deduplicating();
        dedup.log(&exposure(1)).unwrap();
        dedup.log(&exposure(1)).unwrap();
        assert_eq!(dedup.seen.lock().len(), 1);
    }

    #[test]
    fn shared_references_forward_to_inner_logger() {
        let logger = Arc::new(MemoryLogger::new());
        let shared = Arc::clone(&logger);
        shared.log(&exposure(1)).unwrap();
        (&*logger).log(&exposure(2)).unwrap();
        assert_eq!(logger.len(), 2);
    }

    #[test]
    fn json_lines_logger_appends_and_reads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/exp.log");
        let logger = JsonLinesLogger::open(&path).unwrap();

        logger.log(&exposure(1)).unwrap();
        logger.log(&exposure(2)).unwrap();
        assert!(logger.previously_logged(&exposure(1).key().unwrap()).unwrap());

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].inputs["i"], Value::Integer(2));
    }
}
