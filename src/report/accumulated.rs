//! Accumulated results file shared by concurrent evaluation units
//!
//! Every `record` is a full read-merge-write cycle held under one mutex, and
//! the new content lands through a temp file + rename so readers never see a
//! half-written file.

use crate::engine::ExecutionResult;
use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// One recorded evaluation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub unit: String,
    /// Seconds since the Unix epoch
    pub recorded_at: u64,
    pub result: ExecutionResult,
}

/// On-disk content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedResults {
    /// Bumped on every write
    pub version: u64,
    pub runs: Vec<RunRecord>,
}

/// Mutex-serialized JSON results file
#[derive(Debug)]
pub struct ResultsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one run; returns the number of runs now stored
    pub fn record(&self, unit: &str, result: &ExecutionResult) -> Result<usize> {
        let _guard = self.lock.lock();

        let mut accumulated = read_file(&self.path)?;
        accumulated.version += 1;
        accumulated.runs.push(RunRecord {
            unit: unit.to_string(),
            recorded_at: unix_seconds(),
            result: result.clone(),
        });
        write_atomic(&self.path, &accumulated)?;

        debug!(
            path = %self.path.display(),
            unit = %unit,
            runs = accumulated.runs.len(),
            "recorded accumulated result"
        );
        Ok(accumulated.runs.len())
    }

    /// Current content; empty when the file does not exist yet
    pub fn load(&self) -> Result<AccumulatedResults> {
        let _guard = self.lock.lock();
        read_file(&self.path)
    }
}

fn read_file(path: &Path) -> Result<AccumulatedResults> {
    if !path.exists() {
        return Ok(AccumulatedResults::default());
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_atomic(path: &Path, content: &AccumulatedResults) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, content)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    std::fs::rename(&temp, path)?;
    Ok(())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample(executed: usize) -> ExecutionResult {
        ExecutionResult {
            total_statements: executed,
            executed_count: executed,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_and_load() {
        let dir = TempDir::new().unwrap();
        let store = ResultsStore::new(dir.path().join("results.json"));
        assert_eq!(store.load().unwrap(), AccumulatedResults::default());

        assert_eq!(store.record("a.sql", &sample(2)).unwrap(), 1);
        assert_eq!(store.record("b.sql", &sample(3)).unwrap(), 2);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.runs[1].unit, "b.sql");
        assert_eq!(loaded.runs[1].result.executed_count, 3);
        assert!(!dir.path().join("results.json.tmp").exists());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ResultsStore::new(dir.path().join("results.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.record(&format!("unit-{}", i), &sample(i)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load().unwrap();
        assert_eq!(loaded.runs.len(), 8);
        assert_eq!(loaded.version, 8);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(ResultsStore::new(&path).record("x", &sample(1)).is_err());
    }
}
