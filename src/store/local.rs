use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Serialize)]
struct HighScoreFile {
    high_score: i64,
}

/// The single running maximum in `{"high_score": <int>}`.
///
/// Every write goes through the mutex, so the ingest-triggered write path and
/// the render loop never race on the file.
pub struct LocalFileStore {
    path: PathBuf,
    high_score: Mutex<i64>,
}

impl LocalFileStore {
    /// A missing file means 0. An unreadable or malformed one is logged and
    /// also treated as 0; the next new maximum overwrites it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let high_score = if path.exists() {
            match read_high_score(&path) {
                Ok(score) => score,
                Err(err) => {
                    warn!(
                        "Ignoring unreadable high score file {}: {err}",
                        path.display()
                    );
                    0
                }
            }
        } else {
            0
        };

        Self {
            path,
            high_score: Mutex::new(high_score),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn high_score(&self) -> i64 {
        *self.lock()
    }

    /// Rewrites the file only when `score` beats the cached maximum.
    /// Returns whether it did. The cached value only moves once the file
    /// holds it.
    pub fn record(&self, score: i64) -> Result<bool, StoreError> {
        let mut guard = self.lock();
        if score <= *guard {
            return Ok(false);
        }
        self.persist(score)?;
        *guard = score;
        Ok(true)
    }

    fn persist(&self, high_score: i64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string(&HighScoreFile { high_score })?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, i64> {
        match self.high_score.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// Older builds wrote the mean as a float (`625.0`); round those on the way in.
fn read_high_score(path: &Path) -> Result<i64, StoreError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let raw = value.get("high_score").unwrap_or(&Value::Null);
    Ok(raw
        .as_i64()
        .or_else(|| raw.as_f64().map(|score| score.round() as i64))
        .unwrap_or(0))
}
