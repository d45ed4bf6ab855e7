//! JSONL (JSON Lines) row storage.
//!
//! Each line is one flattened [`PlacementRecord`]. Blank lines are skipped
//! and lines that fail to parse are logged and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::PlacementRecord;

use super::{RowFilter, RowSource, StorageConfig, StorageError};

/// File name of the placement rows inside the data directory.
pub const PLACEMENTS_FILE: &str = "placements.jsonl";

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every parseable entity, keeping those accepted by `keep`.
    pub fn read_filtered<F>(&self, keep: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        if !self.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<T>(&line) {
                Ok(entity) => {
                    if keep(&entity) {
                        entities.push(entity);
                    }
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!(
            "Read {} entities from {:?} ({} unparseable)",
            entities.len(),
            self.path,
            skipped
        );
        Ok(entities)
    }

    /// Read all entities from the file.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        self.read_filtered(|_| true)
    }
}

/// Rows read from a JSONL file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source for `placements.jsonl` in the configured data directory.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.placements_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RowSource for JsonlSource {
    async fn fetch_rows(&self, filter: &RowFilter) -> Result<Vec<PlacementRecord>, StorageError> {
        let reader = JsonlReader::<PlacementRecord>::new(self.path.clone());
        let rows = reader.read_filtered(|r| filter.matches(r))?;
        info!("Loaded {} placement rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}
