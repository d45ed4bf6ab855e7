//! Placement row sources.
//!
//! The analytics core never talks to a database directly. It asks a
//! [`RowSource`] for the flattened placement rows matching a [`RowFilter`]
//! and aggregates them itself:
//! - [`MemorySource`] holds fixture rows in memory
//! - [`JsonlSource`] reads `placements.jsonl` from the data directory

mod jsonl;

pub use jsonl::*;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PlacementRecord, Region};

/// Errors that can occur while fetching rows.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Typed row scope. Sources apply it as a bound parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub region: Option<Region>,
}

impl RowFilter {
    /// All rows.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builder method to restrict to one region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Check if a row is in scope.
    pub fn matches(&self, record: &PlacementRecord) -> bool {
        match self.region {
            Some(region) => record.region == Some(region),
            None => true,
        }
    }
}

/// Anything that can produce placement rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch every row in scope. Failures propagate to the caller unchanged.
    async fn fetch_rows(&self, filter: &RowFilter) -> Result<Vec<PlacementRecord>, StorageError>;
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Location of the flattened placement rows.
    pub fn placements_path(&self) -> PathBuf {
        self.data_dir.join(PLACEMENTS_FILE)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// In-memory rows, mainly for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<PlacementRecord>,
}

impl MemorySource {
    pub fn new(rows: Vec<PlacementRecord>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn fetch_rows(&self, filter: &RowFilter) -> Result<Vec<PlacementRecord>, StorageError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
