//! Append-only log of finalized refinements

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::types::FinalRefinementPackage;

/// One finalized refinement as stored downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRecord {
    pub id: Uuid,
    pub session_id: Option<Uuid>,
    pub original_query: String,
    pub refined_query: String,
    pub requirements: Vec<String>,
    pub tags: Vec<String>,
    pub confidence: f32,
    pub refinement_rounds: u32,
    pub timestamp: DateTime<Utc>,
}

impl RefinementRecord {
    pub fn from_package(package: &FinalRefinementPackage, session_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            original_query: package.original_query.clone(),
            refined_query: package.refined_query.clone(),
            requirements: package.requirements.clone(),
            tags: package.tags.clone(),
            confidence: package.confidence,
            refinement_rounds: package.refinement_rounds,
            timestamp: package.timestamp,
        }
    }
}

/// Destination for finalized refinements
pub trait RecordSink: Send + Sync {
    fn append(&self, record: &RefinementRecord) -> Result<()>;
}

/// JSON Lines file, one record per line
pub struct JsonlRecordLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlRecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, skipping lines that do not parse
    pub fn read_all(&self) -> Result<Vec<RefinementRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl RecordSink for JsonlRecordLog {
    fn append(&self, record: &RefinementRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}
