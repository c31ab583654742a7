//! Persisted record of the thresholds used by the most recent run.

use crate::error::{PipelineError, Result};
use crate::risk::BucketAssignment;
use crate::types::ThresholdPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub const THRESHOLD_FILE: &str = "last_thresholds.json";

/// What gets written, e.g.
/// `{"cdr": {"medium": 0.3, "high": 0.7}, "recorded_at": "...", "run_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    #[serde(flatten)]
    pub thresholds: BTreeMap<String, ThresholdPair>,
    pub recorded_at: DateTime<Utc>,
    pub run_id: Uuid,
}

impl ThresholdRecord {
    pub fn from_assignment(assignment: &BucketAssignment) -> Self {
        Self {
            thresholds: BTreeMap::from([(
                assignment.domain.key().to_string(),
                assignment.thresholds,
            )]),
            recorded_at: Utc::now(),
            run_id: Uuid::new_v4(),
        }
    }
}

/// Writes the threshold diagnostic. Each write replaces the previous file.
#[derive(Debug, Clone)]
pub struct ThresholdLog {
    path: PathBuf,
}

impl ThresholdLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file `last_thresholds.json` inside `outputs_dir`.
    pub fn in_dir<P: AsRef<Path>>(outputs_dir: P) -> Self {
        Self::new(outputs_dir.as_ref().join(THRESHOLD_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, assignment: &BucketAssignment) -> Result<ThresholdRecord> {
        let record = ThresholdRecord::from_assignment(assignment);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&record).map_err(std::io::Error::from)?;
        fs::write(&self.path, json)?;

        debug!(
            path = %self.path.display(),
            domain = %assignment.domain,
            run_id = %record.run_id,
            "Threshold diagnostic written"
        );
        Ok(record)
    }

    /// Load the last written record. The pipeline itself only writes; this is
    /// for callers inspecting a finished run.
    pub fn read(&self) -> Result<ThresholdRecord> {
        let text = fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|e| PipelineError::Io(e.into()))
    }
}
