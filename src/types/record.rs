//! Per-record scoring output.

use crate::types::RiskBucket;
use serde::{Deserialize, Serialize};

/// Output columns appended to every scored record.
pub const P_FINAL: &str = "p_final";
pub const RISK_BUCKET: &str = "risk_bucket";
pub const REASON: &str = "reason";
pub const P_ISO: &str = "p_iso";
pub const P_AE: &str = "p_ae";

/// Scoring result for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Zero-based position in the input batch
    pub row: usize,

    /// Final fraud probability in [0, 1]
    pub p_final: f64,

    pub risk_bucket: RiskBucket,

    /// Human-readable explanation
    pub reason: String,

    /// Isolation anomaly score, when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub p_iso: Option<f64>,

    /// Reconstruction anomaly score, when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub p_ae: Option<f64>,
}

impl ScoredRecord {
    pub fn new(row: usize, p_final: f64, risk_bucket: RiskBucket, reason: String) -> Self {
        Self {
            row,
            p_final,
            risk_bucket,
            reason,
            p_iso: None,
            p_ae: None,
        }
    }

    pub fn with_anomaly_scores(mut self, p_iso: f64, p_ae: f64) -> Self {
        self.p_iso = Some(p_iso);
        self.p_ae = Some(p_ae);
        self
    }

    pub fn is_flagged(&self) -> bool {
        self.risk_bucket != RiskBucket::Low
    }
}
