//! The two record families the pipeline scores.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record family: UPI payment transactions or call-detail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Upi,
    Cdr,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Upi, Domain::Cdr];

    /// Key used in configuration files and output file names.
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Upi => "upi",
            Domain::Cdr => "cdr",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Domain {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upi" => Ok(Domain::Upi),
            "cdr" => Ok(Domain::Cdr),
            _ => Err(PipelineError::UnknownDomain(s.to_string())),
        }
    }
}
