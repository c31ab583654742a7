//! Risk tiers and the per-domain cut points that produce them.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    /// Determine the tier from a probability. Lower bounds are inclusive.
    pub fn from_probability(p: f64, thresholds: &ThresholdPair) -> Self {
        if p >= thresholds.high {
            RiskBucket::High
        } else if p >= thresholds.medium {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Low => "Low",
            RiskBucket::Medium => "Medium",
            RiskBucket::High => "High",
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static cut points for one domain. `medium < high`, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub medium: f64,
    pub high: f64,
}

impl ThresholdPair {
    /// The UPI ensemble saturates near 1.0, so its cut points sit far higher
    /// than the CDR ones.
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Upi => Self {
                medium: 0.95,
                high: 0.97,
            },
            Domain::Cdr => Self {
                medium: 0.30,
                high: 0.70,
            },
        }
    }
}
