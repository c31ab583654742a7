//! Probability to risk-tier bucketing.

use crate::domain::Domain;
use crate::error::Result;
use crate::types::{RiskBucket, ThresholdPair};
use serde::Serialize;
use tracing::info;

/// Tiers for one batch together with the cut points that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketAssignment {
    pub domain: Domain,
    pub thresholds: ThresholdPair,
    pub buckets: Vec<RiskBucket>,
}

/// Buckets probabilities using a domain's static thresholds.
#[derive(Debug, Clone, Copy)]
pub struct RiskBucketer {
    domain: Domain,
    thresholds: ThresholdPair,
}

impl RiskBucketer {
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain,
            thresholds: ThresholdPair::for_domain(domain),
        }
    }

    /// Bucketer for a textual domain key such as `"upi"`.
    pub fn for_key(key: &str) -> Result<Self> {
        Ok(Self::for_domain(key.parse()?))
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn thresholds(&self) -> ThresholdPair {
        self.thresholds
    }

    pub fn bucket(&self, p: f64) -> RiskBucket {
        RiskBucket::from_probability(p, &self.thresholds)
    }

    /// Bucket a batch. The returned assignment carries the active thresholds
    /// so the caller can record them.
    pub fn apply(&self, probs: &[f64]) -> BucketAssignment {
        info!(
            domain = %self.domain,
            medium = self.thresholds.medium,
            high = self.thresholds.high,
            "Using risk thresholds"
        );

        BucketAssignment {
            domain: self.domain,
            thresholds: self.thresholds,
            buckets: probs.iter().map(|&p| self.bucket(p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_upi_threshold_examples() {
        let bucketer = RiskBucketer::for_domain(Domain::Upi);

        assert_eq!(bucketer.bucket(0.96), RiskBucket::Medium);
        assert_eq!(bucketer.bucket(0.97), RiskBucket::High);
        assert_eq!(bucketer.bucket(0.949999), RiskBucket::Low);
        assert_eq!(bucketer.bucket(0.95), RiskBucket::Medium);
    }

    #[test]
    fn test_cdr_lower_bounds_inclusive() {
        let bucketer = RiskBucketer::for_domain(Domain::Cdr);

        assert_eq!(bucketer.bucket(0.30), RiskBucket::Medium);
        assert_eq!(bucketer.bucket(0.70), RiskBucket::High);
        assert_eq!(bucketer.bucket(0.2999), RiskBucket::Low);
        assert_eq!(bucketer.bucket(1.0), RiskBucket::High);
        assert_eq!(bucketer.bucket(0.0), RiskBucket::Low);
    }

    #[test]
    fn test_buckets_are_monotonic() {
        for domain in Domain::ALL {
            let bucketer = RiskBucketer::for_domain(domain);
            let probs: Vec<f64> = (0..=1000).map(|i| i as f64 / 1000.0).collect();
            let assignment = bucketer.apply(&probs);

            assert!(assignment.buckets.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_assignment_reports_thresholds() {
        let assignment = RiskBucketer::for_key("cdr").unwrap().apply(&[0.1, 0.5, 0.9]);

        assert_eq!(assignment.domain, Domain::Cdr);
        assert_eq!(assignment.thresholds, ThresholdPair { medium: 0.30, high: 0.70 });
        assert_eq!(
            assignment.buckets,
            vec![RiskBucket::Low, RiskBucket::Medium, RiskBucket::High]
        );
    }

    #[test]
    fn test_unknown_domain_key() {
        let err = RiskBucketer::for_key("sms").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownDomain(_)));
    }
}
