//! Batch-level statistics for a scoring run.

use crate::domain::Domain;
use crate::types::RiskBucket;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

pub const HISTOGRAM_BINS: usize = 10;

/// Counts, mean probability and probability histogram of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub domain: Domain,
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub mean_probability: f64,
    /// Agreement between the three supervised models, `1 - std` averaged over rows
    pub model_agreement: Option<f64>,
    /// Counts per 0.1-wide probability bin; 1.0 falls in the last bin
    pub histogram: [usize; HISTOGRAM_BINS],
    pub elapsed_ms: u64,
}

impl BatchSummary {
    pub fn new(domain: Domain, probs: &[f64], buckets: &[RiskBucket], elapsed: Duration) -> Self {
        let count = |tier: RiskBucket| buckets.iter().filter(|b| **b == tier).count();

        let mean_probability = if probs.is_empty() {
            0.0
        } else {
            probs.iter().sum::<f64>() / probs.len() as f64
        };

        let mut histogram = [0usize; HISTOGRAM_BINS];
        for &p in probs {
            let bin = (p.clamp(0.0, 1.0) * HISTOGRAM_BINS as f64) as usize;
            histogram[bin.min(HISTOGRAM_BINS - 1)] += 1;
        }

        Self {
            domain,
            total: probs.len(),
            high: count(RiskBucket::High),
            medium: count(RiskBucket::Medium),
            low: count(RiskBucket::Low),
            mean_probability,
            model_agreement: None,
            histogram,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Attach agreement computed from per-model probability columns.
    pub fn with_model_agreement(mut self, per_model: &[&[f64]]) -> Self {
        self.model_agreement = model_agreement(per_model);
        self
    }

    pub fn flagged(&self) -> usize {
        self.high + self.medium
    }

    pub fn log_summary(&self) {
        let pct = |n: usize| {
            if self.total > 0 {
                n as f64 / self.total as f64 * 100.0
            } else {
                0.0
            }
        };

        info!(
            domain = %self.domain,
            total = self.total,
            high = self.high,
            medium = self.medium,
            low = self.low,
            mean_probability = self.mean_probability,
            elapsed_ms = self.elapsed_ms,
            "Batch scored"
        );
        info!(
            "High {:.1}% | Medium {:.1}% | Low {:.1}%",
            pct(self.high),
            pct(self.medium),
            pct(self.low)
        );
        if let Some(agreement) = self.model_agreement {
            info!("Model agreement: {:.1}%", agreement * 100.0);
        }

        for (i, &n) in self.histogram.iter().enumerate() {
            let bar = "#".repeat(((pct(n) / 2.0) as usize).min(50));
            info!(
                "  {:.1}-{:.1}: {:>7} ({:>5.1}%) {}",
                i as f64 / HISTOGRAM_BINS as f64,
                (i + 1) as f64 / HISTOGRAM_BINS as f64,
                n,
                pct(n),
                bar
            );
        }
    }
}

fn model_agreement(per_model: &[&[f64]]) -> Option<f64> {
    let rows = per_model.first()?.len();
    if per_model.len() < 2 || rows == 0 || per_model.iter().any(|m| m.len() != rows) {
        return None;
    }

    let k = per_model.len() as f64;
    let total: f64 = (0..rows)
        .map(|i| {
            let mean = per_model.iter().map(|m| m[i]).sum::<f64>() / k;
            let variance = per_model.iter().map(|m| (m[i] - mean).powi(2)).sum::<f64>() / k;
            1.0 - variance.sqrt().min(1.0)
        })
        .sum();
    Some(total / rows as f64)
}
