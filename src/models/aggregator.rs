//! Ensemble blending and batch normalization.

/// Fixed weights of the stacked ensemble.
///
/// `p_final = ensemble * (primary_a * p_a + primary_b * p_b) + meta * p_meta`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleWeights {
    pub primary_a: f64,
    pub primary_b: f64,
    pub ensemble: f64,
    pub meta: f64,
}

impl EnsembleWeights {
    /// Weighted average of the two primary classifiers.
    pub fn primary(&self, p_a: f64, p_b: f64) -> f64 {
        self.primary_a * p_a + self.primary_b * p_b
    }

    pub fn blend(&self, p_a: f64, p_b: f64, p_meta: f64) -> f64 {
        self.ensemble * self.primary(p_a, p_b) + self.meta * p_meta
    }
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            primary_a: 0.6,
            primary_b: 0.4,
            ensemble: 0.5,
            meta: 0.5,
        }
    }
}

const ABS_TOLERANCE: f64 = 1e-8;
const REL_TOLERANCE: f64 = 1e-5;

/// Min-max normalize a batch into [0, 1].
///
/// A batch whose extremes are numerically indistinguishable maps to all zeros.
pub fn normalize_probabilities(probs: &[f64]) -> Vec<f64> {
    if probs.is_empty() {
        return Vec::new();
    }

    let (min, max) = probs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });

    if (max - min).abs() <= ABS_TOLERANCE + REL_TOLERANCE * max.abs() {
        return vec![0.0; probs.len()];
    }

    let range = max - min;
    probs.iter().map(|&p| (p - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_formula() {
        let weights = EnsembleWeights::default();
        let cases = [(0.9, 0.7, 0.4), (0.0, 1.0, 0.5), (0.12, 0.34, 0.98)];

        for (a, b, m) in cases {
            let expected = 0.5 * (0.6 * a + 0.4 * b) + 0.5 * m;
            assert!((weights.blend(a, b, m) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_blend_stays_in_unit_interval() {
        let weights = EnsembleWeights::default();
        assert!((weights.blend(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(weights.blend(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_normalize_spans_unit_interval() {
        let out = normalize_probabilities(&[0.2, 0.6, 0.4]);
        assert!((out[0] - 0.0).abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!((out[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_batch_is_zero() {
        assert_eq!(normalize_probabilities(&[0.42, 0.42, 0.42]), vec![0.0; 3]);
        assert_eq!(normalize_probabilities(&[0.8]), vec![0.0]);
        assert_eq!(normalize_probabilities(&[0.5, 0.5 + 1e-9]), vec![0.0; 2]);
    }

    #[test]
    fn test_empty_batch() {
        assert!(normalize_probabilities(&[]).is_empty());
    }
}
