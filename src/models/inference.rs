//! Batch scoring with a loaded ensemble.

use crate::error::{PipelineError, Result};
use crate::features::{FeatureFrame, FeatureReconstructor};
use crate::models::aggregator::{normalize_probabilities, EnsembleWeights};
use crate::models::loader::ModelBundle;
use crate::models::Scaler;
use crate::types::RawTable;
use tracing::debug;

/// Per-model and blended probabilities for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedScores {
    pub primary_a: Vec<f64>,
    pub primary_b: Vec<f64>,
    /// Meta-refiner output on scaled features
    pub meta: Vec<f64>,
    /// Blend before any batch normalization
    pub blended: Vec<f64>,
    /// Final probability, normalized when requested
    pub p_final: Vec<f64>,
}

/// Unsupervised anomaly scores, each passed through its paired scaler.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScores {
    /// Negated isolation `score_samples`; higher is more anomalous
    pub isolation: Vec<f64>,
    /// Per-row mean squared reconstruction error
    pub reconstruction: Vec<f64>,
}

/// Applies an ensemble bundle to feature frames.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: EnsembleWeights,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Reconstruct features for the bundle's domain and score them.
    pub fn predict_supervised(
        &self,
        bundle: &ModelBundle,
        reconstructor: &FeatureReconstructor,
        table: &RawTable,
        normalize: bool,
    ) -> Result<(FeatureFrame, SupervisedScores)> {
        let frame = reconstructor.reconstruct(bundle.domain, table);
        let scores = self.score_features(bundle, &frame, normalize)?;
        Ok((frame, scores))
    }

    /// Reconstruct features for the bundle's domain and compute anomaly scores.
    pub fn predict_unsupervised(
        &self,
        bundle: &ModelBundle,
        reconstructor: &FeatureReconstructor,
        table: &RawTable,
    ) -> Result<AnomalyScores> {
        let frame = reconstructor.reconstruct(bundle.domain, table);
        self.score_anomalies(bundle, &frame)
    }

    pub fn score_features(
        &self,
        bundle: &ModelBundle,
        frame: &FeatureFrame,
        normalize: bool,
    ) -> Result<SupervisedScores> {
        let rows = frame.rows();
        let n = rows.len();

        let primary_a = checked(bundle.primary_a.predict_proba(rows)?, n, "xgb")?;
        let primary_b = checked(bundle.primary_b.predict_proba(rows)?, n, "rf")?;

        let scaled = bundle.meta_scaler.transform(rows)?;
        let meta = checked(bundle.meta_refiner.predict_proba(&scaled)?, n, "lr_meta")?;

        let blended: Vec<f64> = primary_a
            .iter()
            .zip(&primary_b)
            .zip(&meta)
            .map(|((&a, &b), &m)| self.weights.blend(a, b, m).clamp(0.0, 1.0))
            .collect();

        let p_final = if normalize {
            normalize_probabilities(&blended)
        } else {
            blended.clone()
        };

        debug!(
            domain = %bundle.domain,
            rows = n,
            normalized = normalize,
            "Ensemble scoring complete"
        );

        Ok(SupervisedScores {
            primary_a,
            primary_b,
            meta,
            blended,
            p_final,
        })
    }

    pub fn score_anomalies(&self, bundle: &ModelBundle, frame: &FeatureFrame) -> Result<AnomalyScores> {
        let rows = frame.rows();
        let n = rows.len();

        let raw_iso: Vec<f64> = checked(bundle.isolation.score_samples(rows)?, n, "iso")?
            .into_iter()
            .map(|s| -s)
            .collect();

        let recon = bundle.autoencoder.reconstruct(rows)?;
        if recon.len() != n {
            return Err(length_mismatch("ae", n, recon.len()));
        }
        let raw_ae: Vec<f64> = rows
            .iter()
            .zip(&recon)
            .map(|(x, r)| mean_squared_error(x, r))
            .collect::<Result<Vec<f64>>>()?;

        let isolation = rescale(bundle.isolation_scaler.as_ref(), &raw_iso, "scaler_iso")?;
        let reconstruction = rescale(bundle.autoencoder_scaler.as_ref(), &raw_ae, "scaler_ae")?;

        debug!(domain = %bundle.domain, rows = n, "Anomaly scoring complete");
        Ok(AnomalyScores {
            isolation,
            reconstruction,
        })
    }
}

fn checked(scores: Vec<f64>, expected: usize, model: &str) -> Result<Vec<f64>> {
    if scores.len() != expected {
        return Err(length_mismatch(model, expected, scores.len()));
    }
    Ok(scores)
}

fn length_mismatch(model: &str, expected: usize, got: usize) -> PipelineError {
    PipelineError::inference(model, format!("expected {} scores, got {}", expected, got))
}

fn mean_squared_error(x: &[f64], recon: &[f64]) -> Result<f64> {
    if x.len() != recon.len() {
        return Err(PipelineError::inference(
            "ae",
            format!("reconstruction width {} differs from input {}", recon.len(), x.len()),
        ));
    }
    if x.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = x.iter().zip(recon).map(|(a, b)| (a - b).powi(2)).sum();
    Ok(sum / x.len() as f64)
}

/// Pass a single score column through its fitted scaler.
fn rescale(scaler: &dyn Scaler, values: &[f64], name: &str) -> Result<Vec<f64>> {
    let column: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
    let scaled = scaler.transform(&column)?;
    scaled
        .into_iter()
        .map(|row| {
            row.first()
                .copied()
                .ok_or_else(|| PipelineError::inference(name, "scaler returned an empty row"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::features::FeatureSchema;
    use crate::models::stubs::{half_sum, stub_bundle, FactorScaler, FnClassifier};

    fn frame(rows: Vec<Vec<f64>>) -> FeatureFrame {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]).unwrap();
        FeatureFrame::new(schema, rows).unwrap()
    }

    #[test]
    fn test_blend_matches_formula() {
        let bundle = stub_bundle(Domain::Cdr);
        let frame = frame(vec![vec![0.3, -1.2], vec![2.0, 0.5], vec![0.0, 0.0]]);

        let scores = Scorer::new().score_features(&bundle, &frame, false).unwrap();

        for i in 0..frame.len() {
            let expected = 0.5 * (0.6 * scores.primary_a[i] + 0.4 * scores.primary_b[i])
                + 0.5 * scores.meta[i];
            assert!((scores.p_final[i] - expected).abs() < 1e-9);
            assert_eq!(scores.p_final[i], scores.blended[i]);
        }
    }

    #[test]
    fn test_meta_refiner_sees_scaled_features() {
        let mut bundle = stub_bundle(Domain::Upi);
        bundle.meta_scaler = Box::new(FactorScaler(2.0));
        let frame = frame(vec![vec![1.0, 1.0]]);

        let scores = Scorer::new().score_features(&bundle, &frame, false).unwrap();
        assert!((scores.meta[0] - half_sum(&[2.0, 2.0])).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_output_spans_unit_interval() {
        let bundle = stub_bundle(Domain::Cdr);
        let frame = frame(vec![vec![-3.0, 0.0], vec![0.0, 0.0], vec![3.0, 0.0]]);

        let scores = Scorer::new().score_features(&bundle, &frame, true).unwrap();
        assert!((scores.p_final[0] - 0.0).abs() < 1e-12);
        assert!((scores.p_final[2] - 1.0).abs() < 1e-12);
        assert!(scores.p_final.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_identical_rows_normalize_to_zero() {
        let bundle = stub_bundle(Domain::Cdr);
        let frame = frame(vec![vec![0.7, 0.1]; 4]);

        let scores = Scorer::new().score_features(&bundle, &frame, true).unwrap();
        assert_eq!(scores.p_final, vec![0.0; 4]);
    }

    #[test]
    fn test_short_classifier_output_is_rejected() {
        fn one(_: &[f64]) -> f64 {
            0.5
        }
        struct Truncating;
        impl crate::models::Classifier for Truncating {
            fn predict_proba(&self, _rows: &[Vec<f64>]) -> Result<Vec<f64>> {
                Ok(vec![0.5])
            }
        }

        let mut bundle = stub_bundle(Domain::Upi);
        bundle.primary_a = Box::new(FnClassifier(one));
        bundle.primary_b = Box::new(Truncating);
        let frame = frame(vec![vec![0.0, 0.0], vec![1.0, 1.0]]);

        let err = Scorer::new().score_features(&bundle, &frame, false).unwrap_err();
        assert!(matches!(err, PipelineError::Inference { .. }));
    }

    #[test]
    fn test_anomaly_scores() {
        let mut bundle = stub_bundle(Domain::Cdr);
        bundle.autoencoder_scaler = Box::new(FactorScaler(10.0));
        let frame = frame(vec![vec![1.0, 3.0], vec![-2.0, 0.0]]);

        let scores = Scorer::new().score_anomalies(&bundle, &frame).unwrap();

        // score_samples is the negated sum, so iso is the plain sum
        assert_eq!(scores.isolation, vec![4.0, -2.0]);
        // mean((x - 0)^2) scaled by 10
        assert_eq!(scores.reconstruction, vec![50.0, 20.0]);
    }

    #[test]
    fn test_empty_batch() {
        let bundle = stub_bundle(Domain::Upi);
        let frame = frame(Vec::new());

        let scores = Scorer::new().score_features(&bundle, &frame, true).unwrap();
        assert!(scores.p_final.is_empty());

        let anomalies = Scorer::new().score_anomalies(&bundle, &frame).unwrap();
        assert!(anomalies.isolation.is_empty());
    }
}
