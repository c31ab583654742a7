//! Deterministic in-memory artifacts for unit tests.

use crate::domain::Domain;
use crate::error::Result;
use crate::models::loader::{ArtifactFactory, ModelBundle, ModelRole};
use crate::models::{Classifier, IsolationScorer, Reconstructor, Scaler};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Classifier computing its probability from the row with a plain function.
pub(crate) struct FnClassifier(pub fn(&[f64]) -> f64);

impl Classifier for FnClassifier {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(rows.iter().map(|r| (self.0)(r)).collect())
    }
}

/// `x * factor` on every column.
pub(crate) struct FactorScaler(pub f64);

impl Scaler for FactorScaler {
    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        Ok(rows
            .iter()
            .map(|r| r.iter().map(|v| v * self.0).collect::<Vec<f64>>())
            .collect())
    }
}

/// `score_samples` is the negated row sum.
pub(crate) struct NegSumIsolation;

impl IsolationScorer for NegSumIsolation {
    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(rows.iter().map(|r| -r.iter().sum::<f64>()).collect())
    }
}

/// Reconstructs every row as zeros, so the error is the mean square.
pub(crate) struct ZeroReconstructor;

impl Reconstructor for ZeroReconstructor {
    fn reconstruct(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        Ok(rows.iter().map(|r| vec![0.0; r.len()]).collect())
    }
}

pub(crate) fn first_value(row: &[f64]) -> f64 {
    sigmoid(row.first().copied().unwrap_or(0.0))
}

pub(crate) fn row_sum(row: &[f64]) -> f64 {
    sigmoid(row.iter().sum::<f64>())
}

pub(crate) fn half_sum(row: &[f64]) -> f64 {
    sigmoid(0.5 * row.iter().sum::<f64>())
}

pub(crate) fn stub_bundle(domain: Domain) -> ModelBundle {
    ModelBundle {
        domain,
        primary_a: Box::new(FnClassifier(row_sum)),
        primary_b: Box::new(FnClassifier(first_value)),
        meta_refiner: Box::new(FnClassifier(half_sum)),
        isolation: Box::new(NegSumIsolation),
        autoencoder: Box::new(ZeroReconstructor),
        meta_scaler: Box::new(FactorScaler(1.0)),
        isolation_scaler: Box::new(FactorScaler(1.0)),
        autoencoder_scaler: Box::new(FactorScaler(1.0)),
    }
}

/// Hands out stub artifacts and counts how many were requested.
#[derive(Clone, Default)]
pub(crate) struct StubFactory {
    loads: Arc<AtomicUsize>,
}

impl StubFactory {
    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }
}

impl ArtifactFactory for StubFactory {
    fn classifier(&self, role: ModelRole, _path: &Path) -> Result<Box<dyn Classifier>> {
        self.bump();
        let f: fn(&[f64]) -> f64 = match role {
            ModelRole::PrimaryA => row_sum,
            ModelRole::PrimaryB => first_value,
            _ => half_sum,
        };
        Ok(Box::new(FnClassifier(f)))
    }

    fn isolation(&self, _path: &Path) -> Result<Box<dyn IsolationScorer>> {
        self.bump();
        Ok(Box::new(NegSumIsolation))
    }

    fn reconstructor(&self, _path: &Path) -> Result<Box<dyn Reconstructor>> {
        self.bump();
        Ok(Box::new(ZeroReconstructor))
    }

    fn scaler(&self, _role: ModelRole, _path: &Path) -> Result<Box<dyn Scaler>> {
        self.bump();
        Ok(Box::new(FactorScaler(1.0)))
    }
}
