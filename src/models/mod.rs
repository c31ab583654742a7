//! Model artifacts and ensemble scoring.
//!
//! Artifacts are black boxes with a fixed call contract. The ONNX and JSON
//! implementations live in `onnx` and `scaler`; tests substitute stubs.

pub mod aggregator;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod scaler;

#[cfg(test)]
pub(crate) mod stubs;

pub use aggregator::{normalize_probabilities, EnsembleWeights};
pub use inference::{AnomalyScores, Scorer, SupervisedScores};
pub use loader::{
    ArtifactFactory, ArtifactPaths, EnsembleLoader, ModelBundle, ModelPaths, ModelRole,
    OnnxArtifacts,
};
pub use scaler::FittedScaler;

use crate::error::Result;

/// Binary classifier returning the fraud-class probability per row.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// Fitted feature transform.
pub trait Scaler: Send + Sync {
    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

/// Isolation-style detector. Lower `score_samples` means more anomalous.
pub trait IsolationScorer: Send + Sync {
    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// Reconstruction-based detector (autoencoder).
pub trait Reconstructor: Send + Sync {
    fn reconstruct(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}
