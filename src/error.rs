//! Error taxonomy for the scoring pipeline.
//!
//! Configuration and artifact errors are fatal: they describe a broken
//! deployment and are always propagated to the caller. Bad input data never
//! shows up here; it is absorbed by the coercion layer in `features::coerce`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the scoring pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configuration file, domain entry or role entry is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One or more declared artifacts are absent on disk.
    #[error("missing model files for {domain}:\n{}", format_paths(.paths))]
    MissingArtifacts { domain: String, paths: Vec<PathBuf> },

    /// A domain key other than `upi` or `cdr`.
    #[error("unknown domain '{0}', expected 'upi' or 'cdr'")]
    UnknownDomain(String),

    /// An artifact exists but could not be read or has the wrong shape.
    #[error("invalid artifact {path}: {message}")]
    Artifact { path: PathBuf, message: String },

    /// A feature row does not match the width of its schema.
    #[error("feature row {row} has {found} values, schema expects {expected}")]
    Shape {
        row: usize,
        found: usize,
        expected: usize,
    },

    /// A model failed while scoring a batch.
    #[error("inference failed in {model}: {message}")]
    Inference { model: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn inference(model: &str, message: impl ToString) -> Self {
        Self::Inference {
            model: model.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Artifact {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, PipelineError>;
