//! Fraud Risk Scoring Library
//!
//! Batch fraud-risk scoring for UPI payment transactions and call-detail
//! records: feature reconstruction, a stacked model ensemble, static risk
//! tiers and rule-based explanations.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod reason;
pub mod risk;
pub mod summary;
pub mod types;

pub use config::AppConfig;
pub use diagnostics::ThresholdLog;
pub use domain::Domain;
pub use error::{PipelineError, Result};
pub use features::{FeatureFrame, FeatureReconstructor, FeatureSchema, FeatureSchemas};
pub use models::{EnsembleLoader, ModelBundle, ModelPaths, OnnxArtifacts, Scorer};
pub use pipeline::{ScoreOptions, ScoredTable, ScoringPipeline};
pub use reason::ReasonGenerator;
pub use risk::{BucketAssignment, RiskBucketer};
pub use summary::BatchSummary;
pub use types::{RawTable, RiskBucket, ScoredRecord, ThresholdPair};
