//! Ensemble loading from the declarative model-path mapping.
//!
//! The mapping names every artifact per domain, relative to the project root:
//!
//! ```yaml
//! upi:
//!   xgb: models/upi/xgb.onnx
//!   rf: models/upi/rf.onnx
//!   lr_meta: models/upi/lr_meta.onnx
//!   iso: models/upi/iso.onnx
//!   ae: models/upi/ae.onnx
//!   scaler_lr: models/upi/scaler_lr.json
//!   scaler_iso: models/upi/scaler_iso.json
//!   scaler_ae: models/upi/scaler_ae.json
//! ```
//!
//! A bundle is either complete or not returned at all.

use crate::domain::Domain;
use crate::error::{PipelineError, Result};
use crate::models::onnx::{OnnxAutoencoder, OnnxClassifier, OnnxIsolationForest};
use crate::models::scaler::FittedScaler;
use crate::models::{Classifier, IsolationScorer, Reconstructor, Scaler};
use config::{Config, File};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Role of an artifact within a domain's ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelRole {
    /// Primary classifier A (gradient boosting)
    PrimaryA,
    /// Primary classifier B (random forest)
    PrimaryB,
    /// Logistic meta-refiner over scaled features
    MetaRefiner,
    Isolation,
    Autoencoder,
    MetaScaler,
    IsolationScaler,
    AutoencoderScaler,
}

impl ModelRole {
    pub const ALL: [ModelRole; 8] = [
        ModelRole::PrimaryA,
        ModelRole::PrimaryB,
        ModelRole::MetaRefiner,
        ModelRole::Isolation,
        ModelRole::Autoencoder,
        ModelRole::MetaScaler,
        ModelRole::IsolationScaler,
        ModelRole::AutoencoderScaler,
    ];

    /// Key in the mapping file.
    pub fn key(&self) -> &'static str {
        match self {
            ModelRole::PrimaryA => "xgb",
            ModelRole::PrimaryB => "rf",
            ModelRole::MetaRefiner => "lr_meta",
            ModelRole::Isolation => "iso",
            ModelRole::Autoencoder => "ae",
            ModelRole::MetaScaler => "scaler_lr",
            ModelRole::IsolationScaler => "scaler_iso",
            ModelRole::AutoencoderScaler => "scaler_ae",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Domain → role key → path, as declared in the mapping file.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    project_root: PathBuf,
    domains: HashMap<String, HashMap<String, String>>,
}

impl ModelPaths {
    pub fn new(
        project_root: impl Into<PathBuf>,
        domains: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            domains,
        }
    }

    /// Read the mapping file. Its absence is a configuration error.
    pub fn load<P: AsRef<Path>>(mapping_file: P, project_root: impl Into<PathBuf>) -> Result<Self> {
        let mapping_file = mapping_file.as_ref();
        if !mapping_file.is_file() {
            return Err(PipelineError::Configuration(format!(
                "model path mapping not found: {}",
                mapping_file.display()
            )));
        }

        let domains: HashMap<String, HashMap<String, String>> = Config::builder()
            .add_source(File::from(mapping_file))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                PipelineError::Configuration(format!(
                    "failed to read model path mapping {}: {}",
                    mapping_file.display(),
                    e
                ))
            })?;

        Ok(Self::new(project_root, domains))
    }

    /// Resolve every role for `domain` against the project root.
    pub fn for_domain(&self, domain: Domain) -> Result<ArtifactPaths> {
        let entries = self.domains.get(domain.key()).ok_or_else(|| {
            PipelineError::Configuration(format!("no model paths configured for '{}'", domain))
        })?;

        let missing_roles: Vec<&str> = ModelRole::ALL
            .iter()
            .map(ModelRole::key)
            .filter(|key| !entries.contains_key(*key))
            .collect();
        if !missing_roles.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "model paths for '{}' lack roles: {}",
                domain,
                missing_roles.join(", ")
            )));
        }

        let paths = ModelRole::ALL
            .iter()
            .map(|role| (*role, self.project_root.join(&entries[role.key()])))
            .collect();

        Ok(ArtifactPaths { domain, paths })
    }
}

/// Resolved artifact locations for one domain, in role order.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub domain: Domain,
    paths: Vec<(ModelRole, PathBuf)>,
}

impl ArtifactPaths {
    pub fn get(&self, role: ModelRole) -> Option<&Path> {
        self.paths
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, p)| p.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelRole, &Path)> {
        self.paths.iter().map(|(r, p)| (*r, p.as_path()))
    }

    /// Paths that do not exist on disk.
    pub fn missing(&self) -> Vec<PathBuf> {
        self.paths
            .iter()
            .filter(|(_, p)| !p.exists())
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn require(&self, role: ModelRole) -> Result<&Path> {
        self.get(role).ok_or_else(|| {
            PipelineError::Configuration(format!("no path for role {} in '{}'", role, self.domain))
        })
    }
}

/// Every artifact an ensemble needs. Immutable once loaded.
pub struct ModelBundle {
    pub domain: Domain,
    pub primary_a: Box<dyn Classifier>,
    pub primary_b: Box<dyn Classifier>,
    pub meta_refiner: Box<dyn Classifier>,
    pub isolation: Box<dyn IsolationScorer>,
    pub autoencoder: Box<dyn Reconstructor>,
    pub meta_scaler: Box<dyn Scaler>,
    pub isolation_scaler: Box<dyn Scaler>,
    pub autoencoder_scaler: Box<dyn Scaler>,
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Turns artifact files into callable models.
pub trait ArtifactFactory {
    fn classifier(&self, role: ModelRole, path: &Path) -> Result<Box<dyn Classifier>>;
    fn isolation(&self, path: &Path) -> Result<Box<dyn IsolationScorer>>;
    fn reconstructor(&self, path: &Path) -> Result<Box<dyn Reconstructor>>;
    fn scaler(&self, role: ModelRole, path: &Path) -> Result<Box<dyn Scaler>>;
}

/// ONNX models and JSON scalers.
#[derive(Debug, Clone)]
pub struct OnnxArtifacts {
    /// Intra-op threads per ONNX session
    threads: usize,
}

impl OnnxArtifacts {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }
}

impl Default for OnnxArtifacts {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl ArtifactFactory for OnnxArtifacts {
    fn classifier(&self, role: ModelRole, path: &Path) -> Result<Box<dyn Classifier>> {
        Ok(Box::new(OnnxClassifier::load(path, role.key(), self.threads)?))
    }

    fn isolation(&self, path: &Path) -> Result<Box<dyn IsolationScorer>> {
        Ok(Box::new(OnnxIsolationForest::load(
            path,
            ModelRole::Isolation.key(),
            self.threads,
        )?))
    }

    fn reconstructor(&self, path: &Path) -> Result<Box<dyn Reconstructor>> {
        Ok(Box::new(OnnxAutoencoder::load(
            path,
            ModelRole::Autoencoder.key(),
            self.threads,
        )?))
    }

    fn scaler(&self, _role: ModelRole, path: &Path) -> Result<Box<dyn Scaler>> {
        Ok(Box::new(FittedScaler::from_path(path)?))
    }
}

/// Loads complete ensembles per domain.
pub struct EnsembleLoader<F = OnnxArtifacts> {
    paths: ModelPaths,
    factory: F,
}

impl EnsembleLoader<OnnxArtifacts> {
    pub fn new(paths: ModelPaths, onnx_threads: usize) -> Self {
        Self::with_factory(paths, OnnxArtifacts::with_threads(onnx_threads))
    }
}

impl<F: ArtifactFactory> EnsembleLoader<F> {
    pub fn with_factory(paths: ModelPaths, factory: F) -> Self {
        Self { paths, factory }
    }

    /// Resolve a domain's artifacts and confirm every file exists.
    pub fn resolve(&self, domain: Domain) -> Result<ArtifactPaths> {
        let resolved = self.paths.for_domain(domain)?;

        let missing = resolved.missing();
        if !missing.is_empty() {
            for path in &missing {
                error!(domain = %domain, path = %path.display(), "Model file not found");
            }
            return Err(PipelineError::MissingArtifacts {
                domain: domain.key().to_string(),
                paths: missing,
            });
        }

        Ok(resolved)
    }

    /// Load the full ensemble for `domain`.
    pub fn load(&self, domain: Domain) -> Result<ModelBundle> {
        let paths = self.resolve(domain)?;
        let f = &self.factory;

        let bundle = ModelBundle {
            domain,
            primary_a: f.classifier(ModelRole::PrimaryA, paths.require(ModelRole::PrimaryA)?)?,
            primary_b: f.classifier(ModelRole::PrimaryB, paths.require(ModelRole::PrimaryB)?)?,
            meta_refiner: f.classifier(
                ModelRole::MetaRefiner,
                paths.require(ModelRole::MetaRefiner)?,
            )?,
            isolation: f.isolation(paths.require(ModelRole::Isolation)?)?,
            autoencoder: f.reconstructor(paths.require(ModelRole::Autoencoder)?)?,
            meta_scaler: f.scaler(ModelRole::MetaScaler, paths.require(ModelRole::MetaScaler)?)?,
            isolation_scaler: f.scaler(
                ModelRole::IsolationScaler,
                paths.require(ModelRole::IsolationScaler)?,
            )?,
            autoencoder_scaler: f.scaler(
                ModelRole::AutoencoderScaler,
                paths.require(ModelRole::AutoencoderScaler)?,
            )?,
        };

        info!(domain = %domain, models = ModelRole::ALL.len(), "Ensemble models loaded");
        Ok(bundle)
    }
}
