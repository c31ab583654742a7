//! Canonical feature order per domain.
//!
//! Both domains resolve their column order from an explicit ordered list
//! loaded once when the pipeline starts. The order file is mandatory: there
//! is no safe fallback for the UPI order.

use crate::domain::Domain;
use crate::error::{PipelineError, Result};
use config::{Config, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Column order the CDR models were trained on.
pub const CDR_FEATURES: [&str; 11] = [
    "call_duration",
    "call_cost",
    "cost_per_sec",
    "call_hour",
    "distinct_callees_last_24h",
    "tower_switch_rate",
    "repeated_short_calls_last_1h",
    "type_VoIP",
    "type_international",
    "type_roaming",
    "type_voice",
];

/// Ordered, duplicate-free list of feature names.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Arc<[String]>,
    positions: Arc<HashMap<String, usize>>,
}

impl FeatureSchema {
    /// Build a schema. Empty lists and duplicate names are configuration errors.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PipelineError::Configuration(
                "feature schema is empty".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(PipelineError::Configuration(format!(
                    "duplicate feature '{}' in schema",
                    name
                )));
            }
        }

        Ok(Self {
            names: names.into(),
            positions: Arc::new(positions),
        })
    }

    /// Built-in CDR order, used when the order file has no `cdr_features`.
    pub fn cdr_default() -> Self {
        Self::new(CDR_FEATURES).expect("built-in CDR schema is valid")
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

#[derive(Debug, Deserialize)]
struct FeatureOrderFile {
    upi_features: Vec<String>,
    #[serde(default)]
    cdr_features: Option<Vec<String>>,
}

/// Canonical schemas for both domains.
#[derive(Debug, Clone)]
pub struct FeatureSchemas {
    pub upi: FeatureSchema,
    pub cdr: FeatureSchema,
}

impl FeatureSchemas {
    /// Load the feature order file (YAML, TOML or JSON by extension).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::Configuration(format!(
                "feature order file not found at {}",
                path.display()
            )));
        }

        let file: FeatureOrderFile = Config::builder()
            .add_source(File::from(path))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                PipelineError::Configuration(format!(
                    "failed to read feature order from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let upi = FeatureSchema::new(file.upi_features)?;
        let cdr = match file.cdr_features {
            Some(names) => FeatureSchema::new(names)?,
            None => FeatureSchema::cdr_default(),
        };

        info!(
            path = %path.display(),
            upi_features = upi.len(),
            cdr_features = cdr.len(),
            "Feature schemas loaded"
        );

        Ok(Self { upi, cdr })
    }

    pub fn for_domain(&self, domain: Domain) -> &FeatureSchema {
        match domain {
            Domain::Upi => &self.upi,
            Domain::Cdr => &self.cdr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = FeatureSchema::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_schema_positions() {
        let schema = FeatureSchema::new(["x", "y", "z"]).unwrap();
        assert_eq!(schema.index_of("z"), Some(2));
        assert_eq!(schema.index_of("w"), None);
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_cdr_default_width() {
        let schema = FeatureSchema::cdr_default();
        assert_eq!(schema.len(), 11);
        assert_eq!(schema.names()[7], "type_VoIP");
    }

    #[test]
    fn test_load_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeatureSchemas::load(dir.path().join("feature_order.yaml")).unwrap_err();

        match err {
            PipelineError::Configuration(message) => {
                assert!(message.contains("feature_order.yaml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_yaml_without_cdr_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature_order.yaml");
        fs::write(&path, "upi_features:\n  - amount\n  - amount_log\n").unwrap();

        let schemas = FeatureSchemas::load(&path).unwrap();
        assert_eq!(schemas.upi.names(), &["amount".to_string(), "amount_log".to_string()]);
        assert_eq!(schemas.cdr, FeatureSchema::cdr_default());
    }
}
