//! Configuration management for the scoring pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem layout
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Base directory that artifact paths in the model mapping are relative to
    pub project_root: PathBuf,
    /// Model path mapping (YAML), relative to `project_root` unless absolute
    pub model_paths: PathBuf,
    /// Canonical feature order (YAML), relative to `project_root` unless absolute
    pub feature_order: PathBuf,
    /// Where predictions and the threshold diagnostic are written
    pub outputs_dir: PathBuf,
}

impl PathsConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn model_paths_file(&self) -> PathBuf {
        self.resolve(&self.model_paths)
    }

    pub fn feature_order_file(&self) -> PathBuf {
        self.resolve(&self.feature_order)
    }

    pub fn outputs(&self) -> PathBuf {
        self.resolve(&self.outputs_dir)
    }
}

/// Scoring defaults, overridable per run from the CLI
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Min-max normalize `p_final` over each batch
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    /// Also compute isolation and reconstruction anomaly scores
    #[serde(default)]
    pub anomaly: bool,
    /// Intra-op threads per ONNX session
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_normalize() -> bool {
    true
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            normalize: default_normalize(),
            anomaly: false,
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.as_ref().display()))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                project_root: PathBuf::from("."),
                model_paths: PathBuf::from("config/model_paths.yaml"),
                feature_order: PathBuf::from("config/feature_order.yaml"),
                outputs_dir: PathBuf::from("outputs"),
            },
            scoring: ScoringConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.scoring.normalize);
        assert!(!config.scoring.anomaly);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(
            config.paths.model_paths_file(),
            PathBuf::from("./config/model_paths.yaml")
        );
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[paths]
project_root = "/srv/fraud"
model_paths = "config/model_paths.yaml"
feature_order = "/etc/fraud/feature_order.yaml"
outputs_dir = "outputs"

[scoring]
normalize = false
anomaly = true

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert!(!config.scoring.normalize);
        assert!(config.scoring.anomaly);
        assert_eq!(config.scoring.onnx_threads, 1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.paths.feature_order_file(),
            PathBuf::from("/etc/fraud/feature_order.yaml")
        );
        assert_eq!(config.paths.outputs(), PathBuf::from("/srv/fraud/outputs"));
    }

    #[test]
    fn test_sections_other_than_paths_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[paths]\nproject_root = \".\"\nmodel_paths = \"m.yaml\"\nfeature_order = \"f.yaml\"\noutputs_dir = \"out\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert!(config.scoring.normalize);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load_from_path("/nonexistent/config.toml").is_err());
    }
}
