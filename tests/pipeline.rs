//! End-to-end scoring with in-memory models and real scaler files.

use fraud_risk_scoring::config::PathsConfig;
use fraud_risk_scoring::models::{
    ArtifactFactory, Classifier, FittedScaler, IsolationScorer, ModelRole, Reconstructor, Scaler,
};
use fraud_risk_scoring::{
    AppConfig, Domain, FeatureSchemas, ModelPaths, PipelineError, RawTable, RiskBucket,
    ScoreOptions, ScoringPipeline, ThresholdLog,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Probability rises with the number of positive features.
struct Logistic {
    bias: f64,
}

impl Classifier for Logistic {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> fraud_risk_scoring::Result<Vec<f64>> {
        Ok(rows
            .iter()
            .map(|r| {
                let z = self.bias + r.iter().map(|v| v.signum()).sum::<f64>() * 0.3;
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }
}

struct Isolation;

impl IsolationScorer for Isolation {
    fn score_samples(&self, rows: &[Vec<f64>]) -> fraud_risk_scoring::Result<Vec<f64>> {
        Ok(rows.iter().map(|r| -r.iter().map(|v| v.abs()).sum::<f64>()).collect())
    }
}

struct Identity;

impl Reconstructor for Identity {
    fn reconstruct(&self, rows: &[Vec<f64>]) -> fraud_risk_scoring::Result<Vec<Vec<f64>>> {
        Ok(rows.to_vec())
    }
}

/// In-memory models; scalers come from the JSON files on disk.
struct TestArtifacts;

impl ArtifactFactory for TestArtifacts {
    fn classifier(
        &self,
        role: ModelRole,
        _path: &Path,
    ) -> fraud_risk_scoring::Result<Box<dyn Classifier>> {
        let bias = match role {
            ModelRole::PrimaryA => -0.5,
            ModelRole::PrimaryB => 0.0,
            _ => 0.5,
        };
        Ok(Box::new(Logistic { bias }))
    }

    fn isolation(&self, _path: &Path) -> fraud_risk_scoring::Result<Box<dyn IsolationScorer>> {
        Ok(Box::new(Isolation))
    }

    fn reconstructor(&self, _path: &Path) -> fraud_risk_scoring::Result<Box<dyn Reconstructor>> {
        Ok(Box::new(Identity))
    }

    fn scaler(&self, _role: ModelRole, path: &Path) -> fraud_risk_scoring::Result<Box<dyn Scaler>> {
        Ok(Box::new(FittedScaler::from_path(path)?))
    }
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Project tree using the repository's schema and mapping files.
fn project() -> (tempfile::TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let schemas = FeatureSchemas::load(manifest_dir().join("config/feature_order.yaml")).unwrap();
    for domain in Domain::ALL {
        let width = schemas.for_domain(domain).len();
        let models = root.join("models").join(domain.key());
        fs::create_dir_all(&models).unwrap();

        for name in ["xgb.onnx", "rf.onnx", "lr_meta.onnx", "iso.onnx", "ae.onnx"] {
            fs::write(models.join(name), b"").unwrap();
        }
        let standard = serde_json::json!({
            "kind": "standard",
            "mean": vec![0.0; width],
            "scale": vec![1.0; width],
        });
        fs::write(models.join("scaler_lr.json"), standard.to_string()).unwrap();
        let single = serde_json::json!({"kind": "min_max", "min": [0.0], "scale": [1.0]});
        fs::write(models.join("scaler_iso.json"), single.to_string()).unwrap();
        fs::write(models.join("scaler_ae.json"), single.to_string()).unwrap();
    }

    let config = AppConfig {
        paths: PathsConfig {
            project_root: root.to_path_buf(),
            model_paths: manifest_dir().join("config/model_paths.yaml"),
            feature_order: manifest_dir().join("config/feature_order.yaml"),
            outputs_dir: "outputs".into(),
        },
        ..AppConfig::default()
    };
    (dir, config)
}

#[test]
fn shipped_configuration_is_consistent() {
    let schemas = FeatureSchemas::load(manifest_dir().join("config/feature_order.yaml")).unwrap();
    assert_eq!(schemas.cdr.len(), 11);
    assert!(schemas.upi.contains("amount_log"));
    assert!(schemas.upi.contains("type_TRANSFER"));

    let paths = ModelPaths::load(manifest_dir().join("config/model_paths.yaml"), ".").unwrap();
    for domain in Domain::ALL {
        assert_eq!(paths.for_domain(domain).unwrap().iter().count(), 8);
    }

    let config = AppConfig::load_from_path(manifest_dir().join("config/config.toml")).unwrap();
    assert!(config.scoring.normalize);
}

#[test]
fn scores_cdr_csv_end_to_end() {
    let (dir, config) = project();
    let input = dir.path().join("calls.csv");
    fs::write(
        &input,
        "call_id,call_duration,call_cost,call_hour,tower_switch_rate,repeated_short_calls_last_1h,distinct_callees_last_24h,call_type\n\
         a,2,1.5,3,0.95,5,70,VoIP\n\
         b,180,4,14,0.1,0,3,voice\n\
         c,30,250,27,0.7,1,12,international\n",
    )
    .unwrap();

    let mut pipeline = ScoringPipeline::with_factory(&config, TestArtifacts).unwrap();
    let scored = pipeline
        .score_file(
            Domain::Cdr,
            &input,
            ScoreOptions {
                normalize: true,
                anomaly: true,
            },
        )
        .unwrap();

    assert_eq!(scored.len(), 3);
    assert!(scored.p_final().iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(
        scored.reasons()[0],
        "Very short call duration pattern + High tower switching frequency detected + \
         Repeated short-duration calls within an hour + Abnormally high number of distinct callees"
    );
    assert_eq!(scored.reasons()[1], "Normal call pattern detected");
    assert_eq!(
        scored.reasons()[2],
        "High tower switching frequency detected + High call cost relative to duration"
    );

    let output = pipeline.default_output_path(Domain::Cdr);
    scored.write_csv(&output).unwrap();
    let written = RawTable::from_path(&output).unwrap();
    assert_eq!(written.len(), 3);
    for column in ["call_id", "p_final", "risk_bucket", "reason", "p_iso", "p_ae"] {
        assert!(written.has_column(column), "missing {column}");
    }
    assert_eq!(written.cell(2, "call_id"), Some("c"));

    let stored = ThresholdLog::in_dir(config.paths.outputs()).read().unwrap();
    let pair = stored.thresholds["cdr"];
    assert_eq!((pair.medium, pair.high), (0.30, 0.70));
}

#[test]
fn scores_upi_without_normalization() {
    let (_dir, config) = project();
    let table = RawTable::from_rows(
        &[
            "step", "type", "amount", "nameOrig", "oldbalanceOrg", "newbalanceOrig", "nameDest",
            "oldbalanceDest", "newbalanceDest", "isFraud",
        ],
        &[
            vec!["1", "TRANSFER", "181000", "C1", "181000", "0", "C2", "0", "0", "1"],
            vec!["1", "PAYMENT", "9839.64", "C3", "170136", "160296.36", "M4", "0", "0", "0"],
        ],
    );

    let mut pipeline = ScoringPipeline::with_factory(&config, TestArtifacts)
        .unwrap()
        .without_threshold_log();
    let scored = pipeline
        .score_table(
            Domain::Upi,
            table,
            ScoreOptions {
                normalize: false,
                anomaly: false,
            },
        )
        .unwrap();

    // ln(1 + 181000) is above 11.5
    assert!(scored.reasons()[0].starts_with("Unusually large transaction amount"));
    assert!(scored.reasons()[0].contains("Mismatch in receiver balance update"));
    for (i, p) in scored.p_final().iter().enumerate() {
        let s = &scored.supervised;
        let expected = 0.5 * (0.6 * s.primary_a[i] + 0.4 * s.primary_b[i]) + 0.5 * s.meta[i];
        assert!((p - expected).abs() < 1e-9);
    }
    assert!(scored.records().all(|r| r.p_iso.is_none()));
    assert_eq!(scored.buckets().len(), 2);
    assert!(scored.buckets().iter().all(|b| *b <= RiskBucket::High));
    assert!(scored.to_output_table().has_column("isFraud"));
}

#[test]
fn missing_artifact_fails_without_partial_bundle() {
    let (dir, config) = project();
    let absent = dir.path().join("models/upi/ae.onnx");
    fs::remove_file(&absent).unwrap();

    let mut pipeline = ScoringPipeline::with_factory(&config, TestArtifacts).unwrap();
    let err = pipeline
        .score_table(Domain::Upi, RawTable::default(), ScoreOptions::default())
        .unwrap_err();

    match err {
        PipelineError::MissingArtifacts { domain, paths } => {
            assert_eq!(domain, "upi");
            assert_eq!(paths, vec![absent]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // the other domain is unaffected
    assert!(pipeline.bundle(Domain::Cdr).is_ok());
}
