//! End-to-end batch scoring: raw table in, augmented table out.

use crate::config::AppConfig;
use crate::diagnostics::ThresholdLog;
use crate::domain::Domain;
use crate::error::Result;
use crate::features::{FeatureReconstructor, FeatureSchemas};
use crate::models::{
    AnomalyScores, ArtifactFactory, EnsembleLoader, ModelBundle, ModelPaths, OnnxArtifacts,
    Scorer, SupervisedScores,
};
use crate::reason::ReasonGenerator;
use crate::risk::{BucketAssignment, RiskBucketer};
use crate::summary::BatchSummary;
use crate::types::record::{P_AE, P_FINAL, P_ISO, REASON, RISK_BUCKET};
use crate::types::{RawTable, RiskBucket, ScoredRecord};
use std::collections::HashMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOptions {
    pub normalize: bool,
    pub anomaly: bool,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            anomaly: false,
        }
    }
}

/// A scored batch: the input table plus per-row results.
#[derive(Debug, Clone)]
pub struct ScoredTable {
    pub domain: Domain,
    pub input: RawTable,
    pub supervised: SupervisedScores,
    pub assignment: BucketAssignment,
    pub reasons: Vec<String>,
    pub anomalies: Option<AnomalyScores>,
    pub summary: BatchSummary,
}

impl ScoredTable {
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn p_final(&self) -> &[f64] {
        &self.supervised.p_final
    }

    pub fn buckets(&self) -> &[RiskBucket] {
        &self.assignment.buckets
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn records(&self) -> impl Iterator<Item = ScoredRecord> + '_ {
        (0..self.len()).map(move |i| {
            let record = ScoredRecord::new(
                i,
                self.supervised.p_final[i],
                self.assignment.buckets[i],
                self.reasons[i].clone(),
            );
            match &self.anomalies {
                Some(a) => record.with_anomaly_scores(a.isolation[i], a.reconstruction[i]),
                None => record,
            }
        })
    }

    /// Input columns followed by `p_final`, `risk_bucket` and `reason`, plus
    /// `p_iso` and `p_ae` when anomaly scores were computed.
    pub fn to_output_table(&self) -> RawTable {
        let mut table = self.input.clone();
        table.set_column(P_FINAL, format_column(&self.supervised.p_final));
        table.set_column(
            RISK_BUCKET,
            self.assignment
                .buckets
                .iter()
                .map(|b| b.as_str().to_string())
                .collect(),
        );
        table.set_column(REASON, self.reasons.clone());
        if let Some(a) = &self.anomalies {
            table.set_column(P_ISO, format_column(&a.isolation));
            table.set_column(P_AE, format_column(&a.reconstruction));
        }
        table
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        self.to_output_table().write_csv(BufWriter::new(file))?;
        info!(path = %path.display(), rows = self.len(), "Predictions written");
        Ok(())
    }
}

fn format_column(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Loads schemas once, loads each domain's ensemble on first use and scores
/// batches against it.
pub struct ScoringPipeline<F = OnnxArtifacts> {
    reconstructor: FeatureReconstructor,
    loader: EnsembleLoader<F>,
    scorer: Scorer,
    bundles: HashMap<Domain, Arc<ModelBundle>>,
    threshold_log: Option<ThresholdLog>,
    outputs_dir: PathBuf,
}

impl ScoringPipeline<OnnxArtifacts> {
    /// Build from application configuration. Schema files are read and
    /// validated here; model artifacts are loaded lazily per domain.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_factory(config, OnnxArtifacts::with_threads(config.scoring.onnx_threads))
    }
}

impl<F: ArtifactFactory> ScoringPipeline<F> {
    pub fn with_factory(config: &AppConfig, factory: F) -> Result<Self> {
        let schemas = FeatureSchemas::load(config.paths.feature_order_file())?;
        let model_paths = ModelPaths::load(
            config.paths.model_paths_file(),
            config.paths.project_root.clone(),
        )?;
        let outputs_dir = config.paths.outputs();

        info!(
            project_root = %config.paths.project_root.display(),
            outputs = %outputs_dir.display(),
            "Scoring pipeline initialized"
        );

        Ok(Self {
            reconstructor: FeatureReconstructor::new(schemas),
            loader: EnsembleLoader::with_factory(model_paths, factory),
            scorer: Scorer::new(),
            threshold_log: Some(ThresholdLog::in_dir(&outputs_dir)),
            bundles: HashMap::new(),
            outputs_dir,
        })
    }

    /// Skip writing the threshold diagnostic.
    pub fn without_threshold_log(mut self) -> Self {
        self.threshold_log = None;
        self
    }

    pub fn reconstructor(&self) -> &FeatureReconstructor {
        &self.reconstructor
    }

    pub fn loader(&self) -> &EnsembleLoader<F> {
        &self.loader
    }

    /// Default prediction file for a domain, `<outputs>/<domain>_predictions.csv`.
    pub fn default_output_path(&self, domain: Domain) -> PathBuf {
        self.outputs_dir
            .join(format!("{}_predictions.csv", domain.key()))
    }

    /// The domain's ensemble, loading it on first use.
    pub fn bundle(&mut self, domain: Domain) -> Result<Arc<ModelBundle>> {
        if let Some(bundle) = self.bundles.get(&domain) {
            return Ok(Arc::clone(bundle));
        }
        let bundle = Arc::new(self.loader.load(domain)?);
        self.bundles.insert(domain, Arc::clone(&bundle));
        Ok(bundle)
    }

    pub fn score_table(
        &mut self,
        domain: Domain,
        table: RawTable,
        options: ScoreOptions,
    ) -> Result<ScoredTable> {
        let started = Instant::now();
        let bundle = self.bundle(domain)?;

        info!(domain = %domain, rows = table.len(), "Scoring batch");

        let (frame, supervised) =
            self.scorer
                .predict_supervised(&bundle, &self.reconstructor, &table, options.normalize)?;

        let anomalies = if options.anomaly {
            Some(self.scorer.score_anomalies(&bundle, &frame)?)
        } else {
            None
        };

        let assignment = RiskBucketer::for_domain(domain).apply(&supervised.p_final);
        if let Some(log) = &self.threshold_log {
            log.record(&assignment)?;
        }

        let reasons = ReasonGenerator::new(domain).explain_batch(&frame, &table);

        let summary = BatchSummary::new(
            domain,
            &supervised.p_final,
            &assignment.buckets,
            started.elapsed(),
        )
        .with_model_agreement(&[
            &supervised.primary_a[..],
            &supervised.primary_b[..],
            &supervised.meta[..],
        ]);

        Ok(ScoredTable {
            domain,
            input: table,
            supervised,
            assignment,
            reasons,
            anomalies,
            summary,
        })
    }

    /// Read a CSV file and score it.
    pub fn score_file<P: AsRef<Path>>(
        &mut self,
        domain: Domain,
        input: P,
        options: ScoreOptions,
    ) -> Result<ScoredTable> {
        let table = RawTable::from_path(input)?;
        self.score_table(domain, table, options)
    }
}
