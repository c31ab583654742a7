//! ONNX Runtime backed artifacts.

use crate::error::{PipelineError, Result};
use crate::models::{Classifier, IsolationScorer, Reconstructor};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Loaded ONNX session with resolved input/output names.
pub struct OnnxModel {
    /// Model name
    name: String,
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Load a model. The output used is chosen by [`select_output`].
    pub fn load(path: &Path, name: &str, threads: usize, output_hints: &[&str]) -> Result<Self> {
        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = open_session(path, threads)
            .map_err(|e| PipelineError::artifact(path, format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let output_name = select_output(&names, output_hints)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::artifact(path, "model declares no outputs"))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a `[rows, width]` batch and hand the selected output to `extract`.
    fn run<T>(
        &self,
        rows: &[Vec<f64>],
        extract: impl FnOnce(&DynValue) -> Result<T>,
    ) -> Result<T> {
        let width = rows.first().map_or(0, Vec::len);
        let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let shape = vec![rows.len() as i64, width as i64];

        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| PipelineError::inference(&self.name, e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::inference(&self.name, e))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PipelineError::inference(&self.name, e))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PipelineError::inference(&self.name, format!("missing output {}", self.output_name))
        })?;

        let extracted = extract(output)?;
        debug!(model = %self.name, output = %self.output_name, "ONNX batch complete");
        Ok(extracted)
    }

    /// Run a batch whose selected output is an `f32` tensor.
    fn run_tensor(&self, rows: &[Vec<f64>]) -> Result<(Vec<i64>, Vec<f32>)> {
        self.run(rows, |output| {
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| PipelineError::inference(&self.name, e))?;
            Ok((shape.iter().copied().collect(), data.to_vec()))
        })
    }
}

/// Pick the output to read: the first whose name contains one of `hints`,
/// else the last one. Outputs named `*label*` are passed over while any
/// other output exists.
pub(crate) fn select_output<'a>(names: &[&'a str], hints: &[&str]) -> Option<&'a str> {
    let mut candidates = names.iter().copied().filter(|n| !n.contains("label"));
    candidates
        .clone()
        .find(|n| hints.iter().any(|hint| n.contains(hint)))
        .or_else(|| candidates.next_back())
        .or_else(|| names.last().copied())
}

fn open_session(path: &Path, threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads)?
        .commit_from_file(path)?;
    Ok(session)
}

/// Classifier exported with either a probability tensor (`[n, 2]`, `[n, 1]`,
/// `[n]`) or a ZipMap `seq(map(int64, float))` output.
pub struct OnnxClassifier(OnnxModel);

impl OnnxClassifier {
    pub fn load(path: &Path, name: &str, threads: usize) -> Result<Self> {
        OnnxModel::load(path, name, threads, &["prob", "output"]).map(Self)
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let name = self.0.name();
        let n = rows.len();

        self.0.run(rows, |output| {
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                return fraud_class_probabilities(&dims, data, n)
                    .ok_or_else(|| unexpected_shape(name, &dims));
            }

            let dtype = output.dtype();
            if DynSequenceValueType::can_downcast(&dtype) {
                let probs = probabilities_from_sequence_map(output)
                    .map_err(|e| PipelineError::inference(name, format!("{:#}", e)))?;
                if probs.len() != n {
                    return Err(PipelineError::inference(
                        name,
                        format!("expected {} probability maps, got {}", n, probs.len()),
                    ));
                }
                return Ok(probs);
            }

            Err(PipelineError::inference(
                name,
                "output is neither a float tensor nor seq(map(int64, float))",
            ))
        })
    }
}

/// One fraud probability per `map(int64, float)` in a ZipMap sequence.
fn probabilities_from_sequence_map(output: &DynValue) -> anyhow::Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    maps.iter()
        .enumerate()
        .map(|(row, map)| {
            let pairs = map.try_extract_key_values::<i64, f32>()?;
            fraud_probability_from_pairs(&pairs)
                .ok_or_else(|| anyhow::anyhow!("no class 0 or 1 probability in row {}", row))
        })
        .collect()
}

/// Class 1 probability from a class-to-probability map, or `1 - p(0)` when
/// only class 0 is present.
fn fraud_probability_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    let class = |id: i64| pairs.iter().find(|(c, _)| *c == id).map(|(_, p)| f64::from(*p));
    class(1).or_else(|| class(0).map(|p| 1.0 - p))
}

/// Isolation forest whose `scores` output follows `score_samples`.
pub struct OnnxIsolationForest(OnnxModel);

impl OnnxIsolationForest {
    pub fn load(path: &Path, name: &str, threads: usize) -> Result<Self> {
        OnnxModel::load(path, name, threads, &["score"]).map(Self)
    }
}

impl IsolationScorer for OnnxIsolationForest {
    fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let (dims, data) = self.0.run_tensor(rows)?;
        if data.len() != rows.len() {
            return Err(unexpected_shape(self.0.name(), &dims));
        }
        Ok(data.into_iter().map(f64::from).collect())
    }
}

/// Autoencoder emitting a reconstruction with the input's shape.
pub struct OnnxAutoencoder(OnnxModel);

impl OnnxAutoencoder {
    pub fn load(path: &Path, name: &str, threads: usize) -> Result<Self> {
        OnnxModel::load(path, name, threads, &[]).map(Self)
    }
}

impl Reconstructor for OnnxAutoencoder {
    fn reconstruct(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let width = rows[0].len();
        let (dims, data) = self.0.run_tensor(rows)?;
        if width == 0 || data.len() != rows.len() * width {
            return Err(unexpected_shape(self.0.name(), &dims));
        }
        Ok(data
            .chunks(width)
            .map(|chunk| chunk.iter().map(|&v| f64::from(v)).collect::<Vec<f64>>())
            .collect())
    }
}

/// Per-row fraud probability from a `[n, classes]` or `[n]` tensor.
fn fraud_class_probabilities(dims: &[i64], data: &[f32], rows: usize) -> Option<Vec<f64>> {
    let classes = match dims {
        [n, k] if *n as usize == rows && *k >= 1 => *k as usize,
        [n] if *n as usize == rows => 1,
        _ => return None,
    };
    if data.len() != rows * classes {
        return None;
    }

    // Two or more classes: the fraud class is index 1
    let column = if classes >= 2 { 1 } else { 0 };
    Some(
        data.chunks(classes)
            .map(|row| f64::from(row[column]))
            .collect(),
    )
}

fn unexpected_shape(model: &str, dims: &[i64]) -> PipelineError {
    PipelineError::inference(model, format!("unexpected output shape {:?}", dims))
}
