//! Feature scalers exported from training as JSON.
//!
//! ```json
//! {"kind": "standard", "mean": [..], "scale": [..]}
//! {"kind": "min_max", "min": [..], "scale": [..]}
//! ```

use crate::error::{PipelineError, Result};
use crate::models::Scaler;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A fitted scaler's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    /// `(x - mean) / scale`; a zero scale leaves the centred value unscaled.
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`.
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl FittedScaler {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let scaler: FittedScaler =
            serde_json::from_str(&text).map_err(|e| PipelineError::artifact(path, e))?;
        scaler.validate().map_err(|msg| PipelineError::artifact(path, msg))?;
        Ok(scaler)
    }

    pub fn width(&self) -> usize {
        match self {
            FittedScaler::Standard { mean, .. } => mean.len(),
            FittedScaler::MinMax { min, .. } => min.len(),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let (offsets, scale) = match self {
            FittedScaler::Standard { mean, scale } => (mean, scale),
            FittedScaler::MinMax { min, scale } => (min, scale),
        };
        if offsets.is_empty() {
            return Err("scaler has no features".to_string());
        }
        if offsets.len() != scale.len() {
            return Err(format!(
                "parameter lengths differ ({} vs {})",
                offsets.len(),
                scale.len()
            ));
        }
        Ok(())
    }

    fn apply(&self, col: usize, x: f64) -> f64 {
        match self {
            FittedScaler::Standard { mean, scale } => {
                let s = if scale[col] == 0.0 { 1.0 } else { scale[col] };
                (x - mean[col]) / s
            }
            FittedScaler::MinMax { min, scale } => x * scale[col] + min[col],
        }
    }
}

impl Scaler for FittedScaler {
    fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let width = self.width();
        rows.iter()
            .map(|row| {
                if row.len() != width {
                    return Err(PipelineError::inference(
                        "scaler",
                        format!("expected {} features, got {}", width, row.len()),
                    ));
                }
                Ok(row
                    .iter()
                    .enumerate()
                    .map(|(col, &x)| self.apply(col, x))
                    .collect::<Vec<f64>>())
            })
            .collect()
    }
}
