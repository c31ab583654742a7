//! Call-detail record feature reconstruction.
//!
//! CDR exports are noisier than payment data, so nothing here fails: absent
//! or malformed numeric cells fall back to their default and unknown call
//! types encode as all-zero indicators.

use crate::features::coerce;
use crate::features::frame::{FeatureFrame, WorkingColumns};
use crate::features::schema::FeatureSchema;
use crate::types::RawTable;
use std::str::FromStr;
use tracing::debug;

/// Numeric inputs and the value substituted for unusable cells.
pub const NUMERIC_DEFAULTS: [(&str, f64); 7] = [
    ("call_duration", 0.0),
    ("call_cost", 0.0),
    ("cost_per_sec", 0.0),
    ("call_hour", 0.0),
    ("distinct_callees_last_24h", 0.0),
    ("tower_switch_rate", 0.0),
    ("repeated_short_calls_last_1h", 0.0),
];

const MAX_HOUR: f64 = 23.0;

/// CDR call category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    Voip,
    International,
    Roaming,
    Voice,
}

impl CallType {
    pub const ALL: [CallType; 4] = [
        CallType::Voip,
        CallType::International,
        CallType::Roaming,
        CallType::Voice,
    ];

    /// Indicator column, in the casing the models were trained with.
    pub fn feature_name(&self) -> &'static str {
        match self {
            CallType::Voip => "type_VoIP",
            CallType::International => "type_international",
            CallType::Roaming => "type_roaming",
            CallType::Voice => "type_voice",
        }
    }
}

impl FromStr for CallType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voip" => Ok(CallType::Voip),
            "international" => Ok(CallType::International),
            "roaming" => Ok(CallType::Roaming),
            "voice" => Ok(CallType::Voice),
            _ => Err(()),
        }
    }
}

/// Rebuilds the CDR training feature matrix from an arbitrary table.
#[derive(Debug, Clone)]
pub struct CdrFeatureBuilder {
    schema: FeatureSchema,
}

impl CdrFeatureBuilder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn build(&self, table: &RawTable) -> FeatureFrame {
        let mut cols = WorkingColumns::empty(table.len());

        for (name, default) in NUMERIC_DEFAULTS {
            cols.insert(name, coerce::numeric_or(table, name, default));
        }

        if let Some(hours) = cols.get("call_hour") {
            let clamped = hours.iter().map(|h| h.clamp(0.0, MAX_HOUR)).collect();
            cols.insert("call_hour", clamped);
        }

        encode_call_type(&mut cols, table);

        let frame = cols.into_frame(&self.schema);
        debug!(rows = frame.len(), width = frame.width(), "CDR features reconstructed");
        frame
    }
}

/// One-hot encode `call_type`. Without the column, indicator columns already
/// present in the input pass through.
fn encode_call_type(cols: &mut WorkingColumns, table: &RawTable) {
    match coerce::category_column(table, "call_type") {
        Some(cells) => {
            let parsed: Vec<Option<CallType>> = cells.iter().map(|c| c.parse().ok()).collect();
            for kind in CallType::ALL {
                let indicator = parsed
                    .iter()
                    .map(|p| if *p == Some(kind) { 1.0 } else { 0.0 })
                    .collect();
                cols.insert(kind.feature_name(), indicator);
            }
        }
        None => {
            for kind in CallType::ALL {
                let name = kind.feature_name();
                cols.insert(name, coerce::numeric_or(table, name, 0.0));
            }
        }
    }
}
