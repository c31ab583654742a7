//! UPI transaction feature reconstruction.
//!
//! Accepts raw PaySim-style exports as well as tables that were already
//! engineered upstream. Derived columns are only produced when every input
//! they need is present; anything the schema still expects afterwards is
//! zero-filled.

use crate::features::frame::{FeatureFrame, WorkingColumns};
use crate::features::schema::FeatureSchema;
use crate::types::RawTable;
use std::str::FromStr;
use tracing::debug;

/// Ground-truth columns that must never reach a model.
pub const LABEL_COLUMNS: [&str; 2] = ["isFraud", "isFlaggedFraud"];

/// Identifier and categorical columns with no use after encoding.
pub const DROPPED_COLUMNS: [&str; 4] = ["step", "nameOrig", "nameDest", "type"];

/// Engineered features the models were trained with that need sender and
/// receiver history this pipeline does not have. Neutral 0.0 unless supplied.
pub const PLACEHOLDER_FEATURES: [&str; 25] = [
    "sender_amount_mean",
    "sender_amount_std",
    "sender_amount_max",
    "sender_tx_count",
    "sender_balance_mismatch_ratio",
    "sender_zero_but_ratio",
    "dest_amount_mean",
    "dest_amount_std",
    "dest_tx_count",
    "dest_zero_but_ratio",
    "tx_per_step_orig",
    "amount_per_step_orig",
    "avg_amount_per_step_orig",
    "balance_gap_ratio",
    "relative_amount_to_mean_sender",
    "amount_to_balance_orig_ratio",
    "amount_balance_gap",
    "is_large_transfer",
    "is_same_sender_receiver",
    "is_merchant_dest",
    "is_customer_dest",
    "amount_to_sender_mean_ratio",
    "amount_to_balance_gap_ratio",
    "sender_activity_intensity",
    "type_encoded",
];

const RATIO_EPSILON: f64 = 1e-9;
const MISMATCH_TOLERANCE: f64 = 1e-9;

/// UPI transaction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    CashIn,
    CashOut,
    Debit,
    Payment,
    Transfer,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::CashIn,
        TransactionType::CashOut,
        TransactionType::Debit,
        TransactionType::Payment,
        TransactionType::Transfer,
    ];

    /// Indicator column this category switches on.
    pub fn feature_name(&self) -> &'static str {
        match self {
            TransactionType::CashIn => "type_CASH_IN",
            TransactionType::CashOut => "type_CASH_OUT",
            TransactionType::Debit => "type_DEBIT",
            TransactionType::Payment => "type_PAYMENT",
            TransactionType::Transfer => "type_TRANSFER",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH_IN" => Ok(TransactionType::CashIn),
            "CASH_OUT" => Ok(TransactionType::CashOut),
            "DEBIT" => Ok(TransactionType::Debit),
            "PAYMENT" => Ok(TransactionType::Payment),
            "TRANSFER" => Ok(TransactionType::Transfer),
            _ => Err(()),
        }
    }
}

/// Rebuilds the UPI training feature matrix from an arbitrary table.
#[derive(Debug, Clone)]
pub struct UpiFeatureBuilder {
    schema: FeatureSchema,
}

impl UpiFeatureBuilder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn build(&self, table: &RawTable) -> FeatureFrame {
        let mut cols = WorkingColumns::from_table(table, &LABEL_COLUMNS);

        derive_cross_features(&mut cols);
        encode_transaction_type(&mut cols, table);

        for name in PLACEHOLDER_FEATURES {
            cols.fill_missing(name, 0.0);
        }
        for name in DROPPED_COLUMNS {
            cols.remove(name);
        }

        let frame = cols.into_frame(&self.schema);
        debug!(rows = frame.len(), width = frame.width(), "UPI features reconstructed");
        frame
    }
}

fn derive_cross_features(cols: &mut WorkingColumns) {
    if let Some(amount) = cols.get("amount") {
        let amount_log = amount.iter().map(|a| a.ln_1p()).collect();
        cols.insert("amount_log", amount_log);
    }

    derive(cols, "orig_balance_change", ["oldbalanceOrg", "newbalanceOrig"], |v| {
        v[0] - v[1]
    });
    derive(cols, "dest_balance_change", ["newbalanceDest", "oldbalanceDest"], |v| {
        v[0] - v[1]
    });
    derive(cols, "balance_mismatch_orig", ["orig_balance_change", "amount"], |v| {
        flag((v[0] - v[1]).abs() > MISMATCH_TOLERANCE)
    });
    derive(cols, "balance_mismatch_dest", ["dest_balance_change", "amount"], |v| {
        flag((v[0] - v[1]).abs() > MISMATCH_TOLERANCE)
    });
    derive(cols, "orig_zero_but_amount", ["oldbalanceOrg", "amount"], |v| {
        flag(v[0] == 0.0 && v[1] > 0.0)
    });
    derive(cols, "dest_zero_but_amount", ["oldbalanceDest", "amount"], |v| {
        flag(v[0] == 0.0 && v[1] > 0.0)
    });
    derive(cols, "orig_balance_ratio", ["newbalanceOrig", "oldbalanceOrg"], |v| {
        v[0] / (v[1] + RATIO_EPSILON)
    });
    derive(cols, "dest_balance_ratio", ["newbalanceDest", "oldbalanceDest"], |v| {
        v[0] / (v[1] + RATIO_EPSILON)
    });
}

/// Compute `target` row by row when both inputs exist.
fn derive<F>(cols: &mut WorkingColumns, target: &str, inputs: [&str; 2], f: F)
where
    F: Fn([f64; 2]) -> f64,
{
    let (Some(a), Some(b)) = (cols.get(inputs[0]), cols.get(inputs[1])) else {
        return;
    };
    let values = a.iter().zip(b).map(|(&x, &y)| f([x, y])).collect();
    cols.insert(target, values);
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// One-hot encode the `type` column. Without one, indicator columns already
/// in the input pass through and the rest are zero.
fn encode_transaction_type(cols: &mut WorkingColumns, table: &RawTable) {
    match table.column("type") {
        Some(cells) => {
            let parsed: Vec<Option<TransactionType>> =
                cells.iter().map(|c| c.parse().ok()).collect();
            for kind in TransactionType::ALL {
                let indicator = parsed.iter().map(|p| flag(*p == Some(kind))).collect();
                cols.insert(kind.feature_name(), indicator);
            }
        }
        None => {
            for kind in TransactionType::ALL {
                cols.fill_missing(kind.feature_name(), 0.0);
            }
        }
    }
}
