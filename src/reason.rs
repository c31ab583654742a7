//! Rule-based explanations for scored records.
//!
//! Each domain has an ordered rule list. A record's explanation is the text
//! of the first [`MAX_CLAUSES`] matching rules joined with [`SEPARATOR`], or a
//! fixed fallback when nothing matches.

use crate::domain::Domain;
use crate::features::coerce;
use crate::features::FeatureFrame;
use crate::types::RawTable;
use std::collections::HashMap;

pub const MAX_CLAUSES: usize = 4;
pub const SEPARATOR: &str = " + ";

pub const UPI_FALLBACK: &str = "Transaction shows irregular account or balance behavior";
pub const CDR_FALLBACK: &str = "Normal call pattern detected";

/// Source of named numeric values for one record.
pub trait FeatureLookup {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl FeatureLookup for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl FeatureLookup for HashMap<&str, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// One row seen through its feature frame first, then its raw cells.
pub struct RecordView<'a> {
    frame: &'a FeatureFrame,
    raw: &'a RawTable,
    row: usize,
}

impl<'a> RecordView<'a> {
    pub fn new(frame: &'a FeatureFrame, raw: &'a RawTable, row: usize) -> Self {
        Self { frame, raw, row }
    }
}

impl FeatureLookup for RecordView<'_> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.frame
            .value(self.row, name)
            .or_else(|| self.raw.cell(self.row, name).and_then(coerce::parse_number))
    }
}

#[derive(Debug, Clone, Copy)]
enum Test {
    Above(f64),
    Below(f64),
    /// `lo < x <= hi`
    Within(f64, f64),
    Flag,
}

impl Test {
    fn matches(&self, x: f64) -> bool {
        match *self {
            Test::Above(t) => x > t,
            Test::Below(t) => x < t,
            Test::Within(lo, hi) => x > lo && x <= hi,
            Test::Flag => x == 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    feature: &'static str,
    test: Test,
    text: &'static str,
}

const fn rule(feature: &'static str, test: Test, text: &'static str) -> Rule {
    Rule { feature, test, text }
}

const UPI_RULES: [Rule; 12] = [
    rule("amount_log", Test::Above(11.5), "Unusually large transaction amount"),
    rule(
        "amount_log",
        Test::Within(10.5, 11.5),
        "Higher-than-average transaction amount",
    ),
    rule("balance_mismatch_orig", Test::Flag, "Mismatch in sender balance update"),
    rule("balance_mismatch_dest", Test::Flag, "Mismatch in receiver balance update"),
    rule(
        "orig_zero_but_amount",
        Test::Flag,
        "Transfer initiated from zero balance account",
    ),
    rule(
        "dest_zero_but_amount",
        Test::Flag,
        "Receiver had zero balance before transfer",
    ),
    rule("sender_tx_count", Test::Above(100.0), "Unusually high sender activity volume"),
    rule(
        "sender_amount_std",
        Test::Above(5e5),
        "High variation in sender’s transaction amounts",
    ),
    rule(
        "relative_amount_to_mean_sender",
        Test::Above(5.0),
        "Amount deviates sharply from sender’s usual pattern",
    ),
    rule("balance_gap_ratio", Test::Above(0.8), "Large balance fluctuation detected"),
    rule(
        "is_same_sender_receiver",
        Test::Flag,
        "Sender and receiver accounts are identical",
    ),
    rule("is_large_transfer", Test::Flag, "Marked as large-value transfer"),
];

const CDR_RULES: [Rule; 7] = [
    rule("call_duration", Test::Below(5.0), "Very short call duration pattern"),
    rule(
        "tower_switch_rate",
        Test::Above(0.6),
        "High tower switching frequency detected",
    ),
    rule(
        "repeated_short_calls_last_1h",
        Test::Above(3.0),
        "Repeated short-duration calls within an hour",
    ),
    rule(
        "distinct_callees_last_24h",
        Test::Above(50.0),
        "Abnormally high number of distinct callees",
    ),
    rule("is_international", Test::Flag, "International call detected"),
    rule("call_cost", Test::Above(200.0), "High call cost relative to duration"),
    rule(
        "tower_switch_rate",
        Test::Above(0.9),
        "Extreme cell tower switching, potential SIM-box activity",
    ),
];

/// Produces explanations for one domain.
#[derive(Debug, Clone, Copy)]
pub struct ReasonGenerator {
    domain: Domain,
}

impl ReasonGenerator {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }

    fn rules(&self) -> &'static [Rule] {
        match self.domain {
            Domain::Upi => &UPI_RULES,
            Domain::Cdr => &CDR_RULES,
        }
    }

    pub fn fallback(&self) -> &'static str {
        match self.domain {
            Domain::Upi => UPI_FALLBACK,
            Domain::Cdr => CDR_FALLBACK,
        }
    }

    /// Explain one record. Absent values read as 0.
    pub fn explain(&self, record: &dyn FeatureLookup) -> String {
        let clauses: Vec<&str> = self
            .rules()
            .iter()
            .filter(|r| r.test.matches(record.lookup(r.feature).unwrap_or(0.0)))
            .map(|r| r.text)
            .take(MAX_CLAUSES)
            .collect();

        if clauses.is_empty() {
            self.fallback().to_string()
        } else {
            clauses.join(SEPARATOR)
        }
    }

    /// Explain every row of a batch.
    pub fn explain_batch(&self, frame: &FeatureFrame, raw: &RawTable) -> Vec<String> {
        (0..frame.len())
            .map(|row| self.explain(&RecordView::new(frame, raw, row)))
            .collect()
    }
}
