//! Data types shared across the scoring pipeline

pub mod record;
pub mod risk;
pub mod table;

pub use record::ScoredRecord;
pub use risk::{RiskBucket, ThresholdPair};
pub use table::RawTable;
