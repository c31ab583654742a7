//! Feature reconstruction: raw tables into the exact matrices the models
//! were trained on.

pub mod cdr;
pub mod coerce;
pub mod frame;
pub mod schema;
pub mod upi;

pub use cdr::{CallType, CdrFeatureBuilder};
pub use frame::FeatureFrame;
pub use schema::{FeatureSchema, FeatureSchemas};
pub use upi::{TransactionType, UpiFeatureBuilder};

use crate::domain::Domain;
use crate::types::RawTable;

/// Dispatches a raw table to the builder for its domain.
#[derive(Debug, Clone)]
pub struct FeatureReconstructor {
    upi: UpiFeatureBuilder,
    cdr: CdrFeatureBuilder,
}

impl FeatureReconstructor {
    pub fn new(schemas: FeatureSchemas) -> Self {
        Self {
            upi: UpiFeatureBuilder::new(schemas.upi),
            cdr: CdrFeatureBuilder::new(schemas.cdr),
        }
    }

    pub fn schema(&self, domain: Domain) -> &FeatureSchema {
        match domain {
            Domain::Upi => self.upi.schema(),
            Domain::Cdr => self.cdr.schema(),
        }
    }

    pub fn reconstruct(&self, domain: Domain, table: &RawTable) -> FeatureFrame {
        match domain {
            Domain::Upi => self.upi.build(table),
            Domain::Cdr => self.cdr.build(table),
        }
    }
}
