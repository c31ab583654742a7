//! Numeric feature matrices.

use crate::error::{PipelineError, Result};
use crate::features::coerce;
use crate::features::schema::FeatureSchema;
use crate::types::RawTable;
use std::collections::HashMap;

/// Row-major feature matrix whose columns are exactly a `FeatureSchema`.
///
/// Every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    schema: FeatureSchema,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    /// Wrap rows that already follow `schema`. Rows of the wrong width are rejected.
    pub fn new(schema: FeatureSchema, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != schema.len()) {
            return Err(PipelineError::Shape {
                row: bad,
                found: rows[bad].len(),
                expected: schema.len(),
            });
        }
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| coerce::finite_or(v, 0.0))
                    .collect::<Vec<f64>>()
            })
            .collect();
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.rows[idx]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.schema.index_of(name)?;
        self.rows.get(row).map(|r| r[col])
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|r| r[col]).collect())
    }

    /// Present the frame as a fresh raw table, e.g. to feed it back through a
    /// reconstructor.
    pub fn to_raw_table(&self) -> RawTable {
        RawTable::new(
            self.schema.names().to_vec(),
            self.rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect::<Vec<String>>())
                .collect(),
        )
    }
}

/// Named numeric columns while a reconstructor is deriving features.
#[derive(Debug, Default)]
pub(crate) struct WorkingColumns {
    len: usize,
    columns: HashMap<String, Vec<f64>>,
}

impl WorkingColumns {
    /// Numeric view of every input column except `skip`.
    pub(crate) fn from_table(table: &RawTable, skip: &[&str]) -> Self {
        let mut columns = HashMap::new();
        for name in table.headers() {
            if skip.contains(&name.as_str()) || columns.contains_key(name) {
                continue;
            }
            if let Some(values) = coerce::numeric_column(table, name) {
                columns.insert(name.clone(), values);
            }
        }
        Self {
            len: table.len(),
            columns,
        }
    }

    /// No columns yet, `len` rows.
    pub(crate) fn empty(len: usize) -> Self {
        Self {
            len,
            columns: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len);
        self.columns.insert(name.to_string(), values);
    }

    /// Add a constant column unless one of that name exists.
    pub(crate) fn fill_missing(&mut self, name: &str, value: f64) {
        let len = self.len;
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| vec![value; len]);
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.columns.remove(name);
    }

    /// Project onto `schema`: unknown columns are dropped, absent ones and
    /// non-finite cells become 0.0.
    pub(crate) fn into_frame(self, schema: &FeatureSchema) -> FeatureFrame {
        let ordered: Vec<Option<&Vec<f64>>> =
            schema.names().iter().map(|n| self.columns.get(n)).collect();

        let rows = (0..self.len)
            .map(|i| {
                ordered
                    .iter()
                    .map(|col| col.map_or(0.0, |values| coerce::finite_or(values[i], 0.0)))
                    .collect::<Vec<f64>>()
            })
            .collect();

        FeatureFrame {
            schema: schema.clone(),
            rows,
        }
    }
}
