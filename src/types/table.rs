//! Untyped tabular batch as it arrives from an upload.
//!
//! Cells are kept as text. Numeric interpretation happens in
//! `features::coerce`, never here.

use crate::error::Result;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// A batch of raw records: named columns of untyped cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, padding short rows with empty cells and cutting long ones.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Convenience constructor from string slices.
    pub fn from_rows(headers: &[&str], rows: &[Vec<&str>]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Parse a CSV document with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Read a CSV file. Files that are not valid UTF-8 are decoded as Latin-1.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;

        let table = match std::str::from_utf8(&bytes) {
            Ok(text) => Self::from_reader(text.as_bytes())?,
            Err(_) => {
                warn!(path = %path.display(), "Input is not valid UTF-8, decoding as Latin-1");
                let text: String = bytes.iter().map(|&b| b as char).collect();
                Self::from_reader(text.as_bytes())?
            }
        };

        debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "Loaded raw table"
        );
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All cells of a column, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// A single cell, or `None` when the column is absent.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Set a column, replacing an existing one of the same name.
    pub fn set_column(&mut self, name: &str, mut values: Vec<String>) {
        values.resize(self.rows.len(), String::new());

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
