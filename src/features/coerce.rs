//! The one place raw cells become numbers or category text.
//!
//! Bad data never fails a batch: unparseable cells become `NaN` (or a
//! caller-supplied default) and the reconstructors zero-fill whatever is left
//! before the frame reaches a model.

use crate::types::RawTable;

/// Parse a single cell. Empty or non-numeric cells yield `None`.
///
/// `true`/`false` (any case) map to `1.0`/`0.0`, matching how boolean flag
/// columns are exported by the upstream tooling.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    cell.parse::<f64>().ok()
}

/// Numeric view of a column, `NaN` where a cell does not parse.
/// `None` when the column is absent.
pub fn numeric_column(table: &RawTable, name: &str) -> Option<Vec<f64>> {
    table.column(name).map(|cells| {
        cells
            .into_iter()
            .map(|c| parse_number(c).unwrap_or(f64::NAN))
            .collect()
    })
}

/// Numeric view of a column with `default` substituted for a missing column
/// and for every cell that is empty, non-numeric or non-finite.
pub fn numeric_or(table: &RawTable, name: &str, default: f64) -> Vec<f64> {
    match numeric_column(table, name) {
        Some(values) => values.into_iter().map(|v| finite_or(v, default)).collect(),
        None => vec![default; table.len()],
    }
}

/// Category text: trimmed and lower-cased. `None` when the column is absent.
pub fn category_column(table: &RawTable, name: &str) -> Option<Vec<String>> {
    table.column(name).map(|cells| {
        cells
            .into_iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect()
    })
}

pub fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("True"), Some(1.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_numeric_column_marks_bad_cells() {
        let table = RawTable::from_rows(&["x"], &[vec!["1"], vec!["oops"]]);
        let values = numeric_column(&table, "x").unwrap();

        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
        assert!(numeric_column(&table, "y").is_none());
    }

    #[test]
    fn test_numeric_or_defaults() {
        let table = RawTable::from_rows(&["x"], &[vec!["inf"], vec!["2"], vec![""]]);

        assert_eq!(numeric_or(&table, "x", 0.0), vec![0.0, 2.0, 0.0]);
        assert_eq!(numeric_or(&table, "missing", 7.0), vec![7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_category_column_normalizes_text() {
        let table = RawTable::from_rows(&["call_type"], &[vec![" VoIP "], vec!["Voice"]]);
        assert_eq!(
            category_column(&table, "call_type").unwrap(),
            vec!["voip".to_string(), "voice".to_string()]
        );
    }
}
