use std::io::Read;

use super::super::domain::Mark;
use super::super::errors::ValidationError;

/// Header and cells of an upload, read up front so structural problems surface before any
/// row is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// One data row; `row` is the 1-based position below the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub row: usize,
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

impl MarkTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|header| header.to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            rows.push(TableRow {
                row: index + 1,
                cells: record.iter().map(|cell| cell.to_string()).collect(),
            });
        }

        Ok(Self { headers, rows })
    }
}

/// Empty cells yield `None`, which the evaluator reports as a missing value.
pub(crate) fn parse_cell(
    column: &str,
    raw: &str,
    absence_marker: &str,
) -> Result<Option<Mark>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.eq_ignore_ascii_case(absence_marker) {
        return Ok(Some(Mark::Absent));
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(Mark::Present(value))),
        _ => Err(ValidationError::MalformedCell {
            column: column.to_string(),
            value: trimmed.to_string(),
        }),
    }
}
