//! Extracted table: ordered headers plus rows of raw cell text.

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Result of the extraction step.
///
/// Every row holds exactly one cell per header. The table is never mutated
/// once built; operator corrections live in the row review state instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = ModelError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Table::new(raw.headers, raw.rows)
    }
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ModelError> {
        let expected = headers.len();
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != expected)
        {
            return Err(ModelError::RaggedRow {
                row,
                expected,
                found: cells.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when extraction produced no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
