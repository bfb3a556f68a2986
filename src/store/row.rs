//! Row, cell and mutation types

use bytes::Bytes;

/// A stored cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub family: String,
    pub qualifier: String,
    pub value: Bytes,
    /// Write time (unix millis)
    pub timestamp: i64,
}

/// A fetched row: its key plus every cell, ordered by (family, qualifier)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub key: Bytes,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(key: impl Into<Bytes>, cells: Vec<Cell>) -> Self {
        Self {
            key: key.into(),
            cells,
        }
    }

    /// Value of the cell at (family, qualifier), if present
    pub fn value(&self, family: &str, qualifier: &str) -> Option<&Bytes> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| &c.value)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// One cell to write
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWrite {
    pub family: String,
    pub qualifier: String,
    pub value: Bytes,
}

/// Cells to write for one row
///
/// The timestamp is applied to every cell so primary and index writes for
/// the same save carry the same time.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMutation {
    pub row_key: Bytes,
    pub columns: Vec<ColumnWrite>,
    /// Write time (unix millis)
    pub timestamp: i64,
}

impl RowMutation {
    pub fn new(row_key: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            row_key: row_key.into(),
            columns: Vec::new(),
            timestamp,
        }
    }

    /// Append a cell write
    pub fn add(
        &mut self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Bytes>,
    ) -> &mut Self {
        self.columns.push(ColumnWrite {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        });
        self
    }

    /// Value written to (family, qualifier), if any
    pub fn value(&self, family: &str, qualifier: &str) -> Option<&Bytes> {
        self.columns
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| &c.value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
