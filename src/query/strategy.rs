//! Scan strategies
//!
//! ## Direct scan
//! ```text
//! base table ──scan(start, stop, filter)──► rows
//! ```
//!
//! ## Index scan
//! ```text
//! index table ──scan(start, stop, filter)──► index rows
//!      │
//!      └─ __idx__:row ──get──► base table ──► rows
//! ```
//! One base fetch per index row, pulled as the stream is consumed. Index
//! rows without a back-reference, and back-references to rows that no
//! longer exist, are skipped.
//!
//! The index handle is released once the index scan is open, and the base
//! handle is held only for the duration of each fetch, so an index scan
//! never holds one pooled handle while waiting on another. The page limit
//! counts resolved base rows.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::{ColmapError, Result};
use crate::index::{INDEX_FAMILY, INDEX_ROW_QUALIFIER};
use crate::store::{PooledTable, Row, RowIter, ScanSpec, TablePool};

/// Which strategy a plan chose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Direct,
    Index,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Direct => write!(f, "direct"),
            StrategyKind::Index => write!(f, "index"),
        }
    }
}

/// A planned scan, ready to open
pub trait QueryStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Table the scan runs against
    fn table(&self) -> &str;

    /// First key the scan visits; `None` is the minimum key
    fn start_key(&self) -> Option<&Bytes>;

    /// Acquire handles and open the scan
    ///
    /// Handles the stream needs across pulls are held by it and released
    /// when it drops.
    fn open(&self, pool: &Arc<TablePool>) -> Result<RowStream>;
}

/// Scan of the primary table
#[derive(Debug, Clone)]
pub struct DirectScan {
    table: String,
    spec: ScanSpec,
}

impl DirectScan {
    pub fn new(table: impl Into<String>, spec: ScanSpec) -> Self {
        Self {
            table: table.into(),
            spec,
        }
    }
}

impl QueryStrategy for DirectScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn start_key(&self) -> Option<&Bytes> {
        self.spec.start.as_ref()
    }

    fn open(&self, pool: &Arc<TablePool>) -> Result<RowStream> {
        let table = pool.acquire(&self.table).map_err(ColmapError::into_query)?;
        let rows = table
            .scan(self.spec.clone())
            .map_err(ColmapError::into_query)?;
        Ok(RowStream::new(rows, vec![table]))
    }
}

/// Scan of an index table joined back to the primary table
///
/// Base rows are returned as stored and are not checked against the
/// criteria again. After an update changes an indexed value, the index row
/// left behind for the old value still resolves to the current base row,
/// which may no longer match.
#[derive(Debug, Clone)]
pub struct IndexScan {
    index_table: String,
    base_table: String,
    spec: ScanSpec,

    /// Most base rows to return
    limit: Option<usize>,
}

impl IndexScan {
    pub fn new(
        index_table: impl Into<String>,
        base_table: impl Into<String>,
        spec: ScanSpec,
        limit: Option<usize>,
    ) -> Self {
        Self {
            index_table: index_table.into(),
            base_table: base_table.into(),
            spec,
            limit,
        }
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl QueryStrategy for IndexScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Index
    }

    fn table(&self) -> &str {
        &self.index_table
    }

    fn start_key(&self) -> Option<&Bytes> {
        self.spec.start.as_ref()
    }

    fn open(&self, pool: &Arc<TablePool>) -> Result<RowStream> {
        let index = pool
            .acquire(&self.index_table)
            .map_err(ColmapError::into_query)?;
        let index_rows = index
            .scan(self.spec.clone())
            .map_err(ColmapError::into_query)?;
        drop(index);

        let rows = IndexedRows {
            index_rows,
            pool: Arc::clone(pool),
            base_table: self.base_table.clone(),
            limit: self.limit,
            resolved: 0,
            skipped: 0,
        };
        Ok(RowStream::new(Box::new(rows), Vec::new()))
    }
}

/// Resolves index rows to their base rows
struct IndexedRows {
    index_rows: RowIter,
    pool: Arc<TablePool>,
    base_table: String,
    limit: Option<usize>,
    resolved: usize,
    skipped: usize,
}

impl IndexedRows {
    fn fetch(&self, row_key: &[u8]) -> Result<Option<Row>> {
        let base = self.pool.acquire(&self.base_table)?;
        let row = base.get(row_key)?;
        Ok(row)
    }
}

impl Iterator for IndexedRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.resolved >= limit) {
            return None;
        }

        loop {
            let index_row = match self.index_rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };

            let back_ref = match index_row.value(INDEX_FAMILY, INDEX_ROW_QUALIFIER) {
                Some(key) if !key.is_empty() => key,
                _ => {
                    self.skipped += 1;
                    debug!(index_key = ?index_row.key, "Index row has no back-reference");
                    continue;
                }
            };

            match self.fetch(back_ref) {
                Ok(Some(row)) => {
                    self.resolved += 1;
                    return Some(Ok(row));
                }
                Ok(None) => {
                    self.skipped += 1;
                    debug!(row_key = ?back_ref, "Indexed row no longer exists");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Drop for IndexedRows {
    fn drop(&mut self) {
        if self.skipped > 0 {
            debug!(
                table = %self.base_table,
                skipped = self.skipped,
                "Skipped stale index rows"
            );
        }
    }
}

/// Rows of an open scan
///
/// Holds the table handles the scan keeps across pulls; dropping the
/// stream releases them. Store failures surface as [`ColmapError::Query`].
pub struct RowStream {
    rows: RowIter,
    processed: usize,
    _tables: Vec<PooledTable>,
}

impl RowStream {
    pub fn new(rows: RowIter, tables: Vec<PooledTable>) -> Self {
        Self {
            rows,
            processed: 0,
            _tables: tables,
        }
    }

    /// Rows yielded so far
    pub fn processed(&self) -> usize {
        self.processed
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.rows.next()?;
        self.processed += 1;
        Some(item.map_err(ColmapError::into_query))
    }
}
