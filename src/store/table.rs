//! Table and store traits
//!
//! Everything the core needs from the underlying store.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::query::ScanFilter;

use super::{Row, RowMutation};

/// Rows produced by a scan, in key order
pub type RowIter = Box<dyn Iterator<Item = Result<Row>> + Send>;

/// Parameters of a range scan
#[derive(Debug, Clone, Default)]
pub struct ScanSpec {
    /// First row key to visit (inclusive); `None` starts at the minimum key
    pub start: Option<Bytes>,

    /// Row key to stop before (exclusive); `None` scans to the end
    pub stop: Option<Bytes>,

    /// Store-side filter (predicate and page limit)
    pub filter: Option<ScanFilter>,
}

impl ScanSpec {
    pub fn from_start(start: Option<Bytes>) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }
}

/// A handle to one table
///
/// Implementations must be safe to share across threads.
pub trait Table: Send + Sync {
    /// Table name
    fn name(&self) -> &str;

    /// Fetch one row; `None` if the row has no cells
    fn get(&self, row_key: &[u8]) -> Result<Option<Row>>;

    /// Apply a single mutation
    fn put(&self, mutation: &RowMutation) -> Result<()>;

    /// Apply many mutations in one call
    fn put_batch(&self, mutations: &[RowMutation]) -> Result<()>;

    /// Remove every cell of a row
    fn delete(&self, row_key: &[u8]) -> Result<()>;

    /// Open a range scan, applying `spec.filter` store-side
    fn scan(&self, spec: ScanSpec) -> Result<RowIter>;
}

/// Source of table handles
pub trait Store: Send + Sync {
    /// Open a handle to the named table
    fn open_table(&self, name: &str) -> Result<Arc<dyn Table>>;
}
