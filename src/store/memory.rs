//! In-memory store
//!
//! BTreeMap-based tables with RwLock for concurrency.
//!
//! ## Data Structure Choice
//! - Rows: `BTreeMap<Bytes, RowCells>` so range scans walk keys in order
//! - Cells: `BTreeMap<(family, qualifier), (value, timestamp)>`, last write wins
//!
//! ## Scans
//! A scan copies at most `scan_batch_size` rows per read-lock hold and
//! resumes after the last key it returned. Rows are only copied when the
//! consumer asks for them, so a halted or page-limited scan stops copying.
//! - `rows_materialized`: rows copied out of the table
//! - `rows_examined`: rows handed to the scan filter

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::error::{ColmapError, Result};
use crate::query::FilteredRows;

use super::{Cell, Row, RowIter, RowMutation, ScanSpec, Store, Table};

type RowCells = BTreeMap<(String, String), (Bytes, i64)>;
type RowMap = BTreeMap<Bytes, RowCells>;

/// Default rows fetched per scan batch
pub const DEFAULT_SCAN_BATCH: usize = 64;

/// In-memory store holding named tables
pub struct MemStore {
    tables: RwLock<HashMap<String, Arc<MemTable>>>,

    /// Create unknown tables on open instead of failing
    auto_create: bool,

    /// Batch size of tables this store creates
    scan_batch: usize,
}

impl MemStore {
    /// Create an empty store that creates tables on first use
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            auto_create: true,
            scan_batch: DEFAULT_SCAN_BATCH,
        }
    }

    /// Create an empty store following `config.auto_create_tables` and
    /// `config.scan_batch_size`
    pub fn with_config(config: &Config) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            auto_create: config.auto_create_tables,
            scan_batch: config.scan_batch_size,
        }
    }

    /// Create a table (or return the existing one)
    pub fn create_table(&self, name: &str) -> Arc<MemTable> {
        let mut tables = self.tables.write();
        Arc::clone(
            tables
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemTable::with_scan_batch(name, self.scan_batch))),
        )
    }

    /// Look up an existing table
    pub fn table(&self, name: &str) -> Option<Arc<MemTable>> {
        self.tables.read().get(name).cloned()
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    fn open_table(&self, name: &str) -> Result<Arc<dyn Table>> {
        if let Some(table) = self.table(name) {
            let table: Arc<dyn Table> = table;
            return Ok(table);
        }
        if !self.auto_create {
            return Err(ColmapError::Store(format!("Table '{}' does not exist", name)));
        }

        debug!(table = name, "Creating in-memory table");
        let table: Arc<dyn Table> = self.create_table(name);
        Ok(table)
    }
}

/// One in-memory table
pub struct MemTable {
    name: String,

    /// Sorted rows (shared with live scans)
    rows: Arc<RwLock<RowMap>>,

    /// Rows copied per scan batch
    scan_batch: usize,

    /// Rows copied out by scans
    rows_materialized: Arc<AtomicUsize>,

    /// Rows handed to scan filters
    rows_examined: Arc<AtomicUsize>,
}

impl MemTable {
    /// Create a new empty table
    pub fn new(name: &str) -> Self {
        Self::with_scan_batch(name, DEFAULT_SCAN_BATCH)
    }

    /// Create a new empty table whose scans fetch `batch` rows at a time
    pub fn with_scan_batch(name: &str, batch: usize) -> Self {
        Self {
            name: name.to_string(),
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            scan_batch: batch.max(1),
            rows_materialized: Arc::new(AtomicUsize::new(0)),
            rows_examined: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// All row keys in order
    pub fn row_keys(&self) -> Vec<Bytes> {
        self.rows.read().keys().cloned().collect()
    }

    /// Total rows copied out by scans so far
    pub fn rows_materialized(&self) -> usize {
        self.rows_materialized.load(Ordering::SeqCst)
    }

    /// Total rows examined by scan filters so far
    pub fn rows_examined(&self) -> usize {
        self.rows_examined.load(Ordering::SeqCst)
    }

    /// Reset both scan counters
    pub fn reset_scan_counters(&self) {
        self.rows_materialized.store(0, Ordering::SeqCst);
        self.rows_examined.store(0, Ordering::SeqCst);
    }

    fn apply(rows: &mut RowMap, mutation: &RowMutation) {
        let cells = rows.entry(mutation.row_key.clone()).or_default();
        for column in &mutation.columns {
            cells.insert(
                (column.family.clone(), column.qualifier.clone()),
                (column.value.clone(), mutation.timestamp),
            );
        }
    }

    fn to_row(key: &Bytes, cells: &RowCells) -> Row {
        let cells = cells
            .iter()
            .map(|((family, qualifier), (value, timestamp))| Cell {
                family: family.clone(),
                qualifier: qualifier.clone(),
                value: value.clone(),
                timestamp: *timestamp,
            })
            .collect();
        Row::new(key.clone(), cells)
    }
}

impl Table for MemTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, row_key: &[u8]) -> Result<Option<Row>> {
        let rows = self.rows.read();
        Ok(rows
            .get_key_value(row_key)
            .filter(|(_, cells)| !cells.is_empty())
            .map(|(key, cells)| Self::to_row(key, cells)))
    }

    fn put(&self, mutation: &RowMutation) -> Result<()> {
        let mut rows = self.rows.write();
        Self::apply(&mut rows, mutation);
        Ok(())
    }

    fn put_batch(&self, mutations: &[RowMutation]) -> Result<()> {
        let mut rows = self.rows.write();
        for mutation in mutations {
            Self::apply(&mut rows, mutation);
        }
        Ok(())
    }

    fn delete(&self, row_key: &[u8]) -> Result<()> {
        self.rows.write().remove(row_key);
        Ok(())
    }

    fn scan(&self, spec: ScanSpec) -> Result<RowIter> {
        let next_start = match spec.start {
            Some(start) => Bound::Included(start),
            None => Bound::Unbounded,
        };

        let rows = BatchedScan {
            rows: Arc::clone(&self.rows),
            next_start,
            stop: spec.stop,
            batch: self.scan_batch,
            buffer: VecDeque::new(),
            finished: false,
            materialized: Arc::clone(&self.rows_materialized),
            examined: Arc::clone(&self.rows_examined),
        };

        Ok(Box::new(FilteredRows::new(rows, spec.filter)))
    }
}

/// Lazy range scan over a [`MemTable`], one batch per read-lock hold
struct BatchedScan {
    rows: Arc<RwLock<RowMap>>,
    next_start: Bound<Bytes>,
    stop: Option<Bytes>,
    batch: usize,
    buffer: VecDeque<Row>,
    finished: bool,
    materialized: Arc<AtomicUsize>,
    examined: Arc<AtomicUsize>,
}

impl BatchedScan {
    fn fill(&mut self) {
        // BTreeMap::range panics on an inverted range
        if let (Bound::Included(start) | Bound::Excluded(start), Some(stop)) =
            (&self.next_start, &self.stop)
        {
            if start >= stop {
                self.finished = true;
                return;
            }
        }
        let upper = match &self.stop {
            Some(stop) => Bound::Excluded(stop.clone()),
            None => Bound::Unbounded,
        };

        let rows = self.rows.read();
        let batch: Vec<Row> = rows
            .range::<Bytes, _>((self.next_start.clone(), upper))
            .filter(|(_, cells)| !cells.is_empty())
            .take(self.batch)
            .map(|(key, cells)| MemTable::to_row(key, cells))
            .collect();
        drop(rows);

        if batch.len() < self.batch {
            self.finished = true;
        }
        if let Some(last) = batch.last() {
            self.next_start = Bound::Excluded(last.key.clone());
        }
        self.materialized.fetch_add(batch.len(), Ordering::SeqCst);
        self.buffer.extend(batch);
    }
}

impl Iterator for BatchedScan {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.finished {
            self.fill();
        }
        let row = self.buffer.pop_front()?;
        self.examined.fetch_add(1, Ordering::SeqCst);
        Some(Ok(row))
    }
}
