//! Table Handle Pool
//!
//! Bounded pool of table handles with scoped release.
//!
//! ## Concurrency:
//! - Permits: a bounded crossbeam channel pre-filled with `max_handles` tokens.
//!   Acquiring takes a token, releasing puts it back, so at most
//!   `max_handles` handles are checked out across all tables.
//! - Idle handles: per-table free lists behind a `parking_lot::Mutex`
//! - `PooledTable` returns its handle and permit on drop, on every exit path

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::{ColmapError, Result};

use super::{Store, Table};

/// Bounded pool of table handles over a [`Store`]
pub struct TablePool {
    /// Underlying store that opens new handles
    store: Arc<dyn Store>,

    /// Released handles, keyed by table name
    idle: Mutex<HashMap<String, Vec<Arc<dyn Table>>>>,

    /// Permit tokens (send = release, recv = acquire)
    permits_tx: Sender<()>,
    permits_rx: Receiver<()>,

    /// How long acquire waits for a permit
    acquire_timeout: Duration,

    /// Handles currently checked out
    in_use: AtomicUsize,
}

impl TablePool {
    /// Create a pool bounded by `config.pool_max_handles`
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Result<Arc<Self>> {
        config.validate()?;

        let (permits_tx, permits_rx) = channel::bounded(config.pool_max_handles);
        for _ in 0..config.pool_max_handles {
            permits_tx
                .send(())
                .map_err(|e| ColmapError::Config(format!("Failed to seed pool: {}", e)))?;
        }

        Ok(Arc::new(Self {
            store,
            idle: Mutex::new(HashMap::new()),
            permits_tx,
            permits_rx,
            acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms),
            in_use: AtomicUsize::new(0),
        }))
    }

    /// Check out a handle for `table`
    ///
    /// Blocks up to the configured timeout when the pool is exhausted.
    pub fn acquire(self: &Arc<Self>, table: &str) -> Result<PooledTable> {
        debug!(table, "Getting table from pool");

        // Step 1: Take a permit
        match self.permits_rx.recv_timeout(self.acquire_timeout) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(ColmapError::PoolTimeout {
                    table: table.to_string(),
                    waited_ms: self.acquire_timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ColmapError::Store("Table pool is closed".to_string()))
            }
        }

        // Step 2: Reuse an idle handle or open a new one
        let reused = self.idle.lock().get_mut(table).and_then(|free| free.pop());
        let handle = match reused {
            Some(handle) => handle,
            None => match self.store.open_table(table) {
                Ok(handle) => handle,
                Err(e) => {
                    // Hand the permit back before failing
                    let _ = self.permits_tx.send(());
                    return Err(e);
                }
            },
        };

        self.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(PooledTable {
            table: Some(handle),
            pool: Arc::clone(self),
        })
    }

    /// Number of handles currently checked out
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Number of released handles kept for `table`
    pub fn idle_handles(&self, table: &str) -> usize {
        self.idle.lock().get(table).map(|v| v.len()).unwrap_or(0)
    }

    fn release(&self, handle: Arc<dyn Table>) {
        debug!(table = handle.name(), "Returning table to pool");

        self.idle
            .lock()
            .entry(handle.name().to_string())
            .or_default()
            .push(handle);
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        let _ = self.permits_tx.send(());
    }
}

/// A checked-out table handle, released on drop
pub struct PooledTable {
    table: Option<Arc<dyn Table>>,
    pool: Arc<TablePool>,
}

impl Deref for PooledTable {
    type Target = dyn Table;

    fn deref(&self) -> &Self::Target {
        match &self.table {
            Some(table) => table.as_ref(),
            // Only taken in drop
            None => unreachable!("pooled table used after release"),
        }
    }
}

impl Drop for PooledTable {
    fn drop(&mut self) {
        if let Some(table) = self.table.take() {
            self.pool.release(table);
        }
    }
}
