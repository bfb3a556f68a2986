//! Store Module
//!
//! The sorted column-family store the mapping layer runs on.
//!
//! ## Responsibilities
//! - Row and cell types shared by every layer
//! - `Table` / `Store` traits: the only surface the core uses
//! - Bounded table handle pool with scoped release
//! - An in-memory reference store for tests and the demo binary
//!
//! ## Data Model
//! ```text
//! table
//!  └── row key (bytes, sorted)
//!       └── (family, qualifier) → (value bytes, timestamp)
//! ```
//! Rows are returned with cells ordered by `(family, qualifier)`.

mod row;
mod table;
mod pool;
mod memory;

pub use row::{Cell, ColumnWrite, Row, RowMutation};
pub use table::{RowIter, ScanSpec, Store, Table};
pub use pool::{PooledTable, TablePool};
pub use memory::{MemStore, MemTable};
