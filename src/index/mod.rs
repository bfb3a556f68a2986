//! Index Module
//!
//! Secondary index tables derived from primary writes.
//!
//! ## Index Rows
//! For every base mutation that carries the indexed column, one row is
//! written to `<base>-by_<qualifier>` holding:
//! - the indexed cell
//! - the date cell, when the date comes from a column
//! - each extra column present in the base mutation
//! - `__idx__:row`, the base row key
//!
//! Index rows share the base mutation's timestamp. Stale index rows are
//! never removed; readers skip rows whose base row has gone.

mod keys;
mod mapping;
mod maintainer;

pub use keys::{IndexKeyStrategy, KeyParts, OrderedKeys, ShardedKeys};
pub use mapping::{DateSource, IndexMapping, IndexSpec};
pub use maintainer::IndexMaintainer;

/// Family of the back-reference cell
pub const INDEX_FAMILY: &str = "__idx__";

/// Qualifier of the back-reference cell
pub const INDEX_ROW_QUALIFIER: &str = "row";

/// Separator between index key parts
pub const SEPARATOR: u8 = b'-';
