//! Query Module
//!
//! Criteria, their compiled predicates, and the planner that turns a
//! query into a direct or index-assisted scan.
//!
//! ## Pipeline
//! ```text
//! Expression ──compile──► Predicate ──┐
//!                                     ├─► ScanFilter ──► QueryStrategy::open
//! QueryOpts (start, stop, page) ──────┘                      │
//!                                                            ▼
//!                                       RowStream ──from_row──► EntityStream<E>
//! ```
//!
//! ## Predicate Verdicts
//! - `Pass`: yield the row
//! - `Reject`: skip the row, keep scanning
//! - `Halt`: end the scan (a `require` child stopped matching, or the
//!   page limit was reached)

mod criteria;
mod predicate;
mod opts;
mod strategy;
mod planner;
mod execute;

pub use criteria::{and, encode_literal, eq, ne, or, require, ComparisonRef, Expression, Logic};
pub use predicate::{CompareOp, FilteredRows, Predicate, ScanFilter, Verdict};
pub use opts::{QueryOpts, DEFAULT_PAGE_SIZE};
pub use strategy::{DirectScan, IndexScan, QueryStrategy, RowStream, StrategyKind};
pub use planner::QueryPlanner;
pub use execute::{EntityStream, Query};
