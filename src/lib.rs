//! # colmap
//!
//! Object mapping and query planning over a sorted column-family store:
//! - Typed entities persisted as rows of self-describing cells
//! - Secondary index tables maintained on every save
//! - Composable criteria compiled to store-side predicates
//! - A planner choosing between direct and index-assisted scans
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     EntityService<E>                         │
//! │              (get / save / delete / query)                   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ write                            │ read
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │    Marshaler    │               │   Query<E>       │
//!   │ (entity ↔ row)  │               │   + Planner      │
//!   └────────┬────────┘               └────────┬─────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │ IndexMaintainer │               │ Direct / Index   │
//!   │ (index rows)    │               │ scan strategies  │
//!   └────────┬────────┘               └────────┬─────────┘
//!            │                                 │
//!            └──────────────┬──────────────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │   TablePool     │
//!                  │ (Store / Table) │
//!                  └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod store;
pub mod mapping;
pub mod index;
pub mod query;
pub mod service;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ColmapError, Result};
pub use config::Config;
pub use codec::{ScalarType, Value};
pub use mapping::{Entity, EntityMetadata, FieldValue, MetadataBuilder};
pub use index::IndexSpec;
pub use query::{and, eq, ne, or, require, Expression, Query, QueryOpts};
pub use store::{MemStore, Store, Table, TablePool};
pub use service::EntityService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of colmap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
