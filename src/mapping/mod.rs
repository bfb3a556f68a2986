//! Mapping Module
//!
//! Describes how entity types sit in tables and moves them in and out of
//! rows.
//!
//! ## Responsibilities
//! - Field mappings (scalar, list, map) and their cell routing
//! - Entity metadata with a validating builder
//! - Process-wide metadata cache keyed by type
//! - Marshaling entities to mutations and rows back to entities
//!
//! ## Cell Layout
//! ```text
//! row key ── raw bytes of the row key field
//!  ├── family:qualifier        scalar field
//!  ├── family:prefix_0 ..      list field, one cell per element
//!  └── family:prefix<key> ..   map field, one cell per entry
//! ```

mod field;
mod entity;
mod metadata;
mod marshal;

pub use field::{Column, FieldMapping};
pub use entity::{Entity, FieldValue, FromValue};
pub use metadata::{EntityMetadata, MetadataBuilder, MetadataRegistry};
pub use marshal::{from_row, row_key_bytes, to_mutation};
