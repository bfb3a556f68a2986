//! Codec Module
//!
//! Converts field values to and from the bytes stored in cells.
//!
//! ## Cell Value Format
//! Every mapped cell holds a self-describing value: the variant tag travels
//! with the payload, so decoding needs no type hint.
//! ```text
//! ┌──────────────┬──────────────────────────────────┐
//! │ Tag (4, LE)  │ Payload (bincode, variant shape) │
//! └──────────────┴──────────────────────────────────┘
//! ```
//! An empty cell value decodes to "no value" and is how cleared scalar
//! fields are persisted.
//!
//! ## Ordered Integer Format
//! Index keys embed integers as 20 zero-padded decimal digits of the value
//! shifted into the unsigned range, optionally inverted:
//! ```text
//! n = i64::MIN  →  00000000000000000000
//! n = 0         →  09223372036854775808
//! n = i64::MAX  →  18446744073709551615
//! ```
//! Fixed width keeps byte order equal to numeric order after concatenation.
//!
//! ## Raw Row Keys
//! Row keys bypass the tagged encoding so that they sort directly; see
//! [`Value::to_raw_bytes`].

mod value;
mod ordered;

pub use value::{decode, encode, ScalarType, Value};
pub use ordered::{ordered_bytes, ordered_value, ORDERED_WIDTH};
