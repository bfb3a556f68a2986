//! Index key strategies
//!
//! ## Ordered layout
//! ```text
//! ┌───────────────┬─────┬──────────────────┬─────┬──────────────┐
//! │ primary value │ '-' │ date (ordered)   │ '-' │ base row key │
//! └───────────────┴─────┴──────────────────┴─────┴──────────────┘
//! ```
//! The primary value is ordered bytes when it decodes as an integer and
//! its encoded cell bytes otherwise. The date part appears only when a date
//! is known; the row key part only when a row key is given (scan start keys
//! leave it off).
//!
//! ## Sharded layout
//! The ordered layout behind a two-digit bucket and a separator, so that
//! monotonic primaries spread across the key space.

use std::fmt;

use crate::codec::{decode, ordered_bytes};

use super::SEPARATOR;

/// Inputs to an index key
#[derive(Debug, Clone, Copy)]
pub struct KeyParts<'a> {
    /// Encoded primary cell value
    pub primary: &'a [u8],
    /// Date component, if any
    pub date: Option<i64>,
    /// Sort the date component descending
    pub invert: bool,
    /// Base row key; empty for scan start keys
    pub row_key: &'a [u8],
}

impl KeyParts<'_> {
    /// The primary value, if it decodes as an integer kind
    pub fn primary_integer(&self) -> Option<i64> {
        decode(self.primary).ok().flatten()?.as_integer()
    }

    fn primary_component(&self) -> Vec<u8> {
        match self.primary_integer() {
            Some(n) => ordered_bytes(n, false),
            None => self.primary.to_vec(),
        }
    }
}

/// Builds index row keys from their parts
pub trait IndexKeyStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn build_key(&self, parts: &KeyParts<'_>) -> Vec<u8>;
}

/// Primary value, then date, then base row key
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedKeys;

impl IndexKeyStrategy for OrderedKeys {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn build_key(&self, parts: &KeyParts<'_>) -> Vec<u8> {
        let mut key = parts.primary_component();
        if let Some(date) = parts.date {
            key.push(SEPARATOR);
            key.extend_from_slice(&ordered_bytes(date, parts.invert));
        }
        if !parts.row_key.is_empty() {
            key.push(SEPARATOR);
            key.extend_from_slice(parts.row_key);
        }
        key
    }
}

/// [`OrderedKeys`] behind a `NN-` bucket prefix
///
/// Integer primaries bucket by `value mod 100`; anything else by the
/// CRC-32 of its encoded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardedKeys;

impl ShardedKeys {
    pub const BUCKETS: u32 = 100;

    pub fn bucket(parts: &KeyParts<'_>) -> u32 {
        match parts.primary_integer() {
            Some(n) => n.rem_euclid(i64::from(Self::BUCKETS)) as u32,
            None => crc32fast::hash(parts.primary) % Self::BUCKETS,
        }
    }
}

impl IndexKeyStrategy for ShardedKeys {
    fn name(&self) -> &'static str {
        "sharded"
    }

    fn build_key(&self, parts: &KeyParts<'_>) -> Vec<u8> {
        let mut key = format!("{:02}", Self::bucket(parts)).into_bytes();
        key.push(SEPARATOR);
        key.extend_from_slice(&OrderedKeys.build_key(parts));
        key
    }
}
