//! Order-preserving integer encoding
//!
//! The only place where numeric sort order is manufactured for keys.

/// Width of every ordered integer, in bytes
pub const ORDERED_WIDTH: usize = 20;

/// Encode `n` so that lexical byte order matches numeric order.
///
/// With `invert` set, the order is reversed (larger values sort first),
/// which gives most-recent-first ordering for timestamps.
pub fn ordered_bytes(n: i64, invert: bool) -> Vec<u8> {
    // Flipping the sign bit maps i64::MIN..=i64::MAX onto 0..=u64::MAX
    let shifted = (n as u64) ^ (1u64 << 63);
    let value = if invert { u64::MAX - shifted } else { shifted };

    format!("{:0width$}", value, width = ORDERED_WIDTH).into_bytes()
}

/// Decode bytes produced by [`ordered_bytes`] back into the original integer
///
/// Returns `None` if the input is not a well-formed ordered integer.
pub fn ordered_value(bytes: &[u8], invert: bool) -> Option<i64> {
    if bytes.len() != ORDERED_WIDTH {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    let value: u64 = text.parse().ok()?;
    let shifted = if invert { u64::MAX - value } else { value };

    Some((shifted ^ (1u64 << 63)) as i64)
}
