//! Typed values and their cell encoding

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ColmapError, Result};

/// A typed field value
///
/// Closed set of kinds; the discriminant is part of the encoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Binary(Vec<u8>),
    /// Epoch milliseconds with an optional timezone id
    DateTime { millis: i64, zone: Option<String> },
    /// Enumeration member, qualified by its type name
    Enum { type_name: String, member: String },
    StringList(Vec<String>),
}

/// Declared type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Text,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Binary,
    DateTime,
    Enum,
    StringList,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value into its self-describing cell form
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode a cell value
///
/// Returns:
/// - `Ok(None)`: empty input (a cleared field)
/// - `Ok(Some(value))`: a well-formed value
/// - `Err(Serialization)`: bytes that are not a cell value
pub fn decode(bytes: &[u8]) -> Result<Option<Value>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(bincode::deserialize(bytes)?))
}

// =============================================================================
// Value helpers
// =============================================================================

impl Value {
    /// The kind of this value
    pub fn kind(&self) -> ScalarType {
        match self {
            Value::Text(_) => ScalarType::Text,
            Value::Short(_) => ScalarType::Short,
            Value::Int(_) => ScalarType::Int,
            Value::Long(_) => ScalarType::Long,
            Value::Float(_) => ScalarType::Float,
            Value::Double(_) => ScalarType::Double,
            Value::Bool(_) => ScalarType::Bool,
            Value::Binary(_) => ScalarType::Binary,
            Value::DateTime { .. } => ScalarType::DateTime,
            Value::Enum { .. } => ScalarType::Enum,
            Value::StringList(_) => ScalarType::StringList,
        }
    }

    /// The value as an i64, if it is one of the integer kinds
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to the declared type, widening or narrowing between numeric kinds
    ///
    /// Integers convert to any integer type whose range holds the value;
    /// floats convert between single and double precision. Every other
    /// combination succeeds only when the kinds already match.
    pub fn narrow_to(self, target: ScalarType) -> Option<Value> {
        if self.kind() == target {
            return Some(self);
        }

        match target {
            ScalarType::Short => i16::try_from(self.as_integer()?).ok().map(Value::Short),
            ScalarType::Int => i32::try_from(self.as_integer()?).ok().map(Value::Int),
            ScalarType::Long => self.as_integer().map(Value::Long),
            ScalarType::Float => match self {
                Value::Double(v) => Some(Value::Float(v as f32)),
                _ => None,
            },
            ScalarType::Double => match self {
                Value::Float(v) => Some(Value::Double(f64::from(v))),
                _ => None,
            },
            _ => None,
        }
    }

    // =========================================================================
    // Raw (row key) conversions
    // =========================================================================

    /// Raw bytes for use as a row key
    ///
    /// Row keys are not tagged: text is UTF-8, integers are big-endian and
    /// binary is used as-is.
    pub fn to_raw_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            Value::Binary(b) => Ok(b.clone()),
            Value::Short(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Int(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Long(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Float(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Double(v) => Ok(v.to_be_bytes().to_vec()),
            Value::Bool(b) => Ok(vec![u8::from(*b)]),
            Value::DateTime { millis, .. } => Ok(millis.to_be_bytes().to_vec()),
            Value::Enum { member, .. } => Ok(member.to_lowercase().into_bytes()),
            Value::StringList(_) => Err(ColmapError::UnsupportedValueType(
                "string list cannot be used as a row key".to_string(),
            )),
        }
    }

    /// Rebuild a row key value of the declared type from its raw bytes
    pub fn from_raw_bytes(bytes: &[u8], target: ScalarType) -> Result<Value> {
        fn fixed<const N: usize>(bytes: &[u8], target: ScalarType) -> Result<[u8; N]> {
            bytes.try_into().map_err(|_| {
                ColmapError::Serialization(format!(
                    "{:?} row key needs {} bytes, got {}",
                    target,
                    N,
                    bytes.len()
                ))
            })
        }

        let value = match target {
            ScalarType::Text => Value::Text(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| ColmapError::Serialization(e.to_string()))?,
            ),
            ScalarType::Binary => Value::Binary(bytes.to_vec()),
            ScalarType::Short => Value::Short(i16::from_be_bytes(fixed(bytes, target)?)),
            ScalarType::Int => Value::Int(i32::from_be_bytes(fixed(bytes, target)?)),
            ScalarType::Long => Value::Long(i64::from_be_bytes(fixed(bytes, target)?)),
            ScalarType::Float => Value::Float(f32::from_be_bytes(fixed(bytes, target)?)),
            ScalarType::Double => Value::Double(f64::from_be_bytes(fixed(bytes, target)?)),
            ScalarType::Bool => Value::Bool(fixed::<1>(bytes, target)?[0] != 0),
            ScalarType::DateTime => Value::DateTime {
                millis: i64::from_be_bytes(fixed(bytes, target)?),
                zone: None,
            },
            ScalarType::Enum | ScalarType::StringList => {
                return Err(ColmapError::UnsupportedValueType(format!(
                    "{:?} cannot be used as a row key",
                    target
                )))
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Value::DateTime { millis, zone } => match zone {
                Some(zone) => write!(f, "{}ms@{}", millis, zone),
                None => write!(f, "{}ms", millis),
            },
            Value::Enum { type_name, member } => write!(f, "{}::{}", type_name, member),
            Value::StringList(items) => write!(f, "{:?}", items),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    String => Text,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    Vec<u8> => Binary,
    Vec<String> => StringList,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

// =============================================================================
// Declared type names
// =============================================================================

impl FromStr for ScalarType {
    type Err = ColmapError;

    /// Parse a declared type name
    ///
    /// Accepts the short names plus the `*_type` aliases used by older
    /// declarations.
    fn from_str(name: &str) -> Result<Self> {
        let ty = match name.trim() {
            "string" | "text" => ScalarType::Text,
            "short" | "short_type" => ScalarType::Short,
            "int" | "int_type" => ScalarType::Int,
            "long" | "long_type" => ScalarType::Long,
            "float" | "float_type" => ScalarType::Float,
            "double" | "double_type" => ScalarType::Double,
            "bool" | "boolean" => ScalarType::Bool,
            "binary" | "bytes" => ScalarType::Binary,
            "datetime" | "date" => ScalarType::DateTime,
            "enum" => ScalarType::Enum,
            "string_list" => ScalarType::StringList,
            other => {
                return Err(ColmapError::UnsupportedValueType(format!(
                    "unknown type name '{}'",
                    other
                )))
            }
        };
        Ok(ty)
    }
}
