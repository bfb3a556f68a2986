//! Record access trait and field values
//!
//! Records expose their fields by name; the marshaler never looks at a
//! record's concrete type, only at [`FieldValue`]s and the metadata the
//! type describes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::Value;
use crate::error::{ColmapError, Result};

use super::{EntityMetadata, MetadataBuilder, MetadataRegistry};

/// A mapped record type
///
/// `describe` is called at most once per type (per registry) and its
/// result cached for the life of the process.
pub trait Entity: Default + Send + 'static {
    /// Declare the table, row key, field mappings and indexes
    fn describe() -> MetadataBuilder;

    /// Read a field by name; unknown names read as `Null`
    fn field(&self, name: &str) -> FieldValue;

    /// Write a field by name
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()>;

    /// Cached metadata for this type
    fn metadata() -> Result<Arc<EntityMetadata>>
    where
        Self: Sized,
    {
        MetadataRegistry::global().metadata_for::<Self>()
    }
}

/// The value of one record field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Scalar(Value),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl FieldValue {
    pub fn of(value: impl Into<Value>) -> Self {
        FieldValue::Scalar(value.into())
    }

    /// `Null` for `None`, otherwise a scalar
    pub fn maybe<T: Into<Value>>(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldValue::Scalar(v.into()),
            None => FieldValue::Null,
        }
    }

    pub fn list_of<T, I>(items: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map_of<K, T, I>(entries: I) -> Self
    where
        K: Into<String>,
        T: Into<Value>,
        I: IntoIterator<Item = (K, T)>,
    {
        FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Read back a scalar field
    pub fn into_scalar<T: FromValue>(self, field: &str) -> Result<Option<T>> {
        match self {
            FieldValue::Null => Ok(None),
            FieldValue::Scalar(value) => convert(field, value).map(Some),
            other => Err(shape_error(field, "a scalar", &other)),
        }
    }

    /// Read back a list field; `Null` reads as an empty list
    pub fn into_list<T: FromValue>(self, field: &str) -> Result<Vec<T>> {
        match self {
            FieldValue::Null => Ok(Vec::new()),
            FieldValue::List(items) => items.into_iter().map(|v| convert(field, v)).collect(),
            other => Err(shape_error(field, "a list", &other)),
        }
    }

    /// Read back a map field; `Null` reads as an empty map
    pub fn into_map<T: FromValue>(self, field: &str) -> Result<BTreeMap<String, T>> {
        match self {
            FieldValue::Null => Ok(BTreeMap::new()),
            FieldValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k, convert(field, v)?)))
                .collect(),
            other => Err(shape_error(field, "a map", &other)),
        }
    }
}

fn convert<T: FromValue>(field: &str, value: Value) -> Result<T> {
    let kind = value.kind();
    T::from_value(value).ok_or_else(|| ColmapError::PropertyWrite {
        field: field.to_string(),
        message: format!("cannot assign a {:?} value", kind),
    })
}

fn shape_error(field: &str, expected: &str, got: &FieldValue) -> ColmapError {
    let shape = match got {
        FieldValue::Null => "null",
        FieldValue::Scalar(_) => "a scalar",
        FieldValue::List(_) => "a list",
        FieldValue::Map(_) => "a map",
    };
    ColmapError::PropertyWrite {
        field: field.to_string(),
        message: format!("expected {}, got {}", expected, shape),
    }
}

/// Conversion from a decoded value into a record's field type
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            Value::Enum { member, .. } => Some(member),
            _ => None,
        }
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> Option<Self> {
        i16::try_from(value.as_integer()?).ok()
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Option<Self> {
        i32::try_from(value.as_integer()?).ok()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::DateTime { millis, .. } => Some(millis),
            other => other.as_integer(),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            Value::Double(v) => Some(v as f32),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::StringList(items) => Some(items),
            _ => None,
        }
    }
}
