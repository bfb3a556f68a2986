//! Field to column mappings

use std::fmt;
use std::str::FromStr;

use crate::codec::{ScalarType, Value};
use crate::error::{ColmapError, Result};

/// A cell address: `(family, qualifier)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    pub family: String,
    pub qualifier: String,
}

impl Column {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    pub fn matches(&self, family: &str, qualifier: &str) -> bool {
        self.family == family && self.qualifier == qualifier
    }
}

impl FromStr for Column {
    type Err = ColmapError;

    /// Parse a `family:qualifier` spec
    fn from_str(spec: &str) -> Result<Self> {
        match spec.split_once(':') {
            Some((family, qualifier)) if !family.is_empty() && !qualifier.is_empty() => {
                Ok(Column::new(family, qualifier))
            }
            _ => Err(ColmapError::mapping(
                "column",
                format!("'{}' is not a family:qualifier column", spec),
            )),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

/// How one record field is laid out in cells
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    /// One field, one cell
    Scalar {
        field: String,
        column: Column,
        ty: ScalarType,
    },

    /// One cell per element, qualified `<prefix>_<index>`
    List {
        field: String,
        family: String,
        prefix: String,
        ty: ScalarType,
    },

    /// One cell per entry, qualified `<prefix><key>`
    Map {
        field: String,
        family: String,
        prefix: String,
        ty: ScalarType,
    },
}

impl FieldMapping {
    /// Record field name
    pub fn field(&self) -> &str {
        match self {
            FieldMapping::Scalar { field, .. }
            | FieldMapping::List { field, .. }
            | FieldMapping::Map { field, .. } => field,
        }
    }

    pub fn family(&self) -> &str {
        match self {
            FieldMapping::Scalar { column, .. } => &column.family,
            FieldMapping::List { family, .. } | FieldMapping::Map { family, .. } => family,
        }
    }

    /// Declared type of the field (element type for lists and maps)
    pub fn value_type(&self) -> ScalarType {
        match self {
            FieldMapping::Scalar { ty, .. }
            | FieldMapping::List { ty, .. }
            | FieldMapping::Map { ty, .. } => *ty,
        }
    }

    /// The single column of a scalar mapping
    pub fn column(&self) -> Option<&Column> {
        match self {
            FieldMapping::Scalar { column, .. } => Some(column),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldMapping::Scalar { .. })
    }

    /// Whether a stored cell belongs to this field
    pub fn matches(&self, family: &str, qualifier: &str) -> bool {
        match self {
            FieldMapping::Scalar { column, .. } => column.matches(family, qualifier),
            FieldMapping::List {
                family: own,
                prefix,
                ..
            } => {
                own == family
                    && qualifier
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_prefix('_'))
                        .is_some_and(|index| {
                            !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
                        })
            }
            FieldMapping::Map {
                family: own,
                prefix,
                ..
            } => own == family && qualifier.starts_with(prefix.as_str()),
        }
    }

    /// Qualifier of list element `index`
    pub fn element_qualifier(prefix: &str, index: usize) -> String {
        format!("{}_{}", prefix, index)
    }

    /// Map key carried by a matching qualifier
    pub fn map_key<'q>(&self, qualifier: &'q str) -> Option<&'q str> {
        match self {
            FieldMapping::Map { prefix, .. } => qualifier.strip_prefix(prefix.as_str()),
            _ => None,
        }
    }

    /// Convert a value to this field's declared type
    pub fn coerce(&self, value: Value) -> Result<Value> {
        let ty = self.value_type();
        let kind = value.kind();
        value.narrow_to(ty).ok_or_else(|| {
            ColmapError::UnsupportedValueType(format!(
                "{:?} value cannot be stored in {:?} field '{}'",
                kind,
                ty,
                self.field()
            ))
        })
    }
}
