//! Criteria expressions
//!
//! ```text
//! require(and([eq("kind", 2), ne("status", "closed")]))
//!    │
//!    ▼ compile(metadata)
//! WhileMatch(All([Column(info:kind == ..), Column(info:status != ..)]))
//! ```

use std::fmt;

use crate::codec::{encode, Value};
use crate::error::{ColmapError, Result};
use crate::mapping::{EntityMetadata, FieldMapping};

use super::predicate::{CompareOp, Predicate};

/// How a compound combines its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

/// A criteria tree over entity properties
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        property: String,
        value: Value,
        op: CompareOp,
    },
    Compound {
        logic: Logic,
        children: Vec<Expression>,
    },
    /// Stop the scan at the first row the child rejects
    Require(Box<Expression>),
}

/// `property == value`
pub fn eq(property: &str, value: impl Into<Value>) -> Expression {
    Expression::Comparison {
        property: property.to_string(),
        value: value.into(),
        op: CompareOp::Equal,
    }
}

/// `property != value`
pub fn ne(property: &str, value: impl Into<Value>) -> Expression {
    Expression::Comparison {
        property: property.to_string(),
        value: value.into(),
        op: CompareOp::NotEqual,
    }
}

pub fn and(children: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Compound {
        logic: Logic::And,
        children: children.into_iter().collect(),
    }
}

pub fn or(children: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Compound {
        logic: Logic::Or,
        children: children.into_iter().collect(),
    }
}

/// End an ordered scan as soon as `child` stops matching
pub fn require(child: Expression) -> Expression {
    Expression::Require(Box::new(child))
}

/// A comparison found while walking an expression
#[derive(Debug, Clone, Copy)]
pub struct ComparisonRef<'a> {
    pub property: &'a str,
    pub value: &'a Value,
    pub op: CompareOp,
    /// Reached only through AND and Require, so every match satisfies it
    pub anchored: bool,
}

impl Expression {
    /// Compile against an entity's mappings
    pub fn compile(&self, metadata: &EntityMetadata) -> Result<Predicate> {
        match self {
            Expression::Comparison {
                property,
                value,
                op,
            } => {
                let mapping = scalar_mapping(metadata, property)?;
                let column = match mapping.column() {
                    Some(column) => column,
                    None => return Err(not_scalar(metadata, property)),
                };
                Ok(Predicate::Column {
                    family: column.family.clone(),
                    qualifier: column.qualifier.clone(),
                    op: *op,
                    value: encode_literal(mapping, value)?.into(),
                })
            }
            Expression::Compound { logic, children } => {
                let compiled = children
                    .iter()
                    .map(|child| child.compile(metadata))
                    .collect::<Result<Vec<_>>>()?;
                Ok(match logic {
                    Logic::And => Predicate::All(compiled),
                    Logic::Or => Predicate::Any(compiled),
                })
            }
            Expression::Require(child) => {
                Ok(Predicate::WhileMatch(Box::new(child.compile(metadata)?)))
            }
        }
    }

    /// Every comparison in the tree, depth first
    pub fn comparisons(&self) -> Vec<ComparisonRef<'_>> {
        let mut found = Vec::new();
        self.collect(true, &mut found);
        found
    }

    fn collect<'a>(&'a self, anchored: bool, found: &mut Vec<ComparisonRef<'a>>) {
        match self {
            Expression::Comparison {
                property,
                value,
                op,
            } => found.push(ComparisonRef {
                property,
                value,
                op: *op,
                anchored,
            }),
            Expression::Compound { logic, children } => {
                let anchored = anchored && *logic == Logic::And;
                for child in children {
                    child.collect(anchored, found);
                }
            }
            Expression::Require(child) => child.collect(anchored, found),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Comparison {
                property,
                value,
                op,
            } => {
                let symbol = match op {
                    CompareOp::Equal => "==",
                    CompareOp::NotEqual => "!=",
                };
                write!(f, "{} {} {}", property, symbol, value)
            }
            Expression::Compound { logic, children } => {
                let joiner = match logic {
                    Logic::And => " AND ",
                    Logic::Or => " OR ",
                };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Expression::Require(child) => write!(f, "REQUIRE {}", child),
        }
    }
}

/// Encoded form of a literal, as it would be stored in `mapping`'s cell
pub fn encode_literal(mapping: &FieldMapping, value: &Value) -> Result<Vec<u8>> {
    encode(&mapping.coerce(value.clone())?)
}

/// The scalar mapping behind a criteria property
pub(crate) fn scalar_mapping<'m>(
    metadata: &'m EntityMetadata,
    property: &str,
) -> Result<&'m FieldMapping> {
    match metadata.field(property) {
        Some(mapping) if mapping.is_scalar() => Ok(mapping),
        Some(_) => Err(not_scalar(metadata, property)),
        None => Err(ColmapError::mapping(
            metadata.entity(),
            format!("no mapping for property '{}'", property),
        )),
    }
}

fn not_scalar(metadata: &EntityMetadata, property: &str) -> ColmapError {
    ColmapError::mapping(
        metadata.entity(),
        format!("property '{}' is not a scalar column", property),
    )
}
