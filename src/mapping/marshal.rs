//! Entity ↔ row conversion
//!
//! ## Write path
//! - Row key: raw bytes of the row key field; empty or null fails
//! - Scalars: one encoded cell; null writes an empty cell
//! - Lists: `<prefix>_<i>` per element; null or empty writes nothing
//! - Maps: `<prefix><key>` per entry; null or empty writes nothing
//!
//! ## Read path
//! Each cell goes to the first mapping that accepts it. Unmapped cells are
//! skipped, as are cells that fail to decode. A value that cannot be
//! narrowed to its field's type fails the whole record.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::warn;

use crate::codec::{decode, encode, Value};
use crate::error::{ColmapError, Result};
use crate::store::{Row, RowMutation};

use super::{Entity, EntityMetadata, FieldMapping, FieldValue};

/// Raw row key bytes for a key value of the entity's row key type
pub fn row_key_bytes(metadata: &EntityMetadata, key: Value) -> Result<Vec<u8>> {
    let ty = metadata.row_key_type();
    let kind = key.kind();
    let key = key.narrow_to(ty).ok_or_else(|| {
        ColmapError::UnsupportedValueType(format!(
            "{:?} value cannot be used as a {:?} row key of {}",
            kind,
            ty,
            metadata.entity()
        ))
    })?;
    key.to_raw_bytes()
}

/// Build the primary mutation for an entity
pub fn to_mutation<E: Entity>(
    metadata: &EntityMetadata,
    entity: &E,
    timestamp: i64,
) -> Result<RowMutation> {
    let missing = || ColmapError::MissingRowKey {
        entity: metadata.entity().to_string(),
    };

    let row_key = match entity.field(metadata.row_key_field()) {
        FieldValue::Scalar(key) => row_key_bytes(metadata, key)?,
        FieldValue::Null => return Err(missing()),
        FieldValue::List(_) | FieldValue::Map(_) => {
            return Err(ColmapError::UnsupportedValueType(format!(
                "row key of {} must be a scalar",
                metadata.entity()
            )))
        }
    };
    if row_key.is_empty() {
        return Err(missing());
    }

    let mut mutation = RowMutation::new(row_key, timestamp);
    for mapping in metadata.fields() {
        let value = entity.field(mapping.field());
        write_field(&mut mutation, mapping, value)?;
    }
    Ok(mutation)
}

fn write_field(mutation: &mut RowMutation, mapping: &FieldMapping, value: FieldValue) -> Result<()> {
    match (mapping, value) {
        (FieldMapping::Scalar { column, .. }, FieldValue::Null) => {
            mutation.add(column.family.clone(), column.qualifier.clone(), Bytes::new());
        }
        (FieldMapping::Scalar { column, .. }, FieldValue::Scalar(v)) => {
            let bytes = encode(&mapping.coerce(v)?)?;
            mutation.add(column.family.clone(), column.qualifier.clone(), bytes);
        }
        (FieldMapping::List { family, prefix, .. }, FieldValue::List(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                let bytes = encode(&mapping.coerce(item)?)?;
                mutation.add(
                    family.clone(),
                    FieldMapping::element_qualifier(prefix, i),
                    bytes,
                );
            }
        }
        (FieldMapping::Map { family, prefix, .. }, FieldValue::Map(entries)) => {
            for (key, item) in entries {
                let bytes = encode(&mapping.coerce(item)?)?;
                mutation.add(family.clone(), format!("{}{}", prefix, key), bytes);
            }
        }
        (FieldMapping::List { .. } | FieldMapping::Map { .. }, FieldValue::Null) => {}
        (mapping, _) => {
            return Err(ColmapError::UnsupportedValueType(format!(
                "value shape does not match field '{}'",
                mapping.field()
            )))
        }
    }
    Ok(())
}

/// Rebuild an entity from a fetched row
pub fn from_row<E: Entity>(metadata: &EntityMetadata, row: &Row) -> Result<E> {
    let mut entity = E::default();

    let key = Value::from_raw_bytes(&row.key, metadata.row_key_type())?;
    entity.set_field(metadata.row_key_field(), FieldValue::Scalar(key))?;

    let mut lists: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    let mut maps: BTreeMap<&str, BTreeMap<String, Value>> = BTreeMap::new();

    for cell in &row.cells {
        let Some(mapping) = metadata.mapping_for(&cell.family, &cell.qualifier) else {
            warn!(
                entity = metadata.entity(),
                family = %cell.family,
                qualifier = %cell.qualifier,
                "Skipping unmapped cell"
            );
            continue;
        };

        let value = match decode(&cell.value) {
            Ok(Some(value)) => value,
            Ok(None) => {
                if mapping.is_scalar() {
                    entity.set_field(mapping.field(), FieldValue::Null)?;
                }
                continue;
            }
            Err(e) => {
                warn!(
                    entity = metadata.entity(),
                    field = mapping.field(),
                    error = %e,
                    "Skipping undecodable cell"
                );
                continue;
            }
        };

        let kind = value.kind();
        let value = value
            .narrow_to(mapping.value_type())
            .ok_or_else(|| ColmapError::PropertyWrite {
                field: mapping.field().to_string(),
                message: format!(
                    "stored {:?} does not fit declared {:?}",
                    kind,
                    mapping.value_type()
                ),
            })?;

        match mapping {
            FieldMapping::Scalar { field, .. } => {
                entity.set_field(field, FieldValue::Scalar(value))?;
            }
            FieldMapping::List { field, .. } => {
                lists.entry(field.as_str()).or_default().push(value);
            }
            FieldMapping::Map { field, .. } => {
                if let Some(key) = mapping.map_key(&cell.qualifier) {
                    maps.entry(field.as_str())
                        .or_default()
                        .insert(key.to_string(), value);
                }
            }
        }
    }

    for (field, items) in lists {
        entity.set_field(field, FieldValue::List(items))?;
    }
    for (field, entries) in maps {
        entity.set_field(field, FieldValue::Map(entries))?;
    }

    Ok(entity)
}
