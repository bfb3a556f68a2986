//! Entity metadata, its builder and the process-wide registry

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::codec::ScalarType;
use crate::error::{ColmapError, Result};
use crate::index::{IndexMapping, IndexSpec};

use super::{Column, Entity, FieldMapping};

/// Resolved mapping of one entity type
///
/// Immutable once built.
#[derive(Debug)]
pub struct EntityMetadata {
    entity: String,
    table: String,
    row_key: String,
    row_key_type: ScalarType,
    fields: Vec<FieldMapping>,
    indexes: Vec<IndexMapping>,
}

impl EntityMetadata {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Primary table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the row key field
    pub fn row_key_field(&self) -> &str {
        &self.row_key
    }

    pub fn row_key_type(&self) -> ScalarType {
        self.row_key_type
    }

    /// Field mappings in declaration order
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Mapping of a field by name
    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.field() == name)
    }

    /// First field mapping that accepts a stored cell
    pub fn mapping_for(&self, family: &str, qualifier: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.matches(family, qualifier))
    }

    /// Every index, in declaration order
    pub fn indexes(&self) -> &[IndexMapping] {
        &self.indexes
    }

    /// First index declared on a field
    pub fn index_for(&self, field: &str) -> Option<&IndexMapping> {
        self.indexes.iter().find(|i| i.field() == field)
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.index_for(field).is_some()
    }

    /// Distinct mapped families, in first-use order
    pub fn families(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .map(FieldMapping::family)
            .filter(|family| seen.insert(*family))
            .collect()
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone)]
enum FieldDecl {
    Scalar {
        field: String,
        column: String,
        ty: String,
    },
    List {
        field: String,
        family: String,
        prefix: String,
        ty: String,
    },
    Map {
        field: String,
        family: String,
        prefix: String,
        ty: String,
    },
}

/// Declarative description of an entity type
///
/// Declarations are checked together in [`MetadataBuilder::build`].
///
/// # Example
/// ```
/// use colmap::index::IndexSpec;
/// use colmap::mapping::MetadataBuilder;
///
/// let metadata = MetadataBuilder::new("Event", "events")
///     .row_key("id", "string")
///     .scalar("kind", "info:kind", "int")
///     .scalar("created", "info:created", "long")
///     .list("tags", "tags", "tag", "string")
///     .index("kind", IndexSpec::new().date_column("info:created").inverted())
///     .build()
///     .unwrap();
///
/// assert_eq!(metadata.indexes()[0].table(), "events-by_kind");
/// ```
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    entity: String,
    table: String,
    row_keys: Vec<(String, String)>,
    fields: Vec<FieldDecl>,
    indexes: Vec<(String, IndexSpec)>,
}

impl MetadataBuilder {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            row_keys: Vec::new(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Declare the row key field
    pub fn row_key(mut self, field: &str, type_name: &str) -> Self {
        self.row_keys.push((field.to_string(), type_name.to_string()));
        self
    }

    /// Map a field to one `family:qualifier` cell
    pub fn scalar(mut self, field: &str, column: &str, type_name: &str) -> Self {
        self.fields.push(FieldDecl::Scalar {
            field: field.to_string(),
            column: column.to_string(),
            ty: type_name.to_string(),
        });
        self
    }

    /// Map a list field to `<prefix>_<index>` cells of `family`
    pub fn list(mut self, field: &str, family: &str, prefix: &str, type_name: &str) -> Self {
        self.fields.push(FieldDecl::List {
            field: field.to_string(),
            family: family.to_string(),
            prefix: prefix.to_string(),
            ty: type_name.to_string(),
        });
        self
    }

    /// Map a map field to `<prefix><key>` cells of `family`
    pub fn map(mut self, field: &str, family: &str, prefix: &str, type_name: &str) -> Self {
        self.fields.push(FieldDecl::Map {
            field: field.to_string(),
            family: family.to_string(),
            prefix: prefix.to_string(),
            ty: type_name.to_string(),
        });
        self
    }

    /// Declare a secondary index on a scalar field
    pub fn index(mut self, field: &str, spec: IndexSpec) -> Self {
        self.indexes.push((field.to_string(), spec));
        self
    }

    pub fn build(self) -> Result<EntityMetadata> {
        let entity = self.entity;
        let fail = |message: String| ColmapError::mapping(entity.as_str(), message);

        if self.table.is_empty() {
            return Err(fail("table name is empty".to_string()));
        }

        // Row key
        let (row_key, row_key_type) = match self.row_keys.as_slice() {
            [] => return Err(fail("no row key field declared".to_string())),
            [(field, ty)] => (field.clone(), parse_type(&entity, field, ty)?),
            [_, (field, _), ..] => {
                return Err(fail(format!("duplicate row key field '{}'", field)))
            }
        };

        // Fields
        let mut names: HashSet<String> = HashSet::from([row_key.clone()]);
        let mut scalar_columns: HashSet<Column> = HashSet::new();
        let mut prefixes: HashSet<(String, String)> = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for decl in self.fields {
            let mapping = match decl {
                FieldDecl::Scalar { field, column, ty } => {
                    let ty = parse_type(&entity, &field, &ty)?;
                    let column: Column = column.parse().map_err(|_| {
                        fail(format!("field '{}' has malformed column '{}'", field, column))
                    })?;
                    if !scalar_columns.insert(column.clone()) {
                        return Err(fail(format!("column '{}' is mapped twice", column)));
                    }
                    FieldMapping::Scalar { field, column, ty }
                }
                FieldDecl::List {
                    field,
                    family,
                    prefix,
                    ty,
                } => {
                    let ty = parse_type(&entity, &field, &ty)?;
                    check_prefix(&entity, &field, &family, &prefix, &mut prefixes)?;
                    FieldMapping::List {
                        field,
                        family,
                        prefix,
                        ty,
                    }
                }
                FieldDecl::Map {
                    field,
                    family,
                    prefix,
                    ty,
                } => {
                    let ty = parse_type(&entity, &field, &ty)?;
                    check_prefix(&entity, &field, &family, &prefix, &mut prefixes)?;
                    FieldMapping::Map {
                        field,
                        family,
                        prefix,
                        ty,
                    }
                }
            };

            if !names.insert(mapping.field().to_string()) {
                return Err(fail(format!("field '{}' is mapped twice", mapping.field())));
            }
            fields.push(mapping);
        }

        // Indexes
        let mut indexes = Vec::with_capacity(self.indexes.len());
        for (field, spec) in self.indexes {
            let mapping = fields
                .iter()
                .find(|f| f.field() == field)
                .ok_or_else(|| fail(format!("index on unmapped field '{}'", field)))?;
            indexes.push(spec.resolve(&entity, &self.table, mapping)?);
        }

        debug!(
            entity = %entity,
            table = %self.table,
            fields = fields.len(),
            indexes = indexes.len(),
            "Parsed entity metadata"
        );

        Ok(EntityMetadata {
            entity,
            table: self.table,
            row_key,
            row_key_type,
            fields,
            indexes,
        })
    }
}

fn parse_type(entity: &str, field: &str, type_name: &str) -> Result<ScalarType> {
    type_name.parse().map_err(|_| {
        ColmapError::mapping(
            entity,
            format!("field '{}' declares unknown type '{}'", field, type_name),
        )
    })
}

fn check_prefix(
    entity: &str,
    field: &str,
    family: &str,
    prefix: &str,
    seen: &mut HashSet<(String, String)>,
) -> Result<()> {
    if family.is_empty() {
        return Err(ColmapError::mapping(
            entity,
            format!("field '{}' has an empty family", field),
        ));
    }
    if !seen.insert((family.to_string(), prefix.to_string())) {
        return Err(ColmapError::mapping(
            entity,
            format!("prefix '{}:{}' is mapped twice", family, prefix),
        ));
    }
    Ok(())
}

// =============================================================================
// Registry
// =============================================================================

/// Cache of entity metadata keyed by type
///
/// Entries are built on first use and never evicted. Two threads racing on
/// the same type may both parse; the first stored copy is kept.
#[derive(Default)]
pub struct MetadataRegistry {
    entries: RwLock<HashMap<TypeId, Arc<EntityMetadata>>>,
}

static GLOBAL: OnceLock<MetadataRegistry> = OnceLock::new();

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static MetadataRegistry {
        GLOBAL.get_or_init(MetadataRegistry::new)
    }

    /// Metadata for `E`, parsing its description on first use
    pub fn metadata_for<E: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        let type_id = TypeId::of::<E>();
        if let Some(metadata) = self.entries.read().get(&type_id) {
            return Ok(Arc::clone(metadata));
        }

        // Parse outside the lock
        let parsed = Arc::new(E::describe().build()?);

        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(type_id).or_insert(parsed)))
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<E>())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
