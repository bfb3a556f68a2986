//! Index declarations and their resolved form

use std::sync::Arc;

use tracing::debug;

use crate::codec::{decode, Value};
use crate::error::{ColmapError, Result};
use crate::mapping::{Column, FieldMapping};
use crate::store::RowMutation;

use super::keys::{IndexKeyStrategy, KeyParts, OrderedKeys, ShardedKeys};
use super::{INDEX_FAMILY, INDEX_ROW_QUALIFIER};

/// Where an index takes its date component from
#[derive(Debug, Clone, PartialEq)]
pub enum DateSource {
    /// An integer (or datetime) column of the base row
    Column(Column),
    /// The timestamp of the base mutation
    Timestamp,
}

#[derive(Debug, Clone)]
enum DateDecl {
    Column(String),
    Timestamp,
}

/// Declaration of one secondary index, as written in `Entity::describe`
#[derive(Debug, Clone, Default)]
pub struct IndexSpec {
    date: Option<DateDecl>,
    invert: bool,
    extras: Vec<String>,
    strategy: Option<Arc<dyn IndexKeyStrategy>>,
}

impl IndexSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a date component read from a `family:qualifier` column
    pub fn date_column(mut self, column: &str) -> Self {
        self.date = Some(DateDecl::Column(column.to_string()));
        self
    }

    /// Add a date component taken from the write timestamp
    pub fn timestamp(mut self) -> Self {
        self.date = Some(DateDecl::Timestamp);
        self
    }

    /// Sort the date component most-recent-first
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Copy a `family:qualifier` column into index rows
    pub fn extra(mut self, column: &str) -> Self {
        self.extras.push(column.to_string());
        self
    }

    pub fn strategy(mut self, strategy: impl IndexKeyStrategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Use [`ShardedKeys`]
    pub fn sharded(self) -> Self {
        self.strategy(ShardedKeys)
    }

    /// Resolve against the indexed field of `base_table`
    pub(crate) fn resolve(
        self,
        entity: &str,
        base_table: &str,
        field: &FieldMapping,
    ) -> Result<IndexMapping> {
        let column = field.column().cloned().ok_or_else(|| {
            ColmapError::mapping(
                entity,
                format!("index on '{}' requires a scalar field", field.field()),
            )
        })?;

        let with_entity = |e: ColmapError| match e {
            ColmapError::Mapping { message, .. } => ColmapError::mapping(entity, message),
            other => other,
        };

        let date = match self.date {
            Some(DateDecl::Column(spec)) => Some(DateSource::Column(
                spec.parse::<Column>().map_err(with_entity)?,
            )),
            Some(DateDecl::Timestamp) => Some(DateSource::Timestamp),
            None => None,
        };
        let extras = self
            .extras
            .iter()
            .map(|spec| spec.parse::<Column>().map_err(with_entity))
            .collect::<Result<Vec<_>>>()?;

        Ok(IndexMapping {
            table: IndexMapping::table_name(base_table, &column.qualifier),
            field: field.field().to_string(),
            column,
            date,
            invert: self.invert,
            extras,
            strategy: self.strategy.unwrap_or_else(|| Arc::new(OrderedKeys)),
        })
    }
}

/// A resolved secondary index
#[derive(Debug, Clone)]
pub struct IndexMapping {
    table: String,
    field: String,
    column: Column,
    date: Option<DateSource>,
    invert: bool,
    extras: Vec<Column>,
    strategy: Arc<dyn IndexKeyStrategy>,
}

impl IndexMapping {
    /// `<base>-by_<qualifier>`
    pub fn table_name(base_table: &str, qualifier: &str) -> String {
        format!("{}-by_{}", base_table, qualifier)
    }

    /// Index table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Indexed record field
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Column of the indexed field
    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn date(&self) -> Option<&DateSource> {
        self.date.as_ref()
    }

    pub fn inverted(&self) -> bool {
        self.invert
    }

    pub fn extras(&self) -> &[Column] {
        &self.extras
    }

    pub fn strategy(&self) -> &dyn IndexKeyStrategy {
        self.strategy.as_ref()
    }

    /// Index row key for the given parts
    pub fn index_key(&self, primary: &[u8], date: Option<i64>, row_key: &[u8]) -> Vec<u8> {
        self.strategy.build_key(&KeyParts {
            primary,
            date,
            invert: self.invert,
            row_key,
        })
    }

    /// First index key a scan for `primary` (encoded) should visit
    ///
    /// The row key part is left off so the scan starts at the first row at
    /// or after the value prefix.
    pub fn scan_start(&self, primary: &[u8], start_time: Option<i64>) -> Vec<u8> {
        let date = if self.date.is_some() { start_time } else { None };
        self.index_key(primary, date, &[])
    }

    /// Derive the index row for a base mutation
    ///
    /// Returns `None` when the mutation carries no value for the indexed
    /// column.
    pub fn update_for(&self, mutation: &RowMutation) -> Result<Option<RowMutation>> {
        let primary = match mutation.value(&self.column.family, &self.column.qualifier) {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(None),
        };

        let date = self.resolve_date(mutation);
        let key = self.index_key(primary, date, &mutation.row_key);

        let mut update = RowMutation::new(key, mutation.timestamp);
        update.add(
            self.column.family.clone(),
            self.column.qualifier.clone(),
            primary.clone(),
        );
        if let Some(DateSource::Column(column)) = &self.date {
            if let Some(value) = mutation.value(&column.family, &column.qualifier) {
                update.add(column.family.clone(), column.qualifier.clone(), value.clone());
            }
        }
        for column in &self.extras {
            if let Some(value) = mutation.value(&column.family, &column.qualifier) {
                update.add(column.family.clone(), column.qualifier.clone(), value.clone());
            }
        }
        update.add(INDEX_FAMILY, INDEX_ROW_QUALIFIER, mutation.row_key.clone());

        Ok(Some(update))
    }

    fn resolve_date(&self, mutation: &RowMutation) -> Option<i64> {
        match self.date.as_ref()? {
            DateSource::Timestamp => Some(mutation.timestamp),
            DateSource::Column(column) => {
                let bytes = mutation.value(&column.family, &column.qualifier)?;
                match decode(bytes) {
                    Ok(Some(Value::DateTime { millis, .. })) => Some(millis),
                    Ok(Some(value)) => value.as_integer(),
                    Ok(None) => None,
                    Err(e) => {
                        debug!(
                            index = %self.table,
                            column = %column,
                            error = %e,
                            "Ignoring undecodable date"
                        );
                        None
                    }
                }
            }
        }
    }
}
