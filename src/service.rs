//! Entity Service
//!
//! Persistence entry point for one entity type.
//!
//! ## Write Path
//! ```text
//! entity ──to_mutation──► primary mutation ──put_batch──► base table
//!                               │
//!                               └──IndexMaintainer──► index mutations
//!                                                      └─ one put_batch per index table
//! ```
//! The primary batch is written first. Index writes follow and are not
//! atomic with it: a failure after the primary write leaves the entity
//! stored with stale indexes, and the error is returned to the caller.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::codec::Value;
use crate::config::Config;
use crate::error::{ColmapError, Result};
use crate::index::IndexMaintainer;
use crate::mapping::{from_row, row_key_bytes, to_mutation, Entity, EntityMetadata};
use crate::query::{Query, QueryOpts};
use crate::store::{RowMutation, TablePool};

/// Saves, loads and queries entities of type `E`
pub struct EntityService<E: Entity> {
    pool: Arc<TablePool>,
    metadata: Arc<EntityMetadata>,
    indexer: IndexMaintainer,
    default_opts: QueryOpts,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityService<E> {
    /// Create a service, resolving `E`'s metadata
    pub fn new(pool: Arc<TablePool>, config: &Config) -> Result<Self> {
        config.validate()?;
        let metadata = E::metadata()?;

        Ok(Self {
            pool,
            indexer: IndexMaintainer::new(Arc::clone(&metadata)),
            metadata,
            default_opts: QueryOpts::default()
                .page_size(Some(config.default_page_size))
                .use_indexes(config.use_indexes),
            _entity: PhantomData,
        })
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// Fetch one entity by row key
    pub fn get(&self, key: impl Into<Value>) -> Result<Option<E>> {
        let row_key = row_key_bytes(&self.metadata, key.into())?;
        let table = self
            .pool
            .acquire(self.metadata.table())
            .map_err(ColmapError::into_query)?;

        match table.get(&row_key).map_err(ColmapError::into_query)? {
            Some(row) => from_row(&self.metadata, &row).map(Some),
            None => Ok(None),
        }
    }

    /// Save with the current time as the write timestamp
    pub fn save(&self, entity: &E) -> Result<()> {
        self.save_at(entity, now_millis())
    }

    /// Save with an explicit write timestamp
    pub fn save_at(&self, entity: &E, timestamp: i64) -> Result<()> {
        let mutation = to_mutation(&self.metadata, entity, timestamp)?;
        self.write(vec![mutation])
    }

    /// Save many entities: one primary batch, then one batch per index table
    pub fn save_all(&self, entities: &[E]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let timestamp = now_millis();
        let mutations = entities
            .iter()
            .map(|entity| to_mutation(&self.metadata, entity, timestamp))
            .collect::<Result<Vec<_>>>()?;
        self.write(mutations)
    }

    /// Remove an entity from the primary table
    ///
    /// Index rows pointing at it are left in place; index scans skip them.
    pub fn delete(&self, key: impl Into<Value>) -> Result<()> {
        let row_key = row_key_bytes(&self.metadata, key.into())?;
        let table = self.pool.acquire(self.metadata.table())?;
        table.delete(&row_key)?;

        debug!(entity = self.metadata.entity(), table = table.name(), "Deleted row");
        Ok(())
    }

    /// Apply `change` to every match of `query` and save the changed entities
    ///
    /// Returning `None` from `change` leaves that entity untouched. Returns
    /// the number of entities saved.
    pub fn update<F>(&self, query: Query<E>, mut change: F) -> Result<usize>
    where
        F: FnMut(E) -> Option<E>,
    {
        let changed: Vec<E> = query.execute()?.into_iter().filter_map(&mut change).collect();
        let count = changed.len();
        self.save_all(&changed)?;
        Ok(count)
    }

    /// A new query with the configured defaults
    pub fn query(&self) -> Query<E> {
        self.query_with(self.default_opts.clone())
    }

    /// A new query with explicit options
    pub fn query_with(&self, opts: QueryOpts) -> Query<E> {
        Query::new(Arc::clone(&self.pool), Arc::clone(&self.metadata), opts)
    }

    fn write(&self, mutations: Vec<RowMutation>) -> Result<()> {
        let index_batches = self.indexer.group(&mutations)?;

        // Step 1: Primary table
        {
            let table = self.pool.acquire(self.metadata.table())?;
            table.put_batch(&mutations)?;
            info!(
                entity = self.metadata.entity(),
                table = table.name(),
                rows = mutations.len(),
                "Committed primary batch"
            );
        }

        // Step 2: One batch per index table
        for (index_table, batch) in &index_batches {
            let table = self.pool.acquire(index_table)?;
            table.put_batch(batch)?;
            info!(
                entity = self.metadata.entity(),
                table = index_table.as_str(),
                rows = batch.len(),
                "Committed index batch"
            );
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
