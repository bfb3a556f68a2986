//! Query façade

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::info;

use crate::error::Result;
use crate::mapping::{from_row, Entity, EntityMetadata};
use crate::store::TablePool;

use super::criteria::{and, Expression};
use super::planner::QueryPlanner;
use super::strategy::{QueryStrategy, RowStream, StrategyKind};
use super::QueryOpts;

/// A query over one entity type
///
/// Built up with filters and options, then run with [`Query::execute`],
/// [`Query::execute_single`] or [`Query::stream`]. Several filters are
/// combined with AND.
pub struct Query<E: Entity> {
    pool: Arc<TablePool>,
    metadata: Arc<EntityMetadata>,
    opts: QueryOpts,
    filters: Vec<Expression>,
    hint: Option<Expression>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    pub fn new(pool: Arc<TablePool>, metadata: Arc<EntityMetadata>, opts: QueryOpts) -> Self {
        Self {
            pool,
            metadata,
            opts,
            filters: Vec::new(),
            hint: None,
            _entity: PhantomData,
        }
    }

    /// Add a filter
    pub fn filter(mut self, expression: Expression) -> Self {
        self.filters.push(expression);
        self
    }

    /// Alias of [`Query::filter`]
    pub fn where_(self, expression: Expression) -> Self {
        self.filter(expression)
    }

    /// Prefer the index of this comparison when planning
    pub fn using(mut self, expression: Expression) -> Self {
        self.hint = Some(expression);
        self
    }

    pub fn start(mut self, key: impl Into<Bytes>) -> Self {
        self.opts.start_key = Some(key.into());
        self
    }

    pub fn start_time(mut self, millis: i64) -> Self {
        self.opts.start_time = Some(millis);
        self
    }

    pub fn stop(mut self, key: impl Into<Bytes>) -> Self {
        self.opts.stop_key = Some(key.into());
        self
    }

    pub fn limit(mut self, size: usize) -> Self {
        self.opts.page_size = Some(size);
        self
    }

    pub fn use_indexes(mut self, enabled: bool) -> Self {
        self.opts.use_indexes = enabled;
        self
    }

    /// Replace all options
    pub fn options(mut self, opts: QueryOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn opts(&self) -> &QueryOpts {
        &self.opts
    }

    /// Combined filter, if any
    pub fn criteria(&self) -> Option<Expression> {
        match self.filters.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(and(many.iter().cloned())),
        }
    }

    /// The strategy this query would run with
    pub fn plan(&self) -> Result<Box<dyn QueryStrategy>> {
        self.plan_with(&self.opts)
    }

    /// Open a lazy stream of matching entities
    pub fn stream(&self) -> Result<EntityStream<E>> {
        self.stream_with(&self.opts)
    }

    fn plan_with(&self, opts: &QueryOpts) -> Result<Box<dyn QueryStrategy>> {
        let criteria = self.criteria();
        QueryPlanner::new(Arc::clone(&self.metadata)).plan(
            opts,
            criteria.as_ref(),
            self.hint.as_ref(),
        )
    }

    fn stream_with(&self, opts: &QueryOpts) -> Result<EntityStream<E>> {
        let strategy = self.plan_with(opts)?;
        let rows = strategy.open(&self.pool)?;
        Ok(EntityStream {
            rows,
            metadata: Arc::clone(&self.metadata),
            strategy: strategy.kind(),
            _entity: PhantomData,
        })
    }

    /// Run the query, collecting every match
    ///
    /// Fails without partial results if any row fails.
    pub fn execute(&self) -> Result<Vec<E>> {
        let started = Instant::now();
        let mut stream = self.stream()?;
        let mut records = Vec::new();
        for record in stream.by_ref() {
            records.push(record?);
        }

        info!(
            entity = self.metadata.entity(),
            strategy = %stream.strategy(),
            records = records.len(),
            rows = stream.rows_processed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(records)
    }

    /// Run the query for at most one match
    pub fn execute_single(&self) -> Result<Option<E>> {
        let mut opts = self.opts.clone();
        opts.page_size = Some(1);
        self.stream_with(&opts)?.next().transpose()
    }
}

/// Entities read from an open scan
///
/// Dropping the stream releases its table handles.
pub struct EntityStream<E: Entity> {
    rows: RowStream,
    metadata: Arc<EntityMetadata>,
    strategy: StrategyKind,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityStream<E> {
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Rows read from the store so far
    pub fn rows_processed(&self) -> usize {
        self.rows.processed()
    }
}

impl<E: Entity> Iterator for EntityStream<E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        Some(from_row(&self.metadata, &row))
    }
}
