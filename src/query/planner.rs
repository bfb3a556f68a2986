//! Query planning
//!
//! ## Strategy selection
//! 1. Indexes disabled, or no criteria property is indexed → direct scan
//! 2. Otherwise → index scan on the first indexed comparison, taking the
//!    `using` hint before the filter and equality before inequality
//!
//! ## Start key
//! 1. `start_key` option, when set
//! 2. Index scans: the index key of an anchored equality literal plus the
//!    `start_time` option, without the row key part
//! 3. The minimum key

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::Result;
use crate::index::IndexMapping;
use crate::mapping::EntityMetadata;
use crate::store::ScanSpec;

use super::criteria::{encode_literal, scalar_mapping, ComparisonRef, Expression};
use super::predicate::{CompareOp, ScanFilter};
use super::strategy::{DirectScan, IndexScan, QueryStrategy};
use super::QueryOpts;

/// Chooses and configures a scan strategy per query
pub struct QueryPlanner {
    metadata: Arc<EntityMetadata>,
}

impl QueryPlanner {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self { metadata }
    }

    /// Plan a query
    ///
    /// `hint` names the comparison to prefer for index selection; it is not
    /// applied as a filter.
    pub fn plan(
        &self,
        opts: &QueryOpts,
        criteria: Option<&Expression>,
        hint: Option<&Expression>,
    ) -> Result<Box<dyn QueryStrategy>> {
        let metadata = &self.metadata;
        let predicate = criteria.map(|c| c.compile(metadata)).transpose()?;
        if let Some(predicate) = &predicate {
            debug!(entity = metadata.entity(), filter = %predicate, "Compiled criteria");
        }

        let chosen = if opts.use_indexes {
            self.choose_index(hint, criteria)
        } else {
            None
        };

        let strategy: Box<dyn QueryStrategy> = match chosen {
            Some((index, comparison)) => {
                let start = match &opts.start_key {
                    Some(key) => Some(key.clone()),
                    None => self.index_start(index, &comparison, opts)?,
                };
                // page limit applies to resolved base rows, not index rows
                let spec = ScanSpec {
                    start,
                    stop: opts.stop_key.clone(),
                    filter: Some(ScanFilter::new(predicate, None)),
                };
                Box::new(IndexScan::new(
                    index.table(),
                    metadata.table(),
                    spec,
                    opts.page_size,
                ))
            }
            None => {
                if criteria.is_some() {
                    warn!(
                        entity = metadata.entity(),
                        table = metadata.table(),
                        "Running non-indexed scan"
                    );
                }
                let spec = ScanSpec {
                    start: opts.start_key.clone(),
                    stop: opts.stop_key.clone(),
                    filter: Some(ScanFilter::new(predicate, opts.page_size)),
                };
                Box::new(DirectScan::new(metadata.table(), spec))
            }
        };

        debug!(
            entity = metadata.entity(),
            strategy = %strategy.kind(),
            table = strategy.table(),
            start = ?strategy.start_key(),
            "Planned query"
        );
        Ok(strategy)
    }

    /// First index usable by the hint or the criteria
    fn choose_index<'e>(
        &self,
        hint: Option<&'e Expression>,
        criteria: Option<&'e Expression>,
    ) -> Option<(&IndexMapping, ComparisonRef<'e>)> {
        let candidates: Vec<ComparisonRef<'e>> = hint
            .into_iter()
            .chain(criteria)
            .flat_map(Expression::comparisons)
            .collect();

        let indexed = |c: &ComparisonRef<'e>| {
            self.metadata
                .index_for(c.property)
                .map(|index| (index, *c))
        };

        candidates
            .iter()
            .filter(|c| c.op == CompareOp::Equal)
            .find_map(indexed)
            .or_else(|| candidates.iter().find_map(indexed))
    }

    fn index_start(
        &self,
        index: &IndexMapping,
        comparison: &ComparisonRef<'_>,
        opts: &QueryOpts,
    ) -> Result<Option<Bytes>> {
        if comparison.op != CompareOp::Equal || !comparison.anchored {
            return Ok(None);
        }
        let mapping = scalar_mapping(&self.metadata, comparison.property)?;
        let literal = encode_literal(mapping, comparison.value)?;
        Ok(Some(index.scan_start(&literal, opts.start_time).into()))
    }
}
