//! Index maintenance for primary writes

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::mapping::EntityMetadata;
use crate::store::RowMutation;

/// Derives index rows from primary mutations of one entity type
pub struct IndexMaintainer {
    metadata: Arc<EntityMetadata>,
}

impl IndexMaintainer {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self { metadata }
    }

    /// Index rows for one base mutation, as `(index table, mutation)` pairs
    ///
    /// Each declared index contributes at most one row.
    pub fn updates_for(&self, mutation: &RowMutation) -> Result<Vec<(String, RowMutation)>> {
        let mut updates = Vec::new();
        for index in self.metadata.indexes() {
            if let Some(update) = index.update_for(mutation)? {
                debug!(
                    index = index.table(),
                    strategy = index.strategy().name(),
                    key_len = update.row_key.len(),
                    "Derived index row"
                );
                updates.push((index.table().to_string(), update));
            }
        }
        Ok(updates)
    }

    /// Index rows for many base mutations, grouped by index table
    pub fn group(&self, mutations: &[RowMutation]) -> Result<BTreeMap<String, Vec<RowMutation>>> {
        let mut batches: BTreeMap<String, Vec<RowMutation>> = BTreeMap::new();
        for mutation in mutations {
            for (table, update) in self.updates_for(mutation)? {
                batches.entry(table).or_default().push(update);
            }
        }
        Ok(batches)
    }
}
