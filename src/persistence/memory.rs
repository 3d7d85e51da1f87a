// * In-process reference store

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::persistence::schema::{ReferenceDraft, ReferencePatch, ReferenceRecord};
use crate::persistence::store::{
    bookmark_toggle, patch_record, select, stamp, tally, AggregateField, FieldCount, QueryOptions,
    RecordFilter, ReferenceStore, StoreResult,
};

/// Records held in a `HashMap` behind a tokio `RwLock`. Lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryReferenceStore {
    records: RwLock<HashMap<String, ReferenceRecord>>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn save(&self, draft: ReferenceDraft) -> StoreResult<'_, ReferenceRecord> {
        Box::pin(async move {
            let record = stamp(draft)?;
            self.records
                .write()
                .await
                .insert(record.id.clone(), record.clone());
            debug!(id = %record.id, "Reference saved");
            Ok(record)
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move { Ok(self.records.read().await.get(id).cloned()) })
    }

    fn find(&self, filter: RecordFilter, options: QueryOptions) -> StoreResult<'_, Vec<ReferenceRecord>> {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(select(records.values().cloned(), &filter, &options))
        })
    }

    fn update<'a>(&'a self, id: &'a str, patch: ReferencePatch) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move {
            let mut records = self.records.write().await;
            let Some(record) = records.get_mut(id) else {
                return Ok(None);
            };
            patch_record(record, patch)?;
            Ok(Some(record.clone()))
        })
    }

    fn toggle_bookmark<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move {
            // * Read and flip under one write guard
            let mut records = self.records.write().await;
            let Some(record) = records.get_mut(id) else {
                return Ok(None);
            };
            let patch = bookmark_toggle(record);
            patch_record(record, patch)?;
            Ok(Some(record.clone()))
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move { Ok(self.records.write().await.remove(id)) })
    }

    fn count(&self, filter: RecordFilter) -> StoreResult<'_, usize> {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(records.values().filter(|r| filter.matches(r)).count())
        })
    }

    fn aggregate_by_field(&self, field: AggregateField) -> StoreResult<'_, Vec<FieldCount>> {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(tally(records.values(), field))
        })
    }
}
