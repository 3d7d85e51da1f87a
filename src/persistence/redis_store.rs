// * Redis-backed reference store
// * Each record is a JSON value in one hash, keyed by record id.
// * Updates are optimistic: read, patch, then compare-and-set the field.

use lazy_static::lazy_static;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::debug;

use crate::persistence::schema::{ReferenceDraft, ReferencePatch, ReferenceRecord};
use crate::persistence::store::{
    bookmark_toggle, patch_record, select, stamp, tally, AggregateField, FieldCount, QueryOptions, RecordFilter,
    ReferenceStore, StoreError, StoreResult,
};

// * Hash holding every record
pub const RECORDS_KEY: &str = "scholar_flow:references";

// * Retries before a contended update gives up
const MAX_UPDATE_ATTEMPTS: usize = 16;

lazy_static! {
    // * Writes ARGV[3] only if the field still holds ARGV[2]
    static ref COMPARE_AND_SET: Script = Script::new(
        r"if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
            redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
            return 1
        end
        return 0",
    );
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub struct RedisReferenceStore {
    redis: ConnectionManager,
    key: String,
}

impl RedisReferenceStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_key(url, RECORDS_KEY).await
    }

    /// Connects and stores records under a custom hash key.
    pub async fn connect_with_key(url: &str, key: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let mut redis = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut redis).await?;

        Ok(Self {
            redis,
            key: key.to_string(),
        })
    }

    async fn load(&self, id: &str) -> Result<Option<ReferenceRecord>, StoreError> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = redis.hget(&self.key, id).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn store(&self, record: &ReferenceRecord) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let json = serde_json::to_string(record)?;
        let _: () = redis.hset(&self.key, &record.id, json).await?;
        Ok(())
    }

    /// Applies the patch built by `change` to the stored record, retrying when
    /// another writer got there first.
    async fn modify<F>(&self, id: &str, mut change: F) -> Result<Option<ReferenceRecord>, StoreError>
    where
        F: FnMut(&ReferenceRecord) -> ReferencePatch + Send,
    {
        let mut redis = self.redis.clone();
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let current: Option<String> = redis.hget(&self.key, id).await?;
            let Some(current) = current else {
                return Ok(None);
            };

            let mut record: ReferenceRecord = serde_json::from_str(&current)?;
            let patch = change(&record);
            patch_record(&mut record, patch)?;
            let next = serde_json::to_string(&record)?;

            let swapped: i32 = COMPARE_AND_SET
                .key(&self.key)
                .arg(id)
                .arg(&current)
                .arg(&next)
                .invoke_async(&mut redis)
                .await?;
            if swapped == 1 {
                return Ok(Some(record));
            }
            debug!(id = %id, attempt, "Concurrent update detected, retrying");
        }

        Err(StoreError::Backend(format!(
            "update of {} conflicted {} times",
            id, MAX_UPDATE_ATTEMPTS
        )))
    }

    async fn load_all(&self) -> Result<Vec<ReferenceRecord>, StoreError> {
        let mut redis = self.redis.clone();
        let values: Vec<String> = redis.hvals(&self.key).await?;
        values
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }
}

impl ReferenceStore for RedisReferenceStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn save(&self, draft: ReferenceDraft) -> StoreResult<'_, ReferenceRecord> {
        Box::pin(async move {
            let record = stamp(draft)?;
            self.store(&record).await?;
            debug!(id = %record.id, "Reference saved to redis");
            Ok(record)
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(self.load(id))
    }

    fn find(&self, filter: RecordFilter, options: QueryOptions) -> StoreResult<'_, Vec<ReferenceRecord>> {
        Box::pin(async move {
            let records = self.load_all().await?;
            Ok(select(records, &filter, &options))
        })
    }

    fn update<'a>(&'a self, id: &'a str, patch: ReferencePatch) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move {
            patch.validate()?;
            self.modify(id, move |_| patch.clone()).await
        })
    }

    fn toggle_bookmark<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(self.modify(id, bookmark_toggle))
    }

    fn delete<'a>(&'a self, id: &'a str) -> StoreResult<'a, Option<ReferenceRecord>> {
        Box::pin(async move {
            let Some(record) = self.load(id).await? else {
                return Ok(None);
            };
            let mut redis = self.redis.clone();
            let _: () = redis.hdel(&self.key, id).await?;
            Ok(Some(record))
        })
    }

    fn count(&self, filter: RecordFilter) -> StoreResult<'_, usize> {
        Box::pin(async move {
            if filter == RecordFilter::default() {
                let mut redis = self.redis.clone();
                let len: usize = redis.hlen(&self.key).await?;
                return Ok(len);
            }
            let records = self.load_all().await?;
            Ok(records.iter().filter(|r| filter.matches(r)).count())
        })
    }

    fn aggregate_by_field(&self, field: AggregateField) -> StoreResult<'_, Vec<FieldCount>> {
        Box::pin(async move {
            let records = self.load_all().await?;
            Ok(tally(&records, field))
        })
    }
}
