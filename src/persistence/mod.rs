// * Persistence: reference records, the store contract and its backends
// * Redis when reachable, in-process memory otherwise.

pub mod memory;
pub mod redis_store;
pub mod schema;
pub mod store;
pub mod upload;

// * Re-exports for convenient access
pub use memory::InMemoryReferenceStore;
pub use redis_store::RedisReferenceStore;
pub use schema::{
    ExtractionMetadata, ReferenceDraft, ReferenceDraftBuilder, ReferencePatch, ReferenceRecord,
    ReferenceSource, SchemaError, RATING_MAX, RATING_MIN,
};
pub use store::{
    AggregateField, FieldCount, Overview, QueryOptions, RecordFilter, ReferenceStore, SortField,
    SortOrder, StoreError,
};
pub use upload::{PdfUpload, PdfUploader, UploadError};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// * Upper bound on the startup connection attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Picks the store backend at startup.
///
/// Redis is used when a URL is given and the server answers; any failure falls
/// back to the in-memory store with a warning.
pub async fn connect_store(redis_url: Option<&str>) -> Arc<dyn ReferenceStore> {
    let Some(url) = redis_url else {
        info!("No redis_url configured, using in-memory reference store");
        return Arc::new(InMemoryReferenceStore::new());
    };

    match tokio::time::timeout(CONNECT_TIMEOUT, RedisReferenceStore::connect(url)).await {
        Ok(Ok(store)) => {
            info!(redis_url = %url, "Connected to redis reference store");
            Arc::new(store)
        }
        Ok(Err(e)) => {
            warn!(redis_url = %url, error = %e, "Redis unavailable, falling back to in-memory store");
            Arc::new(InMemoryReferenceStore::new())
        }
        Err(_) => {
            warn!(redis_url = %url, "Redis connection timed out, falling back to in-memory store");
            Arc::new(InMemoryReferenceStore::new())
        }
    }
}
