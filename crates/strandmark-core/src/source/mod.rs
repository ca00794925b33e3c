//! Change sources: the photo store the pipeline watches.
//!
//! The pipeline only needs two queries from a store: the current maximum id
//! and the record for a given id. Hosts plug in their own store by
//! implementing [`ChangeSource`]; [`DirectorySource`] covers plain folders.

mod directory;

pub use directory::DirectorySource;

use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::types::ImageRecord;

/// A read-only photo store with monotonically assigned ids.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Highest id currently in the store, or `None` if it is empty.
    async fn max_id(&self) -> PipelineResult<Option<i64>>;

    /// Look up one image; `None` if the id is unknown or was removed.
    async fn query_by_id(&self, image_id: i64) -> PipelineResult<Option<ImageRecord>>;
}
