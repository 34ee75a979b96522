//! External collaborator seams
//!
//! The document-store client and the metadata registry are consumed
//! through these traits and never implemented by this core. Connection
//! management, wire protocol, transport retries and timeout policy all
//! live behind [`SearchBackend`].

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::index::metadata::IndexMetadata;
use crate::translate::{NativeAggregation, NativeQuery};
use crate::types::{Paging, RecordRow, Sort};

/// Document-store access collaborator
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Execute a query across physical segments, streaming raw hits.
    ///
    /// Segments may be concrete names or wildcard patterns; the backend
    /// resolves patterns itself.
    fn execute_query(
        &self,
        segments: &[String],
        query: &NativeQuery,
        sorts: &[Sort],
        paging: Option<Paging>,
    ) -> BoxStream<'static, Result<RecordRow>>;

    /// Count documents matching a query across physical segments
    async fn count(&self, segments: &[String], query: &NativeQuery) -> Result<u64>;

    /// Execute an aggregation, streaming raw bucket rows
    fn execute_aggregation(
        &self,
        segments: &[String],
        spec: &NativeAggregation,
    ) -> BoxStream<'static, Result<RecordRow>>;

    /// Write a single record to a segment or alias
    async fn write(&self, segment: &str, record: RecordRow) -> Result<()>;

    /// Write a batch of records to a segment or alias
    async fn write_batch(&self, segment: &str, records: Vec<RecordRow>) -> Result<()>;
}

/// Metadata registry collaborator
#[async_trait]
pub trait MetadataRegistry: Send + Sync + 'static {
    /// Look up dataset metadata by logical name
    async fn load(&self, name: &str) -> Result<Option<IndexMetadata>>;
}
