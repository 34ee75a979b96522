//! Logical dataset service
//!
//! [`TimeSeriesService`] presents 1..N physical segments as one logical
//! dataset: reads resolve their segment set through the index strategy,
//! writes go to the dataset's primary alias, and aggregations reshape the
//! backend's sparse bucket stream into dense per-group grids. All
//! operations compose as asynchronous pipelines; dropping a returned
//! stream cancels its upstream work.

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::error::Result;
use crate::index::{IndexMetadata, IndexStrategy};
use crate::service::aggregation::{
    find_bucket, merge_into_bucket, prepare_grid, row_time, AggregationData,
    AggregationQueryParam, BucketGrid, GroupKey, TimeGroup,
};
use crate::service::backend::SearchBackend;
use crate::translate::{self, Term};
use crate::types::{PagedResult, Paging, QueryParam, RecordRow, Sort, TimeSeriesRecord};

const DEFAULT_PAGE_SIZE: usize = 25;

/// Read/write service over one logical dataset
pub struct TimeSeriesService<B> {
    metadata: IndexMetadata,
    strategy: IndexStrategy,
    backend: Arc<B>,
}

impl<B: SearchBackend> TimeSeriesService<B> {
    /// Create a service for a dataset
    pub fn new(metadata: IndexMetadata, strategy: IndexStrategy, backend: Arc<B>) -> Self {
        Self {
            metadata,
            strategy,
            backend,
        }
    }

    /// Dataset metadata
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Default-sort by the timestamp property, descending, when the
    /// caller supplies no explicit ordering.
    fn apply_sort(&self, mut param: QueryParam) -> QueryParam {
        if param.sorts.is_empty() {
            param
                .sorts
                .push(Sort::desc(self.metadata.timestamp_property_id()));
        }
        param
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Query records matching the parameter, streaming results
    pub fn query(&self, param: QueryParam) -> BoxStream<'static, Result<TimeSeriesRecord>> {
        let param = self.apply_sort(param);
        let segments = self.strategy.read_targets(&self.metadata, &param.terms);
        let query = translate::translate(&param.terms, Some(&self.metadata));
        self.backend
            .execute_query(&segments, &query, &param.sorts, param.paging)
            .map(|item| item.map(TimeSeriesRecord::from_row))
            .boxed()
    }

    /// Run several queries against the dataset as one result stream
    pub fn multi_query(
        &self,
        params: Vec<QueryParam>,
    ) -> BoxStream<'static, Result<TimeSeriesRecord>> {
        let streams: Vec<_> = params.into_iter().map(|param| self.query(param)).collect();
        futures::stream::iter(streams).flatten().boxed()
    }

    /// Count records matching the parameter
    pub async fn count(&self, param: QueryParam) -> Result<u64> {
        let segments = self.strategy.read_targets(&self.metadata, &param.terms);
        let query = translate::translate(&param.terms, Some(&self.metadata));
        self.backend.count(&segments, &query).await
    }

    /// Query one page of records with the total match count
    pub async fn query_pager(&self, param: QueryParam) -> Result<PagedResult<TimeSeriesRecord>> {
        let param = self.apply_sort(param);
        let paging = param.paging.unwrap_or(Paging {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        });
        let segments = self.strategy.read_targets(&self.metadata, &param.terms);
        let query = translate::translate(&param.terms, Some(&self.metadata));
        let total = self.backend.count(&segments, &query).await?;
        let data = self
            .backend
            .execute_query(&segments, &query, &param.sorts, Some(paging))
            .map_ok(TimeSeriesRecord::from_row)
            .try_collect()
            .await?;
        Ok(PagedResult {
            page_index: paging.page_index,
            page_size: paging.page_size,
            total,
            data,
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Prepare a record row for persistence: the timestamp rides under
    /// the dataset's timestamp property and a missing id is assigned a
    /// freshly generated random one.
    fn prepare_row(&self, record: TimeSeriesRecord) -> RecordRow {
        let mut row = record.data;
        row.insert(
            self.metadata.timestamp_property_id().to_string(),
            json!(record.timestamp),
        );
        row.entry("id")
            .or_insert_with(|| json!(Uuid::new_v4().simple().to_string()));
        row
    }

    /// Write one record to the dataset's primary alias.
    ///
    /// Per-record repartitioning, if any, happens inside the backend's
    /// per-document save path. No synchronous read-after-write guarantee
    /// is provided.
    pub async fn commit(&self, record: TimeSeriesRecord) -> Result<()> {
        let row = self.prepare_row(record);
        self.backend.write(self.metadata.name(), row).await
    }

    /// Write a batch of records to the dataset's primary alias
    pub async fn commit_batch(&self, records: Vec<TimeSeriesRecord>) -> Result<()> {
        let rows = records
            .into_iter()
            .map(|record| self.prepare_row(record))
            .collect();
        self.backend.write_batch(self.metadata.name(), rows).await
    }

    /// Drain a record stream into a single batched write
    pub async fn save<S>(&self, records: S) -> Result<()>
    where
        S: Stream<Item = TimeSeriesRecord> + Send,
    {
        let records: Vec<_> = records.collect().await;
        if records.is_empty() {
            return Ok(());
        }
        self.commit_batch(records).await
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Run a grouped, time-bucketed aggregation across the dataset.
    ///
    /// Returns a lazy, finite, non-restartable stream. With a time group
    /// present the sparse backend output is reshaped into one dense,
    /// gap-filled bucket grid per distinct combination of non-time group
    /// values; without one raw buckets pass through 1:1. Upstream errors
    /// are logged and downgraded to early completion, favoring partial
    /// dashboards over strict failure signaling. The result limit
    /// truncates the flattened bucket list after grid assembly.
    pub fn aggregate(
        &self,
        param: AggregationQueryParam,
    ) -> Result<BoxStream<'static, AggregationData>> {
        param.validate()?;

        let window = Term::btw(
            self.metadata.timestamp_property_id(),
            param.from,
            param.to,
        );
        let segments = self.strategy.read_targets(&self.metadata, &[window]);
        let spec = param.to_native(Some(&self.metadata));

        let rows = self
            .backend
            .execute_aggregation(&segments, &spec)
            .take_while(|item| {
                if let Err(err) = item {
                    error!(error = %err, "aggregation stream failed, returning partial results");
                }
                futures::future::ready(item.is_ok())
            })
            .filter_map(|item| futures::future::ready(item.ok()))
            .boxed();

        let limit = param.limit;
        let stream = match param.time_group().cloned() {
            None => rows.map(AggregationData::of).boxed(),
            Some(time_group) => futures::stream::once(assemble_grids(rows, param, time_group))
                .map(futures::stream::iter)
                .flatten()
                .boxed(),
        };
        Ok(apply_limit(stream, limit))
    }
}

fn apply_limit(
    stream: BoxStream<'static, AggregationData>,
    limit: usize,
) -> BoxStream<'static, AggregationData> {
    if limit > 0 {
        stream.take(limit).boxed()
    } else {
        stream
    }
}

/// Drain the raw bucket stream into dense per-group grids.
///
/// The grid map is the only shared mutable state of an aggregation call:
/// in-flight result-processing steps get-or-create their group's grid
/// atomically, so a race on first sighting of a key never produces two
/// grids for the same group-value tuple. Rows whose timestamp falls
/// outside every prepared bucket are dropped silently. An upstream that
/// completes empty still yields exactly one fully empty grid.
async fn assemble_grids(
    rows: BoxStream<'static, RecordRow>,
    param: AggregationQueryParam,
    time_group: TimeGroup,
) -> Vec<AggregationData> {
    let grids: DashMap<GroupKey, BucketGrid> = DashMap::new();
    let width = time_group.interval.as_millis().max(1);
    let aliases: Vec<String> = param
        .property_group_aliases()
        .map(String::from)
        .collect();

    rows.for_each_concurrent(None, |row| {
        let grids = &grids;
        let param = &param;
        let time_group = &time_group;
        let aliases = &aliases;
        async move {
            let key = GroupKey::from_row(&row, aliases.iter().map(String::as_str));
            let mut grid = grids
                .entry(key)
                .or_insert_with(|| prepare_grid(param, time_group));
            let timestamp = row_time(&row, &time_group.alias);
            if let Some(boundary) = find_bucket(timestamp, &grid, width) {
                if let Some(bucket) = grid.get_mut(&boundary) {
                    merge_into_bucket(&row, bucket, &time_group.alias);
                }
            }
        }
    })
    .await;

    if grids.is_empty() {
        // charting callers always see a complete, gap-filled time axis
        grids.insert(
            GroupKey::from_row(&RecordRow::new(), std::iter::empty()),
            prepare_grid(&param, &time_group),
        );
    }

    grids
        .into_iter()
        .flat_map(|(_, grid)| grid.into_values())
        .map(AggregationData::of)
        .collect()
}
