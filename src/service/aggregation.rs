//! Aggregation parameter model and bucket-grid assembly
//!
//! An aggregation request groups records by zero or more dimensions, at
//! most one of which may be a time group (fixed bucket width over a
//! bounded window). The backend returns a sparse bucket-row stream; the
//! service reshapes it into a dense, gap-filled grid per distinct
//! combination of non-time group values, so charting callers always see
//! a complete time axis.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::index::metadata::{IndexMetadata, DEFAULT_TIMESTAMP_PROPERTY};
use crate::index::Interval;
use crate::translate::{self, NativeAggregation, NativeFunction, NativeGroup, Term};
use crate::types::{cast_epoch_millis, RecordRow};

// ============================================================================
// Aggregation Functions
// ============================================================================

/// Per-bucket aggregation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationFunction {
    /// Count of values
    Count,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Arithmetic mean
    Avg,
    /// Earliest value in the bucket
    First,
    /// Latest value in the bucket
    Last,
}

impl AggregationFunction {
    /// Native function id understood by the backend
    pub fn id(&self) -> &'static str {
        match self {
            AggregationFunction::Count => "value_count",
            AggregationFunction::Sum => "sum",
            AggregationFunction::Min => "min",
            AggregationFunction::Max => "max",
            AggregationFunction::Avg => "avg",
            AggregationFunction::First => "first",
            AggregationFunction::Last => "last",
        }
    }
}

/// One aggregated output column
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationColumn {
    /// Function to apply
    pub function: AggregationFunction,
    /// Property the function runs over
    pub property: String,
    /// Output alias
    pub alias: String,
}

impl AggregationColumn {
    /// Create an output column
    pub fn new(
        function: AggregationFunction,
        property: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            function,
            property: property.into(),
            alias: alias.into(),
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Grouping on a record property
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Property to group on
    pub property: String,
    /// Output alias carrying the group value
    pub alias: String,
}

impl Group {
    /// Create a property group
    pub fn new(property: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            alias: alias.into(),
        }
    }
}

/// Grouping into fixed-width time buckets
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGroup {
    /// Timestamp property to bucket on; `None` resolves to the dataset's
    /// designated timestamp property at request build time
    pub property: Option<String>,
    /// Output alias carrying the bucket boundary
    pub alias: String,
    /// Bucket width
    pub interval: Interval,
}

impl TimeGroup {
    /// Create a time group over the dataset's designated timestamp property
    pub fn new(interval: Interval, alias: impl Into<String>) -> Self {
        Self {
            property: None,
            alias: alias.into(),
            interval,
        }
    }

    /// Create a time group over an explicit timestamp property
    pub fn of_property(
        property: impl Into<String>,
        interval: Interval,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            property: Some(property.into()),
            alias: alias.into(),
            interval,
        }
    }
}

/// One grouping dimension of an aggregation request
#[derive(Debug, Clone, PartialEq)]
pub enum GroupBy {
    /// Bucket per distinct property value
    Property(Group),
    /// Fixed-width time buckets
    Time(TimeGroup),
}

// ============================================================================
// Aggregation Query Parameter
// ============================================================================

/// Aggregation request: window, groupings, output columns and limit
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationQueryParam {
    /// Window start, epoch milliseconds, inclusive
    pub from: i64,
    /// Window end, epoch milliseconds, exclusive for bucket layout
    pub to: i64,
    /// Grouping dimensions; at most one may be a time group
    pub groups: Vec<GroupBy>,
    /// Output columns
    pub columns: Vec<AggregationColumn>,
    /// Result-count limit applied after grid assembly, `0` = unlimited
    pub limit: usize,
    /// Pre-aggregation filter terms
    pub filter: Vec<Term>,
}

impl AggregationQueryParam {
    /// Create a request over a time window
    pub fn of(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            groups: Vec::new(),
            columns: Vec::new(),
            limit: 0,
            filter: Vec::new(),
        }
    }

    /// Add a grouping dimension
    pub fn group_by(mut self, group: GroupBy) -> Self {
        self.groups.push(group);
        self
    }

    /// Add an output column
    pub fn agg(mut self, column: AggregationColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a pre-aggregation filter term
    pub fn filter(mut self, term: Term) -> Self {
        self.filter.push(term);
        self
    }

    /// Set the result-count limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The request's time group, if any
    pub fn time_group(&self) -> Option<&TimeGroup> {
        self.groups.iter().find_map(|group| match group {
            GroupBy::Time(tg) => Some(tg),
            GroupBy::Property(_) => None,
        })
    }

    /// Aliases of the non-time grouping dimensions
    pub fn property_group_aliases(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().filter_map(|group| match group {
            GroupBy::Property(g) => Some(g.alias.as_str()),
            GroupBy::Time(_) => None,
        })
    }

    /// Validate the request before execution
    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(Error::aggregation(format!(
                "window start {} is after end {}",
                self.from, self.to
            )));
        }
        if self.columns.is_empty() {
            return Err(Error::aggregation("at least one output column is required"));
        }
        let time_groups = self
            .groups
            .iter()
            .filter(|g| matches!(g, GroupBy::Time(_)))
            .count();
        if time_groups > 1 {
            return Err(Error::aggregation(
                "at most one time group is allowed per request",
            ));
        }
        Ok(())
    }

    /// Build the backend-native aggregation specification.
    ///
    /// The request window rides along as a range filter on the resolved
    /// timestamp property: the time group's explicit property when set,
    /// otherwise the dataset's designated one.
    pub fn to_native(&self, metadata: Option<&IndexMetadata>) -> NativeAggregation {
        let designated = metadata
            .map(|m| m.timestamp_property_id().to_string())
            .unwrap_or_else(|| DEFAULT_TIMESTAMP_PROPERTY.to_string());

        let mut terms = self.filter.clone();
        let timestamp_property = self
            .time_group()
            .and_then(|tg| tg.property.clone())
            .unwrap_or_else(|| designated.clone());
        terms.push(Term::btw(timestamp_property, self.from, self.to));

        let groups = self
            .groups
            .iter()
            .map(|group| match group {
                GroupBy::Property(g) => NativeGroup::Terms {
                    field: g.property.clone(),
                    alias: g.alias.clone(),
                },
                GroupBy::Time(tg) => NativeGroup::DateHistogram {
                    field: tg.property.clone().unwrap_or_else(|| designated.clone()),
                    alias: tg.alias.clone(),
                    interval: tg.interval,
                    extended_bounds: (self.from, self.to),
                },
            })
            .collect();

        let functions = self
            .columns
            .iter()
            .map(|column| NativeFunction {
                function: column.function,
                property: column.property.clone(),
                alias: column.alias.clone(),
            })
            .collect();

        NativeAggregation {
            query: translate::translate(&terms, metadata),
            groups,
            functions,
            limit: self.limit,
        }
    }
}

// ============================================================================
// Aggregation Output
// ============================================================================

/// One aggregated bucket: alias to value mapping
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationData {
    values: RecordRow,
}

impl AggregationData {
    /// Wrap a raw bucket row
    pub fn of(values: RecordRow) -> Self {
        Self { values }
    }

    /// Get a value by alias
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.values.get(alias)
    }

    /// Get a value by alias, coerced to an integer
    pub fn get_i64(&self, alias: &str) -> Option<i64> {
        self.values.get(alias).and_then(cast_epoch_millis)
    }

    /// Get a value by alias, coerced to a float
    pub fn get_f64(&self, alias: &str) -> Option<f64> {
        self.values.get(alias).and_then(Value::as_f64)
    }

    /// The full alias-to-value mapping
    pub fn values(&self) -> &RecordRow {
        &self.values
    }
}

// ============================================================================
// Bucket Grids
// ============================================================================

/// Frozen, order-independent tuple of group values.
///
/// Keys the per-call grid map: canonical value encodings, sorted, so key
/// identity never depends on group declaration order or on a mutable
/// structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    /// Build a key from the row's values under the non-time group aliases
    pub fn from_row<'a>(row: &RecordRow, aliases: impl Iterator<Item = &'a str>) -> Self {
        let mut parts: Vec<String> = aliases
            .map(|alias| {
                row.get(alias)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        parts.sort();
        Self(parts)
    }
}

/// Dense time-ordered bucket grid for one group-value combination
pub type BucketGrid = BTreeMap<i64, RecordRow>;

/// Prepare a dense grid of empty buckets spanning the request window.
///
/// Boundaries start at the window start and step by the time group's
/// width while strictly inside the window. Every bucket is pre-filled
/// with its own boundary under the time group's alias; that value stays
/// authoritative over whatever time a raw row later reports.
pub fn prepare_grid(param: &AggregationQueryParam, time_group: &TimeGroup) -> BucketGrid {
    let width = time_group.interval.as_millis().max(1);
    let mut grid = BucketGrid::new();
    let mut boundary = param.from;
    while boundary < param.to {
        let mut bucket = RecordRow::new();
        bucket.insert(time_group.alias.clone(), Value::Number(boundary.into()));
        grid.insert(boundary, bucket);
        boundary = match boundary.checked_add(width) {
            Some(next) => next,
            None => break,
        };
    }
    grid
}

/// Find the boundary of the prepared bucket enclosing `timestamp`.
///
/// Returns `None` when the timestamp falls outside every prepared
/// bucket's bounds; such rows are dropped silently rather than raised.
pub fn find_bucket(timestamp: i64, grid: &BucketGrid, width: i64) -> Option<i64> {
    let (&boundary, _) = grid.range(..=timestamp).next_back()?;
    (timestamp < boundary.saturating_add(width.max(1))).then_some(boundary)
}

/// Copy a raw row's aggregated fields into its enclosing bucket.
///
/// Every field except the time alias is copied; the bucket keeps its own
/// boundary as the authoritative time value.
pub fn merge_into_bucket(row: &RecordRow, bucket: &mut RecordRow, time_alias: &str) {
    for (key, value) in row {
        if key == time_alias || key == "_time" {
            continue;
        }
        bucket.insert(key.clone(), value.clone());
    }
}

/// Bucket timestamp reported by a raw aggregation row.
///
/// The backend reports it under `_time`; the time group's alias is the
/// fallback. Missing or unparseable values map to `0`.
pub fn row_time(row: &RecordRow, time_alias: &str) -> i64 {
    row.get("_time")
        .or_else(|| row.get(time_alias))
        .and_then(cast_epoch_millis)
        .unwrap_or(0)
}
