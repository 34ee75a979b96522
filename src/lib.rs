//! Timedex - Time-series secondary storage over a document search engine
//!
//! This library turns a document search engine into a time-series store:
//! - Time-partitioned physical segments (daily or weekly) behind one logical dataset
//! - Engine-agnostic filter terms translated into the native nested boolean dialect
//! - Streaming query execution with paging, sorting and counting
//! - Grouped aggregation with dense, gap-filled time-bucket grids

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod index;
pub mod types;

/// Filter translation into the backend's native query dialect
pub mod translate;

/// Query execution, persistence and aggregation services
pub mod service;

// Re-export main types
pub use error::{Error, Result};
pub use index::{IndexMetadata, IndexStrategy, Interval};
pub use service::{AggregationQueryParam, SearchBackend, TimeSeriesService};
pub use types::{QueryParam, TimeSeriesRecord};
