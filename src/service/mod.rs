//! Query execution and aggregation services

pub mod aggregation;
pub mod backend;
pub mod timeseries;

pub use aggregation::{
    AggregationColumn, AggregationData, AggregationFunction, AggregationQueryParam, Group, GroupBy,
    TimeGroup,
};
pub use backend::{MetadataRegistry, SearchBackend};
pub use timeseries::TimeSeriesService;
