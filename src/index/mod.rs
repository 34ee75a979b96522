//! Logical dataset metadata and physical segment resolution
//!
//! A logical dataset is a caller-visible named record collection. This
//! module describes its schema ([`IndexMetadata`]) and maps records and
//! query time ranges onto physical, time-bounded segments
//! ([`IndexStrategy`]) without callers ever naming a segment directly.

pub mod interval;
pub mod metadata;
pub mod strategy;

pub use interval::Interval;
pub use metadata::{IndexMetadata, PropertyMetadata, PropertyType};
pub use strategy::{IndexStrategy, PartitionPolicy};
