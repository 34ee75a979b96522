//! Shared record and query-parameter types
//!
//! Records are schema-flexible JSON objects keyed by property id. The
//! timestamp is carried as epoch milliseconds under the dataset's declared
//! timestamp property (default `timestamp`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::translate::Term;

/// Raw record shape exchanged with the document store
pub type RecordRow = Map<String, Value>;

// ============================================================================
// Value Coercion
// ============================================================================

/// Coerce a JSON value to epoch milliseconds.
///
/// Accepts integers, floats, numeric strings and RFC 3339 date strings.
/// Returns `None` when the value cannot be interpreted as an instant.
pub fn cast_epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Some(v);
            }
            if let Ok(v) = s.parse::<f64>() {
                return Some(v as i64);
            }
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis())
        }
        _ => None,
    }
}

// ============================================================================
// Time-Series Record
// ============================================================================

/// A single timestamped record of a logical dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Record body, keyed by property id
    pub data: RecordRow,
}

impl TimeSeriesRecord {
    /// Create a record from a timestamp and body
    pub fn of(timestamp: i64, data: RecordRow) -> Self {
        Self { timestamp, data }
    }

    /// Create a record from a raw backend hit.
    ///
    /// The timestamp is read from the `timestamp` field; a missing or
    /// unparseable value maps to `0` rather than an error.
    pub fn from_row(data: RecordRow) -> Self {
        let timestamp = data
            .get("timestamp")
            .and_then(cast_epoch_millis)
            .unwrap_or(0);
        Self { timestamp, data }
    }

    /// Get a field from the record body
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a field coerced to a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

/// Result ordering on a single property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// Property id to order by
    pub name: String,
    /// Sort direction
    pub order: SortOrder,
}

impl Sort {
    /// Ascending sort on a property
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on a property
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Zero-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Zero-based page index
    pub page_index: usize,
    /// Page size
    pub page_size: usize,
}

impl Paging {
    /// Offset of the first row of the page
    pub fn offset(&self) -> usize {
        self.page_index * self.page_size
    }
}

/// Structured query parameter: filter terms, sorts and optional paging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParam {
    /// Filter term sequence
    pub terms: Vec<Term>,
    /// Result ordering, in priority order
    pub sorts: Vec<Sort>,
    /// Optional page window
    pub paging: Option<Paging>,
}

impl QueryParam {
    /// Create an empty query parameter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter term
    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Add a sort
    pub fn order_by(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Set the page window
    pub fn paging(mut self, page_index: usize, page_size: usize) -> Self {
        self.paging = Some(Paging {
            page_index,
            page_size,
        });
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Zero-based page index
    pub page_index: usize,
    /// Requested page size
    pub page_size: usize,
    /// Total matching rows across all pages
    pub total: u64,
    /// Rows of this page
    pub data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_epoch_millis_variants() {
        assert_eq!(cast_epoch_millis(&json!(1700000000000i64)), Some(1700000000000));
        assert_eq!(cast_epoch_millis(&json!(1700000000000.0)), Some(1700000000000));
        assert_eq!(cast_epoch_millis(&json!("1700000000000")), Some(1700000000000));
        assert_eq!(
            cast_epoch_millis(&json!("2023-11-14T22:13:20Z")),
            Some(1700000000000)
        );
        assert_eq!(cast_epoch_millis(&json!("not a time")), None);
        assert_eq!(cast_epoch_millis(&json!(null)), None);
        assert_eq!(cast_epoch_millis(&json!([1, 2])), None);
    }

    #[test]
    fn test_record_from_row_defaults_timestamp() {
        let mut row = RecordRow::new();
        row.insert("value".into(), json!(42));
        let record = TimeSeriesRecord::from_row(row);
        assert_eq!(record.timestamp, 0);
        assert_eq!(record.get("value"), Some(&json!(42)));
    }

    #[test]
    fn test_paging_offset() {
        let paging = Paging {
            page_index: 3,
            page_size: 25,
        };
        assert_eq!(paging.offset(), 75);
    }
}
