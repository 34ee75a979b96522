//! Native query dialect of the document search backend
//!
//! [`NativeQuery`] is the nested boolean query representation the backend
//! consumes. This core only produces it; downstream collaborators treat
//! it as opaque and serialize it with [`NativeQuery::to_json`] into the
//! backend's wire body.

use serde_json::{json, Map, Value};

use crate::index::Interval;
use crate::service::aggregation::AggregationFunction;

// ============================================================================
// Query Dialect
// ============================================================================

/// Relevance scoring mode of a nested clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
    /// Average child score (backend default)
    Avg,
    /// Existence-only semantics, no relevance contribution
    None,
}

/// Boolean compound clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    /// Conjunctive clauses (all must match)
    pub must: Vec<NativeQuery>,
    /// Disjunctive clauses (at least one should match)
    pub should: Vec<NativeQuery>,
}

impl BoolQuery {
    /// Create an empty boolean clause
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the clause constrains anything
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty()
    }
}

/// Native nested boolean query
#[derive(Debug, Clone, PartialEq)]
pub enum NativeQuery {
    /// Match every document
    MatchAll,
    /// Exact value on a single field
    Term {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Membership in a value set
    Terms {
        /// Field name
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// Bounded range on a single field
    Range {
        /// Field name
        field: String,
        /// Inclusive lower bound
        gte: Option<Value>,
        /// Inclusive upper bound
        lte: Option<Value>,
        /// Exclusive lower bound
        gt: Option<Value>,
        /// Exclusive upper bound
        lt: Option<Value>,
    },
    /// Wildcard pattern match
    Wildcard {
        /// Field name
        field: String,
        /// Pattern with `*` wildcards
        pattern: String,
    },
    /// Field existence check
    Exists {
        /// Field name
        field: String,
    },
    /// Negation of an inner clause
    Not(Box<NativeQuery>),
    /// Boolean compound
    Bool(BoolQuery),
    /// Clause scoped to a nested-object path
    Nested {
        /// Nested-object path prefix
        path: String,
        /// Inner clause, fields addressed by full path
        query: Box<NativeQuery>,
        /// Scoring mode; `None` for existence-only semantics
        score_mode: Option<ScoreMode>,
    },
}

impl NativeQuery {
    /// Wrap clauses into a conjunctive boolean query
    pub fn all_of(clauses: Vec<NativeQuery>) -> NativeQuery {
        NativeQuery::Bool(BoolQuery {
            must: clauses,
            should: Vec::new(),
        })
    }

    /// Render the backend wire body for this query
    pub fn to_json(&self) -> Value {
        match self {
            NativeQuery::MatchAll => json!({ "match_all": {} }),
            NativeQuery::Term { field, value } => json!({ "term": { field: value } }),
            NativeQuery::Terms { field, values } => json!({ "terms": { field: values } }),
            NativeQuery::Range {
                field,
                gte,
                lte,
                gt,
                lt,
            } => {
                let mut bounds = Map::new();
                if let Some(v) = gte {
                    bounds.insert("gte".into(), v.clone());
                }
                if let Some(v) = lte {
                    bounds.insert("lte".into(), v.clone());
                }
                if let Some(v) = gt {
                    bounds.insert("gt".into(), v.clone());
                }
                if let Some(v) = lt {
                    bounds.insert("lt".into(), v.clone());
                }
                json!({ "range": { field: bounds } })
            }
            NativeQuery::Wildcard { field, pattern } => {
                json!({ "wildcard": { field: pattern } })
            }
            NativeQuery::Exists { field } => json!({ "exists": { "field": field } }),
            NativeQuery::Not(inner) => json!({ "bool": { "must_not": [inner.to_json()] } }),
            NativeQuery::Bool(bool_query) => {
                let mut body = Map::new();
                if !bool_query.must.is_empty() {
                    body.insert(
                        "must".into(),
                        Value::Array(bool_query.must.iter().map(NativeQuery::to_json).collect()),
                    );
                }
                if !bool_query.should.is_empty() {
                    body.insert(
                        "should".into(),
                        Value::Array(bool_query.should.iter().map(NativeQuery::to_json).collect()),
                    );
                }
                json!({ "bool": body })
            }
            NativeQuery::Nested {
                path,
                query,
                score_mode,
            } => {
                let mut body = Map::new();
                body.insert("path".into(), json!(path));
                body.insert("query".into(), query.to_json());
                if let Some(ScoreMode::None) = score_mode {
                    body.insert("score_mode".into(), json!("none"));
                }
                json!({ "nested": body })
            }
        }
    }
}

// ============================================================================
// Aggregation Dialect
// ============================================================================

/// One grouping dimension of a native aggregation
#[derive(Debug, Clone, PartialEq)]
pub enum NativeGroup {
    /// Bucket per distinct field value
    Terms {
        /// Field to group on
        field: String,
        /// Result alias
        alias: String,
    },
    /// Fixed-width time histogram over a bounded window
    DateHistogram {
        /// Timestamp field
        field: String,
        /// Result alias
        alias: String,
        /// Bucket width
        interval: Interval,
        /// Window the histogram must cover even when empty
        extended_bounds: (i64, i64),
    },
}

/// One per-bucket metric of a native aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct NativeFunction {
    /// Aggregation function
    pub function: AggregationFunction,
    /// Property the function runs over
    pub property: String,
    /// Result alias
    pub alias: String,
}

/// Native aggregation specification, consumed opaquely by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct NativeAggregation {
    /// Pre-aggregation filter
    pub query: NativeQuery,
    /// Grouping dimensions, outermost first
    pub groups: Vec<NativeGroup>,
    /// Per-bucket metrics
    pub functions: Vec<NativeFunction>,
    /// Result-count limit, `0` meaning unlimited
    pub limit: usize,
}

impl NativeAggregation {
    /// Render the backend wire body for this aggregation
    pub fn to_json(&self) -> Value {
        let mut aggs = Map::new();
        for function in &self.functions {
            aggs.insert(
                function.alias.clone(),
                json!({ function.function.id(): { "field": function.property } }),
            );
        }
        // nest each grouping level around the metrics, innermost last
        let mut body = Value::Object(aggs);
        for group in self.groups.iter().rev() {
            let (alias, clause) = match group {
                NativeGroup::Terms { field, alias } => (
                    alias.clone(),
                    json!({ "terms": { "field": field }, "aggs": body }),
                ),
                NativeGroup::DateHistogram {
                    field,
                    alias,
                    interval,
                    extended_bounds,
                } => (
                    alias.clone(),
                    json!({
                        "date_histogram": {
                            "field": field,
                            "fixed_interval": format!("{}ms", interval.as_millis()),
                            "extended_bounds": {
                                "min": extended_bounds.0,
                                "max": extended_bounds.1,
                            },
                        },
                        "aggs": body,
                    }),
                ),
            };
            let mut level = Map::new();
            level.insert(alias, clause);
            body = Value::Object(level);
        }
        json!({
            "size": 0,
            "query": self.query.to_json(),
            "aggs": body,
        })
    }
}
