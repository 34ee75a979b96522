//! Filter term model
//!
//! A [`Term`] is one node of an engine-agnostic filter expression: a
//! column path, an operator id, the value(s) to compare against, the
//! boolean connective to its next sibling, and optional child terms
//! forming a nested sub-expression. A dot in the column path denotes
//! nested-object traversal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boolean connective linking a term to its next sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Connective {
    /// Both conditions must hold
    #[default]
    And,
    /// Either condition may hold
    Or,
}

/// One filter condition or connective node in a query's expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Column path; a dot separates a nested-object prefix from the field
    pub column: String,
    /// Operator id, resolved against the operator registry
    pub operator: String,
    /// Comparison value(s); a term without a value renders no leaf clause
    pub value: Option<Value>,
    /// Connective to the next sibling term
    pub connective: Connective,
    /// Child terms forming a nested sub-expression
    pub terms: Vec<Term>,
}

impl Term {
    /// Create a leaf term
    pub fn new(column: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: Some(value),
            connective: Connective::And,
            terms: Vec::new(),
        }
    }

    /// Equality term
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, "eq", value)
    }

    /// Inclusive range term over `[start, end]`
    pub fn btw(column: impl Into<String>, start: i64, end: i64) -> Self {
        Self::new(column, "btw", Value::Array(vec![start.into(), end.into()]))
    }

    /// Membership term
    pub fn in_values(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(column, "in", Value::Array(values))
    }

    /// Substring match term
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(column, "like", Value::String(pattern.into()))
    }

    /// Null-check term
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: "isnull".into(),
            value: Some(Value::Bool(true)),
            connective: Connective::And,
            terms: Vec::new(),
        }
    }

    /// Non-null-check term
    pub fn not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: "notnull".into(),
            value: Some(Value::Bool(true)),
            connective: Connective::And,
            terms: Vec::new(),
        }
    }

    /// Mark this term as OR-connected to its predecessor
    pub fn or(mut self) -> Self {
        self.connective = Connective::Or;
        self
    }

    /// Attach child terms forming a nested sub-expression
    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.terms = terms;
        self
    }

    /// Split the column on the first path separator.
    ///
    /// Returns `(nested_path_prefix, remainder)` for dotted columns; a
    /// column with several separators keeps everything after the first
    /// one intact.
    pub fn split_column(&self) -> Option<(&str, &str)> {
        self.column.split_once('.')
    }
}
