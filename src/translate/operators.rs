//! Operator registry
//!
//! Maps operator ids to the pair of hooks a leaf term needs: a render
//! hook producing the native clause and a coercion hook adapting the
//! term's literal value(s) to the declared property type. The table is
//! populated once at initialization and read-only afterwards.

use lazy_static::lazy_static;
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::dsl::NativeQuery;
use super::term::Term;
use crate::index::metadata::PropertyType;
use crate::types::cast_epoch_millis;

/// Render and coercion hooks of one operator id
pub struct TermOperator {
    /// Operator id
    pub id: &'static str,
    render: fn(&Term) -> Option<NativeQuery>,
    convert: fn(&PropertyType, &Value) -> Value,
}

impl TermOperator {
    /// Render a leaf term into its native clause
    pub fn render(&self, term: &Term) -> Option<NativeQuery> {
        (self.render)(term)
    }

    /// Coerce a term value to the declared property type
    pub fn convert_value(&self, property_type: &PropertyType, value: &Value) -> Value {
        (self.convert)(property_type, value)
    }
}

lazy_static! {
    static ref OPERATORS: HashMap<&'static str, TermOperator> = {
        let mut table = HashMap::new();
        for op in [
            TermOperator { id: "eq", render: render_eq, convert: convert_scalar },
            TermOperator { id: "not", render: render_not, convert: convert_scalar },
            TermOperator { id: "gt", render: render_gt, convert: convert_scalar },
            TermOperator { id: "gte", render: render_gte, convert: convert_scalar },
            TermOperator { id: "lt", render: render_lt, convert: convert_scalar },
            TermOperator { id: "lte", render: render_lte, convert: convert_scalar },
            TermOperator { id: "btw", render: render_btw, convert: convert_list },
            TermOperator { id: "nbtw", render: render_nbtw, convert: convert_list },
            TermOperator { id: "in", render: render_in, convert: convert_list },
            TermOperator { id: "nin", render: render_nin, convert: convert_list },
            TermOperator { id: "like", render: render_like, convert: convert_passthrough },
            TermOperator { id: "nlike", render: render_nlike, convert: convert_passthrough },
            TermOperator { id: "isnull", render: render_isnull, convert: convert_passthrough },
            TermOperator { id: "notnull", render: render_notnull, convert: convert_passthrough },
        ] {
            table.insert(op.id, op);
        }
        table
    };
}

/// Look up an operator by id, case-insensitive.
///
/// Unknown ids resolve to `None`; the translator drops such leaves from
/// the native query rather than failing the whole translation.
pub fn lookup(id: &str) -> Option<&'static TermOperator> {
    OPERATORS
        .get(id)
        .or_else(|| OPERATORS.get(id.to_lowercase().as_str()))
}

// ============================================================================
// Value Coercion
// ============================================================================

fn convert_passthrough(_property_type: &PropertyType, value: &Value) -> Value {
    value.clone()
}

/// Coerce a single literal to the declared type.
///
/// Unconvertible values pass through unchanged; the backend is left to
/// reject them if it must.
fn convert_scalar(property_type: &PropertyType, value: &Value) -> Value {
    match property_type {
        PropertyType::Long => cast_epoch_millis(value)
            .map(|v| Value::Number(v.into()))
            .unwrap_or_else(|| value.clone()),
        PropertyType::Double => as_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        PropertyType::Bool => as_bool(value).map(Value::Bool).unwrap_or_else(|| value.clone()),
        PropertyType::Date => cast_epoch_millis(value)
            .map(|v| Value::Number(v.into()))
            .unwrap_or_else(|| value.clone()),
        PropertyType::String => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value.clone(),
        },
        PropertyType::Array(element) => convert_scalar(element, value),
        PropertyType::Object => value.clone(),
    }
}

/// Coerce a multi-valued literal element-wise.
///
/// A comma-separated string is split into elements first, so `in` and
/// `btw` accept both array and `"a,b,c"` shapes.
fn convert_list(property_type: &PropertyType, value: &Value) -> Value {
    let elements = split_values(value);
    Value::Array(
        elements
            .iter()
            .map(|element| convert_scalar(property_type, element))
            .collect(),
    )
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "y" => Some(true),
            "false" | "0" | "n" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Split a literal into its element list: arrays as-is, comma-separated
/// strings split, anything else a single element.
pub fn split_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) if s.contains(',') => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

// ============================================================================
// Render Hooks
// ============================================================================

fn render_eq(term: &Term) -> Option<NativeQuery> {
    Some(NativeQuery::Term {
        field: term.column.clone(),
        value: term.value.clone()?,
    })
}

fn render_not(term: &Term) -> Option<NativeQuery> {
    render_eq(term).map(|q| NativeQuery::Not(Box::new(q)))
}

fn render_gt(term: &Term) -> Option<NativeQuery> {
    term.value.clone().map(|value| NativeQuery::Range {
        field: term.column.clone(),
        gte: None,
        lte: None,
        gt: Some(value),
        lt: None,
    })
}

fn render_gte(term: &Term) -> Option<NativeQuery> {
    term.value.clone().map(|value| NativeQuery::Range {
        field: term.column.clone(),
        gte: Some(value),
        lte: None,
        gt: None,
        lt: None,
    })
}

fn render_lt(term: &Term) -> Option<NativeQuery> {
    term.value.clone().map(|value| NativeQuery::Range {
        field: term.column.clone(),
        gte: None,
        lte: None,
        gt: None,
        lt: Some(value),
    })
}

fn render_lte(term: &Term) -> Option<NativeQuery> {
    term.value.clone().map(|value| NativeQuery::Range {
        field: term.column.clone(),
        gte: None,
        lte: Some(value),
        gt: None,
        lt: None,
    })
}

fn render_btw(term: &Term) -> Option<NativeQuery> {
    let values = split_values(term.value.as_ref()?);
    let (start, end) = match values.as_slice() {
        [start, end, ..] => (start.clone(), end.clone()),
        _ => return None,
    };
    Some(NativeQuery::Range {
        field: term.column.clone(),
        gte: Some(start),
        lte: Some(end),
        gt: None,
        lt: None,
    })
}

fn render_nbtw(term: &Term) -> Option<NativeQuery> {
    render_btw(term).map(|q| NativeQuery::Not(Box::new(q)))
}

fn render_in(term: &Term) -> Option<NativeQuery> {
    Some(NativeQuery::Terms {
        field: term.column.clone(),
        values: split_values(term.value.as_ref()?),
    })
}

fn render_nin(term: &Term) -> Option<NativeQuery> {
    render_in(term).map(|q| NativeQuery::Not(Box::new(q)))
}

fn render_like(term: &Term) -> Option<NativeQuery> {
    let raw = match term.value.as_ref()? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    // `%` is the generic wildcard; a bare literal matches as a substring
    let pattern = raw.replace('%', "*");
    let pattern = if pattern.contains('*') {
        pattern
    } else {
        format!("*{pattern}*")
    };
    Some(NativeQuery::Wildcard {
        field: term.column.clone(),
        pattern,
    })
}

fn render_nlike(term: &Term) -> Option<NativeQuery> {
    render_like(term).map(|q| NativeQuery::Not(Box::new(q)))
}

fn render_isnull(term: &Term) -> Option<NativeQuery> {
    Some(NativeQuery::Not(Box::new(NativeQuery::Exists {
        field: term.column.clone(),
    })))
}

fn render_notnull(term: &Term) -> Option<NativeQuery> {
    Some(NativeQuery::Exists {
        field: term.column.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert!(lookup("eq").is_some());
        assert!(lookup("BTW").is_some());
        assert!(lookup("no-such-operator").is_none());
    }

    #[test]
    fn test_btw_renders_inclusive_range() {
        let op = lookup("btw").unwrap();
        let term = Term::btw("timestamp", 0, 10);
        let query = op.render(&term).unwrap();
        assert_eq!(
            query,
            NativeQuery::Range {
                field: "timestamp".into(),
                gte: Some(json!(0)),
                lte: Some(json!(10)),
                gt: None,
                lt: None,
            }
        );
    }

    #[test]
    fn test_btw_accepts_comma_string() {
        let op = lookup("btw").unwrap();
        let term = Term::new("timestamp", "btw", json!("5,15"));
        let query = op.render(&term).unwrap();
        match query {
            NativeQuery::Range { gte, lte, .. } => {
                assert_eq!(gte, Some(json!("5")));
                assert_eq!(lte, Some(json!("15")));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_in_splits_comma_string() {
        let op = lookup("in").unwrap();
        let term = Term::new("device_id", "in", json!("a, b ,c"));
        match op.render(&term).unwrap() {
            NativeQuery::Terms { values, .. } => {
                assert_eq!(values, vec![json!("a"), json!("b"), json!("c")]);
            }
            other => panic!("expected terms, got {other:?}"),
        }
    }

    #[test]
    fn test_like_wraps_bare_literal() {
        let op = lookup("like").unwrap();
        match op.render(&Term::like("name", "sensor")).unwrap() {
            NativeQuery::Wildcard { pattern, .. } => assert_eq!(pattern, "*sensor*"),
            other => panic!("expected wildcard, got {other:?}"),
        }
        match op.render(&Term::like("name", "sensor%")).unwrap() {
            NativeQuery::Wildcard { pattern, .. } => assert_eq!(pattern, "sensor*"),
            other => panic!("expected wildcard, got {other:?}"),
        }
    }

    #[test]
    fn test_isnull_is_negated_exists() {
        let op = lookup("isnull").unwrap();
        let query = op.render(&Term::is_null("tags")).unwrap();
        assert_eq!(
            query,
            NativeQuery::Not(Box::new(NativeQuery::Exists {
                field: "tags".into()
            }))
        );
    }

    #[test]
    fn test_scalar_coercion() {
        let op = lookup("eq").unwrap();
        assert_eq!(
            op.convert_value(&PropertyType::Long, &json!("42")),
            json!(42)
        );
        assert_eq!(
            op.convert_value(&PropertyType::Double, &json!("1.5")),
            json!(1.5)
        );
        assert_eq!(
            op.convert_value(&PropertyType::Bool, &json!("true")),
            json!(true)
        );
        assert_eq!(
            op.convert_value(&PropertyType::String, &json!(7)),
            json!("7")
        );
        assert_eq!(
            op.convert_value(&PropertyType::Date, &json!("2023-11-14T22:13:20Z")),
            json!(1700000000000i64)
        );
        // unconvertible values pass through unchanged
        assert_eq!(
            op.convert_value(&PropertyType::Long, &json!("abc")),
            json!("abc")
        );
    }

    #[test]
    fn test_list_coercion_is_element_wise() {
        let op = lookup("in").unwrap();
        assert_eq!(
            op.convert_value(&PropertyType::Long, &json!("1,2,3")),
            json!([1, 2, 3])
        );
    }
}
