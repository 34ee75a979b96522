//! Filter translation
//!
//! Converts the engine-agnostic [`Term`] tree into the backend's native
//! nested boolean query dialect. Translation is total and non-fatal:
//! malformed clauses degrade (unknown operators are dropped with a
//! warning, multi-separator paths split on the first separator) instead
//! of failing the query.

pub mod dsl;
pub mod group;
pub mod operators;
pub mod term;

pub use dsl::{BoolQuery, NativeAggregation, NativeFunction, NativeGroup, NativeQuery, ScoreMode};
pub use group::{group_terms, TermGroup};
pub use term::{Connective, Term};

use serde_json::{json, Value};
use tracing::warn;

use crate::index::metadata::IndexMetadata;
use crate::types::QueryParam;

/// Translate a term sequence into the backend's native boolean query.
///
/// An empty sequence matches everything. When `metadata` is supplied,
/// each leaf's literal value is coerced to the declared property type via
/// the operator's coercion hook; unknown property ids pass through
/// unconverted.
pub fn translate(terms: &[Term], metadata: Option<&IndexMetadata>) -> NativeQuery {
    if terms.is_empty() {
        return NativeQuery::MatchAll;
    }
    let grouped = group_terms(terms);
    if grouped.is_empty() {
        return NativeQuery::MatchAll;
    }
    render_group(&grouped, metadata)
}

fn render_group(group: &TermGroup, metadata: Option<&IndexMetadata>) -> NativeQuery {
    let mut clause = BoolQuery::new();
    let bucket = |clause: &mut BoolQuery, query: NativeQuery| match group.connective {
        Connective::And => clause.must.push(query),
        Connective::Or => clause.should.push(query),
    };
    for term in &group.terms {
        if let Some(query) = render_leaf(term, metadata) {
            bucket(&mut clause, query);
        }
    }
    for sub in &group.groups {
        bucket(&mut clause, render_group(sub, metadata));
    }
    NativeQuery::Bool(clause)
}

/// Render one leaf term, applying type coercion and nested-path wrapping.
///
/// A leaf with an unknown operator id is dropped from the native query;
/// this preserves observed behavior and is logged as a warning rather
/// than surfaced as an error.
fn render_leaf(term: &Term, metadata: Option<&IndexMetadata>) -> Option<NativeQuery> {
    if term.column.is_empty() || term.value.is_none() {
        return None;
    }
    let Some(operator) = operators::lookup(&term.operator) else {
        warn!(
            column = term.column,
            operator = term.operator,
            "unknown term operator, clause dropped"
        );
        return None;
    };

    let property = metadata.and_then(|m| m.property(&term.column));
    let coerced = match (property, term.value.as_ref()) {
        (Some(prop), Some(value)) => {
            let mut coerced = term.clone();
            coerced.value = Some(operator.convert_value(&prop.property_type, value));
            coerced
        }
        _ => term.clone(),
    };

    let clause = operator.render(&coerced)?;

    match term.split_column() {
        None => Some(clause),
        Some((path, _)) => {
            // plain existence checks are meaningless inside a
            // nested-document context; suppress scoring there
            let existence_only = matches!(operator.id, "isnull" | "notnull")
                && property.is_some_and(|prop| prop.property_type.is_nested());
            Some(NativeQuery::Nested {
                path: path.to_string(),
                query: Box::new(clause),
                score_mode: existence_only.then_some(ScoreMode::None),
            })
        }
    }
}

/// Render a full native search request body: paging, sorts and query.
pub fn search_body(param: &QueryParam, metadata: Option<&IndexMetadata>) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(paging) = &param.paging {
        body.insert("from".into(), json!(paging.offset()));
        body.insert("size".into(), json!(paging.page_size));
    }
    if !param.sorts.is_empty() {
        let sorts: Vec<Value> = param
            .sorts
            .iter()
            .map(|sort| {
                json!({
                    &sort.name: {
                        "order": match sort.order {
                            crate::types::SortOrder::Asc => "asc",
                            crate::types::SortOrder::Desc => "desc",
                        }
                    }
                })
            })
            .collect();
        body.insert("sort".into(), Value::Array(sorts));
    }
    body.insert("query".into(), translate(&param.terms, metadata).to_json());
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::metadata::PropertyType;
    use crate::types::Sort;
    use serde_json::json;

    fn metadata() -> IndexMetadata {
        IndexMetadata::new("device_metrics")
            .unwrap()
            .add_property("timestamp", PropertyType::Date)
            .add_property("value", PropertyType::Double)
            .add_property("tags", PropertyType::Object)
            .add_property("events", PropertyType::Array(Box::new(PropertyType::Object)))
            .add_property("labels", PropertyType::Array(Box::new(PropertyType::String)))
    }

    fn leaf(name: &str) -> Term {
        Term::eq(name, json!(1))
    }

    #[test]
    fn test_empty_terms_match_all() {
        assert_eq!(translate(&[], None), NativeQuery::MatchAll);
    }

    #[test]
    fn test_and_chain_stays_flat() {
        // A AND B AND C => one flat 3-clause must group
        let query = translate(&[leaf("a"), leaf("b"), leaf("c")], None);
        match query {
            NativeQuery::Bool(bool_query) => {
                assert_eq!(bool_query.must.len(), 3);
                assert!(bool_query.should.is_empty());
                assert!(bool_query
                    .must
                    .iter()
                    .all(|q| matches!(q, NativeQuery::Term { .. })));
            }
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_or_groups_left() {
        // A AND B OR C => (A AND B) OR C
        let query = translate(&[leaf("a"), leaf("b"), leaf("c").or()], None);
        match query {
            NativeQuery::Bool(bool_query) => {
                assert!(bool_query.must.is_empty());
                assert_eq!(bool_query.should.len(), 2);
                // first disjunct is the AND pair, second the lone C
                match &bool_query.should[1] {
                    NativeQuery::Bool(and) => {
                        assert_eq!(and.must.len(), 2);
                    }
                    NativeQuery::Term { field, .. } => assert_eq!(field, "c"),
                    other => panic!("unexpected clause {other:?}"),
                }
                assert!(bool_query
                    .should
                    .iter()
                    .any(|q| matches!(q, NativeQuery::Bool(b) if b.must.len() == 2)));
                assert!(bool_query
                    .should
                    .iter()
                    .any(|q| matches!(q, NativeQuery::Term { field, .. } if field == "c")));
            }
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_operator_dropped() {
        let query = translate(
            &[leaf("a"), Term::new("b", "no-such-op", json!(1))],
            None,
        );
        match query {
            NativeQuery::Bool(bool_query) => assert_eq!(bool_query.must.len(), 1),
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_dotted_column_wraps_nested() {
        let query = translate(&[Term::eq("tags.region", json!("eu"))], None);
        match query {
            NativeQuery::Bool(bool_query) => match &bool_query.must[0] {
                NativeQuery::Nested {
                    path,
                    query,
                    score_mode,
                } => {
                    assert_eq!(path, "tags");
                    assert!(score_mode.is_none());
                    assert_eq!(
                        **query,
                        NativeQuery::Term {
                            field: "tags.region".into(),
                            value: json!("eu"),
                        }
                    );
                }
                other => panic!("expected nested, got {other:?}"),
            },
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_existence_check_on_nested_property_suppresses_scoring() {
        let query = translate(&[Term::not_null("events.type")], Some(&metadata()));
        // property lookup is by full column; "events.type" is undeclared,
        // so scoring stays on
        match &query {
            NativeQuery::Bool(b) => match &b.must[0] {
                NativeQuery::Nested { score_mode, .. } => assert!(score_mode.is_none()),
                other => panic!("expected nested, got {other:?}"),
            },
            other => panic!("expected bool, got {other:?}"),
        }

        let meta = metadata().add_property("events.type", PropertyType::Array(Box::new(PropertyType::Object)));
        let query = translate(&[Term::not_null("events.type")], Some(&meta));
        match query {
            NativeQuery::Bool(b) => match &b.must[0] {
                NativeQuery::Nested { score_mode, .. } => {
                    assert_eq!(*score_mode, Some(ScoreMode::None));
                }
                other => panic!("expected nested, got {other:?}"),
            },
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_metadata_coerces_values() {
        let query = translate(
            &[Term::eq("value", json!("3.5"))],
            Some(&metadata()),
        );
        match query {
            NativeQuery::Bool(b) => {
                assert_eq!(
                    b.must[0],
                    NativeQuery::Term {
                        field: "value".into(),
                        value: json!(3.5),
                    }
                );
            }
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_property_passes_through() {
        let query = translate(
            &[Term::eq("undeclared", json!("3.5"))],
            Some(&metadata()),
        );
        match query {
            NativeQuery::Bool(b) => {
                assert_eq!(
                    b.must[0],
                    NativeQuery::Term {
                        field: "undeclared".into(),
                        value: json!("3.5"),
                    }
                );
            }
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn test_search_body_layout() {
        let param = QueryParam::new()
            .with_term(Term::eq("value", json!(1)))
            .order_by(Sort::desc("timestamp"))
            .paging(2, 10);
        let body = search_body(&param, None);
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
        assert_eq!(body["sort"][0]["timestamp"]["order"], json!("desc"));
        assert!(body["query"]["bool"]["must"].is_array());
    }
}
