//! # Filter Matching
//!
//! Evaluates query filter documents against stored documents.
//!
//! Supports implicit equality on plain key/value pairs, the comparison
//! operators `$eq,$ne,$gt,$gte,$lt,$lte,$in,$nin,$exists`, field-level
//! `$not`, and the logical operators `$and,$or,$nor`. Field paths may be
//! dotted. Tagged identifiers (`{"$oid": ...}`) compare by equality and
//! ordering on their hex form, never numerically.

use std::cmp::Ordering;

use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::ident::DocId;

/// Check whether `doc` matches `filter`.
///
/// An empty filter matches every document. A malformed filter is an error,
/// not a non-match.
pub fn matches(doc: &Value, filter: &Value) -> StoreResult<bool> {
    let conditions = filter
        .as_object()
        .ok_or_else(|| StoreError::InvalidArgument("filter must be an object".to_string()))?;

    for (key, condition) in conditions {
        let matched = match key.as_str() {
            "$and" => logical_list(doc, condition, key)?.iter().all(|m| *m),
            "$or" => logical_list(doc, condition, key)?.iter().any(|m| *m),
            "$nor" => !logical_list(doc, condition, key)?.iter().any(|m| *m),
            _ if key.starts_with('$') => {
                return Err(StoreError::InvalidArgument(format!(
                    "unknown logical operator '{}'",
                    key
                )));
            }
            path => field_matches(lookup_path(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate each sub-filter of a `$and`/`$or`/`$nor` list
fn logical_list(doc: &Value, condition: &Value, op: &str) -> StoreResult<Vec<bool>> {
    let list = condition.as_array().ok_or_else(|| {
        StoreError::InvalidArgument(format!("'{}' expects an array of filters", op))
    })?;
    if list.is_empty() {
        return Err(StoreError::InvalidArgument(format!(
            "'{}' expects a non-empty array",
            op
        )));
    }
    list.iter().map(|f| matches(doc, f)).collect()
}

/// Evaluate a single field condition
fn field_matches(field_value: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    if let Some(operators) = operator_object(condition) {
        for (op, operand) in operators {
            let ok = match op.as_str() {
                "$eq" => field_value == Some(operand),
                "$ne" => field_value != Some(operand),
                "$gt" => compare_option(field_value, operand) == Some(Ordering::Greater),
                "$gte" => matches!(
                    compare_option(field_value, operand),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ),
                "$lt" => compare_option(field_value, operand) == Some(Ordering::Less),
                "$lte" => matches!(
                    compare_option(field_value, operand),
                    Some(Ordering::Less) | Some(Ordering::Equal)
                ),
                "$in" => in_list(field_value, operand, "$in")?,
                "$nin" => !in_list(field_value, operand, "$nin")?,
                "$exists" => {
                    let wanted = operand.as_bool().ok_or_else(|| {
                        StoreError::InvalidArgument("'$exists' expects a boolean".to_string())
                    })?;
                    field_value.is_some() == wanted
                }
                "$not" => !field_matches(field_value, operand)?,
                other => {
                    return Err(StoreError::InvalidArgument(format!(
                        "unknown filter operator '{}'",
                        other
                    )));
                }
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    } else {
        // Implicit equality; covers tagged identifiers by deep equality
        Ok(field_value == Some(condition))
    }
}

/// Treat `condition` as an operator set if every key is a `$` operator.
///
/// A tagged identifier object is a plain value, not an operator set.
fn operator_object(condition: &Value) -> Option<&serde_json::Map<String, Value>> {
    let obj = condition.as_object()?;
    if DocId::from_value(condition).is_some() {
        return None;
    }
    if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) {
        Some(obj)
    } else {
        None
    }
}

fn in_list(field_value: Option<&Value>, operand: &Value, op: &str) -> StoreResult<bool> {
    let list = operand
        .as_array()
        .ok_or_else(|| StoreError::InvalidArgument(format!("'{}' expects an array", op)))?;
    Ok(match field_value {
        Some(v) => list.contains(v),
        None => false,
    })
}

/// Resolve a possibly dotted field path inside a document
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn compare_option(a: Option<&Value>, b: &Value) -> Option<Ordering> {
    compare_values(a?, b)
}

/// Order two values of the same kind.
///
/// Numbers compare numerically, strings and booleans by their natural
/// order, tagged identifiers by hex form. Mixed kinds do not compare.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => {
            let x = DocId::from_value(a)?;
            let y = DocId::from_value(b)?;
            Some(x.cmp(&y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches(&json!({"a": 1}), &json!({})).unwrap());
    }

    #[test]
    fn test_implicit_equality() {
        let doc = json!({"status": "open", "count": 3});
        assert!(matches(&doc, &json!({"status": "open"})).unwrap());
        assert!(!matches(&doc, &json!({"status": "closed"})).unwrap());
        assert!(matches(&doc, &json!({"status": "open", "count": 3})).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let doc = json!({"age": 21});
        assert!(matches(&doc, &json!({"age": {"$gt": 18}})).unwrap());
        assert!(matches(&doc, &json!({"age": {"$gte": 21}})).unwrap());
        assert!(matches(&doc, &json!({"age": {"$lt": 30}})).unwrap());
        assert!(!matches(&doc, &json!({"age": {"$lte": 20}})).unwrap());
        assert!(matches(&doc, &json!({"age": {"$ne": 22}})).unwrap());
        assert!(matches(&doc, &json!({"age": {"$gt": 18, "$lt": 30}})).unwrap());
    }

    #[test]
    fn test_in_and_nin() {
        let doc = json!({"status": "open"});
        assert!(matches(&doc, &json!({"status": {"$in": ["open", "held"]}})).unwrap());
        assert!(matches(&doc, &json!({"status": {"$nin": ["closed"]}})).unwrap());
        assert!(!matches(&doc, &json!({"status": {"$in": []}})).unwrap());
    }

    #[test]
    fn test_exists() {
        let doc = json!({"a": null});
        assert!(matches(&doc, &json!({"a": {"$exists": true}})).unwrap());
        assert!(matches(&doc, &json!({"b": {"$exists": false}})).unwrap());
    }

    #[test]
    fn test_not() {
        let doc = json!({"age": 21});
        assert!(matches(&doc, &json!({"age": {"$not": {"$lt": 18}}})).unwrap());
        assert!(!matches(&doc, &json!({"age": {"$not": {"$gt": 18}}})).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let doc = json!({"status": "open", "count": 12});
        assert!(matches(
            &doc,
            &json!({"$or": [{"status": "closed"}, {"count": {"$gte": 10}}]})
        )
        .unwrap());
        assert!(matches(
            &doc,
            &json!({"$and": [{"status": "open"}, {"count": {"$gt": 10}}]})
        )
        .unwrap());
        assert!(matches(&doc, &json!({"$nor": [{"status": "closed"}]})).unwrap());
    }

    #[test]
    fn test_dotted_path() {
        let doc = json!({"meta": {"author": {"name": "ada"}}});
        assert!(matches(&doc, &json!({"meta.author.name": "ada"})).unwrap());
        assert!(!matches(&doc, &json!({"meta.author.name": "bob"})).unwrap());
    }

    #[test]
    fn test_tagged_identifier_equality() {
        let id = json!({"$oid": "507f1f77bcf86cd799439011"});
        let doc = json!({"_id": id});
        assert!(matches(&doc, &json!({"_id": id})).unwrap());
        // A plain string of the same characters is a different value
        assert!(!matches(&doc, &json!({"_id": "507f1f77bcf86cd799439011"})).unwrap());
    }

    #[test]
    fn test_mixed_kinds_do_not_compare() {
        let doc = json!({"age": "young"});
        assert!(!matches(&doc, &json!({"age": {"$gt": 18}})).unwrap());
    }

    #[test]
    fn test_malformed_filter_is_an_error() {
        let doc = json!({"a": 1});
        assert!(matches(&doc, &json!("not an object")).is_err());
        assert!(matches(&doc, &json!({"a": {"$bogus": 1}})).is_err());
        assert!(matches(&doc, &json!({"$or": {}})).is_err());
        assert!(matches(&doc, &json!({"$unknown": []})).is_err());
    }
}
