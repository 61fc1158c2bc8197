//! Evaluation of Mongo-style filters against JSON documents.
//!
//! Supported: `$and`, `$or`, `$nor` at any level and the field operators
//! `$eq`, `$ne`, `$in`, `$nin`, `$lt`, `$lte`, `$gt`, `$gte`, `$regex`
//! (with `$options`), `$not` and `$exists`. A plain value is an implicit
//! `$eq`. As in Mongo, positive operators on an array field match when any
//! element matches.

use crate::{DatabaseError, Result};
use regex::RegexBuilder;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Whether `document` satisfies `filter`. An empty filter matches everything.
pub fn matches(document: &Map<String, Value>, filter: &Map<String, Value>) -> Result<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, condition)? {
                    if !matches(document, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, condition)? {
                    if matches(document, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for sub in sub_filters(key, condition)? {
                    if matches(document, sub)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(DatabaseError::Filter(format!("unknown top level operator {}", op)))
            }
            field => field_matches(lookup(document, field), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'f>(key: &str, condition: &'f Value) -> Result<Vec<&'f Map<String, Value>>> {
    let items = condition
        .as_array()
        .ok_or_else(|| DatabaseError::Filter(format!("{} expects an array", key)))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| DatabaseError::Filter(format!("{} expects objects", key)))
        })
        .collect()
}

/// Resolves dotted paths such as `attribute.name`.
fn lookup<'d>(document: &'d Map<String, Value>, field: &str) -> Option<&'d Value> {
    let mut parts = field.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_operator_object(condition: &Value) -> bool {
    condition
        .as_object()
        .is_some_and(|ops| !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')))
}

fn field_matches(actual: Option<&Value>, condition: &Value) -> Result<bool> {
    if !is_operator_object(condition) {
        return Ok(equals_any(actual, condition));
    }
    let Some(ops) = condition.as_object() else {
        return Ok(false);
    };

    for (op, expected) in ops {
        let matched = match op.as_str() {
            "$eq" => equals_any(actual, expected),
            "$ne" => !equals_any(actual, expected),
            "$in" => in_list(actual, op, expected)?,
            "$nin" => !in_list(actual, op, expected)?,
            "$lt" => compare_any(actual, expected, |o| o == Ordering::Less),
            "$lte" => compare_any(actual, expected, |o| o != Ordering::Greater),
            "$gt" => compare_any(actual, expected, |o| o == Ordering::Greater),
            "$gte" => compare_any(actual, expected, |o| o != Ordering::Less),
            "$regex" => regex_matches(actual, expected, ops.get("$options"))?,
            "$options" => true,
            "$not" => !field_matches(actual, expected)?,
            "$exists" => actual.is_some() == expected.as_bool().unwrap_or(true),
            other => {
                return Err(DatabaseError::Filter(format!("unknown operator {}", other)))
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates(actual: &Value) -> Vec<&Value> {
    match actual {
        Value::Array(items) => {
            let mut all: Vec<&Value> = items.iter().collect();
            all.push(actual);
            all
        }
        single => vec![single],
    }
}

/// Policy ids arrive as strings while stored ids are numbers, so a numeric
/// string equals the number it spells.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        _ => a == b,
    }
}

fn equals_any(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(actual) => candidates(actual)
            .into_iter()
            .any(|candidate| values_equal(candidate, expected)),
    }
}

fn in_list(actual: Option<&Value>, op: &str, expected: &Value) -> Result<bool> {
    let items = expected
        .as_array()
        .ok_or_else(|| DatabaseError::Filter(format!("{} expects an array", op)))?;
    Ok(items.iter().any(|item| equals_any(actual, item)))
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_any(actual: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    candidates(actual)
        .into_iter()
        .any(|candidate| order(candidate, expected).is_some_and(&accept))
}

fn regex_matches(actual: Option<&Value>, pattern: &Value, options: Option<&Value>) -> Result<bool> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| DatabaseError::Filter("$regex expects a string".to_string()))?;
    let case_insensitive = options
        .and_then(Value::as_str)
        .is_some_and(|o| o.contains('i'));
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()?;

    let Some(actual) = actual else {
        return Ok(false);
    };
    Ok(candidates(actual)
        .into_iter()
        .filter_map(Value::as_str)
        .any(|text| regex.is_match(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn check(document: &Value, filter: Value) -> bool {
        matches(&doc(document.clone()), &doc(filter)).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(check(&json!({"bk_host_id": 1}), json!({})));
    }

    #[test]
    fn test_comparison_operators() {
        let host = json!({"bk_host_id": 5, "bk_host_innerip": "10.0.0.5"});
        assert!(check(&host, json!({"bk_host_id": {"$eq": 5}})));
        assert!(check(&host, json!({"bk_host_id": 5.0})));
        assert!(check(&host, json!({"bk_host_id": {"$in": [1, 5]}})));
        assert!(check(&host, json!({"bk_host_id": {"$nin": [1, 2]}})));
        assert!(check(&host, json!({"bk_host_id": {"$gte": 5, "$lt": 6}})));
        assert!(!check(&host, json!({"bk_host_id": {"$gt": 5}})));
        assert!(check(&host, json!({"bk_host_id": {"$eq": "5"}})));
        assert!(!check(&host, json!({"bk_host_id": {"$eq": "5x"}})));
        assert!(!check(&host, json!({"bk_host_innerip": {"$eq": 10}})));
    }

    #[test]
    fn test_logical_operators() {
        let biz = json!({"bk_biz_id": 3, "bk_biz_name": "blueking"});
        assert!(check(
            &biz,
            json!({"$or": [{"bk_biz_id": {"$eq": 1}}, {"bk_biz_id": {"$eq": 3}}]})
        ));
        assert!(!check(
            &biz,
            json!({"$and": [{"bk_biz_id": {"$eq": 3}}, {"bk_biz_id": {"$ne": 3}}]})
        ));
        assert!(check(&biz, json!({"$nor": [{"bk_biz_id": {"$eq": 1}}]})));
    }

    #[test]
    fn test_regex_and_not() {
        let biz = json!({"bk_biz_name": "Blue.King"});
        assert!(check(&biz, json!({"bk_biz_name": {"$regex": "^Blue\\.K"}})));
        assert!(!check(&biz, json!({"bk_biz_name": {"$regex": "^blue"}})));
        assert!(check(&biz, json!({"bk_biz_name": {"$regex": "^blue", "$options": "i"}})));
        assert!(check(&biz, json!({"bk_biz_name": {"$not": {"$regex": "x$"}}})));
        assert!(!check(&biz, json!({"bk_biz_name": {"$not": {"$regex": "g$"}}})));
    }

    #[test]
    fn test_array_fields_match_any_element() {
        let relation = json!({"bk_host_id": 1, "bk_module_id": [4, 5]});
        assert!(check(&relation, json!({"bk_module_id": {"$eq": 5}})));
        assert!(check(&relation, json!({"bk_module_id": {"$in": [9, 4]}})));
        assert!(!check(&relation, json!({"bk_module_id": {"$ne": 4}})));
    }

    #[test]
    fn test_missing_fields() {
        let host = json!({"bk_host_id": 1});
        assert!(check(&host, json!({"bk_cloud_id": {"$exists": false}})));
        assert!(check(&host, json!({"bk_cloud_id": {"$ne": 0}})));
        assert!(!check(&host, json!({"bk_cloud_id": {"$lt": 10}})));
        assert!(check(&json!({"a": {"b": 2}}), json!({"a.b": {"$eq": 2}})));
    }

    #[test]
    fn test_invalid_filters_are_errors() {
        let host = doc(json!({"bk_host_id": 1}));
        assert!(matches(&host, &doc(json!({"$where": "1"}))).is_err());
        assert!(matches(&host, &doc(json!({"bk_host_id": {"$near": 1}}))).is_err());
        assert!(matches(&host, &doc(json!({"bk_host_id": {"$in": 1}}))).is_err());
        assert!(matches(&doc(json!({"n": "x"})), &doc(json!({"n": {"$regex": "("}}))).is_err());
    }
}
