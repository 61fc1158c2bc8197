//! In-memory evaluation of a policy against concrete resources.
//!
//! Used to decide one request locally once the policy of its action is known.
//! A leaf refers to a resource by type; when the request carries no resource
//! of that type the leaf does not hold.

use super::{Combinator, FieldValue, Operator, Policy};
use crate::resource::Resource;
use serde_json::Value;

const ID_ATTRIBUTE: &str = "id";

/// Returns whether `policy` grants access to `resources`.
pub fn evaluate(policy: &Policy, resources: &[Resource]) -> bool {
    match policy {
        Policy::Any => true,
        Policy::Combinator {
            op: Combinator::And,
            content,
        } => content.iter().all(|p| evaluate(p, resources)),
        Policy::Combinator {
            op: Combinator::Or,
            content,
        } => content.iter().any(|p| evaluate(p, resources)),
        Policy::Leaf(leaf) => evaluate_leaf(leaf, resources),
    }
}

fn evaluate_leaf(leaf: &FieldValue, resources: &[Resource]) -> bool {
    if leaf.op == Operator::Any {
        return true;
    }
    let Some(resource) = resources
        .iter()
        .find(|r| r.resource_type == leaf.field.resource_type)
    else {
        return false;
    };
    let Some(attribute) = attribute_value(resource, &leaf.field.attribute) else {
        return leaf.op.is_negative();
    };

    match attribute {
        Value::Array(items) => {
            if leaf.op.is_negative() {
                items.iter().all(|item| compare(&leaf.op, item, &leaf.value))
            } else {
                items.iter().any(|item| compare(&leaf.op, item, &leaf.value))
            }
        }
        single => compare(&leaf.op, &single, &leaf.value),
    }
}

fn attribute_value(resource: &Resource, attribute: &str) -> Option<Value> {
    if attribute == ID_ATTRIBUTE {
        return Some(Value::String(resource.id.clone()));
    }
    resource
        .attribute
        .as_ref()
        .and_then(|attrs| attrs.get(attribute))
        .cloned()
}

fn compare(op: &Operator, actual: &Value, expected: &Value) -> bool {
    match op {
        Operator::Eq => loose_eq(actual, expected),
        Operator::NotEq => !loose_eq(actual, expected),
        Operator::In => in_list(actual, expected),
        Operator::NotIn => !in_list(actual, expected),
        Operator::Contains => string_test(actual, expected, |a, e| a.contains(e)),
        Operator::NotContains => !string_test(actual, expected, |a, e| a.contains(e)),
        Operator::StartsWith => string_test(actual, expected, |a, e| a.starts_with(e)),
        Operator::NotStartsWith => !string_test(actual, expected, |a, e| a.starts_with(e)),
        Operator::EndsWith => string_test(actual, expected, |a, e| a.ends_with(e)),
        Operator::NotEndsWith => !string_test(actual, expected, |a, e| a.ends_with(e)),
        Operator::Lt => numeric_test(actual, expected, |a, e| a < e),
        Operator::Lte => numeric_test(actual, expected, |a, e| a <= e),
        Operator::Gt => numeric_test(actual, expected, |a, e| a > e),
        Operator::Gte => numeric_test(actual, expected, |a, e| a >= e),
        Operator::Any => true,
        Operator::Other(_) => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// Resource ids are strings on the wire while policies may carry numbers.
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (as_text(actual), as_text(expected)) {
        (Some(a), Some(e)) => a == e,
        _ => false,
    }
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| loose_eq(actual, item)),
        single => loose_eq(actual, single),
    }
}

fn string_test(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (as_text(actual), as_text(expected)) {
        (Some(a), Some(e)) => test(&a, &e),
        _ => false,
    }
}

fn numeric_test(actual: &Value, expected: &Value, test: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(e)) => test(a, e),
        _ => false,
    }
}
