//! Query Filter Matching
//!
//! Evaluates query filters for the in-memory engine. Supported forms:
//!
//! - equality on a (dotted) path: `{ name: 'Paris' }`, `{ 'loc.lat': 48.69 }`
//! - array containment: `{ tags: 'a' }` matches `{ tags: ['a', 'b'] }`
//! - comparison operators: `$gt`, `$gte`, `$lt`, `$lte`, `$ne`
//! - set operators: `$in`, `$nin`
//! - `$exists`
//! - logical combinators: `$and`, `$or`
//!
//! Integers and doubles compare by numeric value, so `{ n: 1 }` matches a
//! stored `1.0`.

use crate::document::{Document, Value};
use std::cmp::Ordering;
use tracing::warn;

/// Returns true if `doc` satisfies every condition in `filter`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key {
        "$and" => sub_filters(condition).all(|f| matches(doc, f)),
        "$or" => sub_filters(condition).any(|f| matches(doc, f)),
        _ => matches_condition(doc.get_path(key), condition),
    })
}

fn sub_filters(condition: &Value) -> impl Iterator<Item = &Document> {
    condition
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_document)
}

fn is_operator_document(value: &Value) -> Option<&Document> {
    let doc = value.as_document()?;
    if !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')) {
        Some(doc)
    } else {
        None
    }
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> bool {
    match is_operator_document(condition) {
        Some(operators) => operators
            .iter()
            .all(|(op, operand)| matches_operator(field, op, operand)),
        None => field.is_some_and(|value| equals_or_contains(value, condition)),
    }
}

fn matches_operator(field: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or_else(|| operand.as_f64() != Some(0.0));
            field.is_some() == wanted
        }
        "$ne" => !field.is_some_and(|value| equals_or_contains(value, operand)),
        "$in" => match (field, operand.as_array()) {
            (Some(value), Some(candidates)) => {
                candidates.iter().any(|c| equals_or_contains(value, c))
            }
            _ => false,
        },
        "$nin" => match (field, operand.as_array()) {
            (Some(value), Some(candidates)) => {
                !candidates.iter().any(|c| equals_or_contains(value, c))
            }
            (None, Some(_)) => true,
            _ => false,
        },
        "$gt" => compares(field, operand, |o| o == Ordering::Greater),
        "$gte" => compares(field, operand, |o| o != Ordering::Less),
        "$lt" => compares(field, operand, |o| o == Ordering::Less),
        "$lte" => compares(field, operand, |o| o != Ordering::Greater),
        other => {
            warn!(operator = other, "Unsupported query operator");
            false
        }
    }
}

fn compares(field: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    field
        .and_then(|value| compare(value, operand))
        .is_some_and(accept)
}

/// Equality, with array fields matching when any element is equal.
fn equals_or_contains(value: &Value, expected: &Value) -> bool {
    if values_equal(value, expected) {
        return true;
    }
    match value {
        Value::Array(elements) => elements.iter().any(|e| values_equal(e, expected)),
        _ => false,
    }
}

/// Equality that treats integers and doubles by numeric value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Orders two values of the same kind; numbers compare across int/double.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
