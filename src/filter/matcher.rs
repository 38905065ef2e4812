use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use super::types::{Condition, FilterOp, FilterWhereInfo, SortDirection};
use crate::database::Document;

/// Evaluates a condition tree against a document with the same rules the SQL renderer emits.
pub fn matches(condition: &Condition, doc: &Document) -> bool {
    match condition {
        Condition::Field(info) => matches_field(info, doc.field(&info.column).as_ref()),
        Condition::And(parts) => parts.iter().all(|p| matches(p, doc)),
        Condition::Or(parts) => parts.iter().any(|p| matches(p, doc)),
        Condition::Not(inner) => !matches(inner, doc),
    }
}

fn matches_field(info: &FilterWhereInfo, value: Option<&Value>) -> bool {
    match info.operator {
        FilterOp::Eq => value_eq(value, &info.data),
        FilterOp::Ne => !value_eq(value, &info.data),
        FilterOp::In => in_list(value, &info.data),
        FilterOp::NIn => !in_list(value, &info.data),
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            let Some(ord) = value.and_then(|v| compare_scalar(v, &info.data)) else {
                return false;
            };
            match info.operator {
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Gte => ord != Ordering::Less,
                FilterOp::Lt => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            }
        }
        FilterOp::Regex => {
            let Ok(re) = Regex::new(info.data.as_str().unwrap_or_default()) else {
                return false;
            };
            match value {
                Some(Value::String(s)) => re.is_match(s),
                Some(Value::Array(items)) => items.iter().any(|i| i.as_str().is_some_and(|s| re.is_match(s))),
                _ => false,
            }
        }
        FilterOp::Exists => value.is_some() == info.data.as_bool().unwrap_or(true),
    }
}

fn value_eq(value: Option<&Value>, data: &Value) -> bool {
    if data.is_null() {
        return matches!(value, None | Some(Value::Null));
    }
    match value {
        Some(v) if json_eq(v, data) => true,
        Some(Value::Array(items)) => items.iter().any(|i| json_eq(i, data)),
        _ => false,
    }
}

fn in_list(value: Option<&Value>, data: &Value) -> bool {
    data.as_array().is_some_and(|candidates| candidates.iter().any(|c| value_eq(value, c)))
}

/// Structural equality where `1` and `1.0` are the same number
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_eq(l, r)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}

fn compare_scalar(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| json_cmp(l, r))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => compare_scalar(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Missing values sort last ascending and first descending
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    let ord = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => json_cmp(x, y),
    };
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}
