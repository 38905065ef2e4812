use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::types::FilterData;

/// Query-string keys that steer paging and sorting instead of filtering
const RESERVED_PARAMS: &[&str] = &["current", "pageSize", "sort", "populate", "fields", "projection"];

/// Paging, sorting and equality filters parsed from a list endpoint's query string
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub current: i64,
    pub page_size: i64,
    pub where_clause: Map<String, Value>,
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn new(current: i64, page_size: i64) -> Self {
        Self {
            current: current.max(1),
            page_size: page_size.max(1),
            where_clause: Map::new(),
            sort: None,
        }
    }

    /// `max_page_size` caps `pageSize` so the reported paging matches the rows a page can hold
    pub fn from_params(params: &HashMap<String, String>, default_page_size: i64, max_page_size: Option<i64>) -> Self {
        let current = params.get("current").and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(1);
        let page_size = params
            .get("pageSize")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default_page_size);
        let page_size = max_page_size.map_or(page_size, |max| page_size.min(max.max(1)));

        let mut query = Self::new(current, page_size);
        query.sort = params.get("sort").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        for (key, raw) in params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            query.where_clause.insert(key.clone(), cast_value(raw));
        }
        query
    }

    pub fn and_where(mut self, field: &str, value: Value) -> Self {
        self.where_clause.insert(field.to_string(), value);
        self
    }

    /// Saturates instead of overflowing for absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.current - 1).saturating_mul(self.page_size)
    }

    /// Filter for the page of results
    pub fn page_filter(&self) -> FilterData {
        FilterData {
            where_clause: Some(Value::Object(self.where_clause.clone())),
            order: self.sort.clone().map(Value::String),
            limit: Some(self.page_size),
            offset: Some(self.offset()),
        }
    }

    /// Filter for the total count, without paging
    pub fn count_filter(&self) -> FilterData {
        FilterData::where_(Value::Object(self.where_clause.clone()))
    }
}

/// Converts a query-string value into a typed filter operand
fn cast_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Some(regex) = parse_regex_literal(trimmed) {
        return regex;
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return json!(n);
    }
    let numeric = !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if numeric {
        if let Ok(f) = trimmed.parse::<f64>() {
            return json!(f);
        }
    }
    Value::String(raw.to_string())
}

/// `/pattern/flags` becomes a `$regex` operand
fn parse_regex_literal(raw: &str) -> Option<Value> {
    let body = raw.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    if pattern.is_empty() || !flags.chars().all(|c| "imsx".contains(c)) {
        return None;
    }
    Some(json!({ "$regex": pattern, "$options": flags }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn paging_defaults_and_offsets() {
        let q = ListQuery::from_params(&params(&[]), 10, None);
        assert_eq!((q.current, q.page_size, q.offset()), (1, 10, 0));

        let q = ListQuery::from_params(&params(&[("current", "3"), ("pageSize", "5")]), 10, None);
        assert_eq!(q.offset(), 10);
        let data = q.page_filter();
        assert_eq!(data.limit, Some(5));
        assert_eq!(data.offset, Some(10));
    }

    #[test]
    fn non_reserved_params_become_filters() {
        let q = ListQuery::from_params(
            &params(&[("name", "/dev/i"), ("isActive", "true"), ("salary", "1000"), ("sort", "-createdAt")]),
            10,
            None,
        );
        assert_eq!(q.where_clause["name"], json!({ "$regex": "dev", "$options": "i" }));
        assert_eq!(q.where_clause["isActive"], json!(true));
        assert_eq!(q.where_clause["salary"], json!(1000));
        assert_eq!(q.sort.as_deref(), Some("-createdAt"));
        assert!(!q.where_clause.contains_key("sort"));
    }

    #[test]
    fn extreme_paging_values_are_bounded() {
        let q = ListQuery::from_params(&params(&[("current", "9223372036854775807"), ("pageSize", "10")]), 10, None);
        assert_eq!(q.offset(), i64::MAX);

        let q = ListQuery::from_params(&params(&[("pageSize", "9223372036854775807")]), 10, Some(1000));
        assert_eq!(q.page_size, 1000);
        assert_eq!(q.offset(), 0);

        let q = ListQuery::from_params(&params(&[("current", "-4"), ("pageSize", "0")]), 10, Some(5));
        assert_eq!((q.current, q.page_size), (1, 5));
    }

    #[test]
    fn plain_strings_stay_strings() {
        assert_eq!(cast_value("a,b"), json!("a,b"));
        assert_eq!(cast_value("/"), json!("/"));
        assert_eq!(cast_value("2024-01-01"), json!("2024-01-01"));
        assert_eq!(cast_value("/api/v1/users"), json!("/api/v1/users"));
    }
}
