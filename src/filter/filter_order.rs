use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{field_expression, validate_field_name};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // ["createdAt desc", "-name"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v {
                        out.extend(Self::parse_order_string(s));
                    }
                }
                out
            }
            Value::Object(obj) => {
                // { "createdAt": "desc", "name": 1 }
                obj.iter()
                    .map(|(k, v)| {
                        let desc = match v {
                            Value::String(s) => s.eq_ignore_ascii_case("desc"),
                            Value::Number(n) => n.as_i64() == Some(-1),
                            _ => false,
                        };
                        FilterOrderInfo {
                            column: k.clone(),
                            sort: if desc { SortDirection::Desc } else { SortDirection::Asc },
                        }
                    })
                    .collect()
            }
            _ => vec![],
        };

        for info in &infos {
            validate_field_name(&info.column)?;
        }
        Ok(infos)
    }

    /// Accepts "col dir" pairs and the `-col` shorthand, comma separated
    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let (col, mut sort) = match col.strip_prefix('-') {
                    Some(stripped) => (stripped, SortDirection::Desc),
                    None => (col.strip_prefix('+').unwrap_or(col), SortDirection::Asc),
                };
                if let Some(dir) = it.next() {
                    sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                }
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", Self::sort_expression(&i.column), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    fn sort_expression(column: &str) -> String {
        match column {
            "_id" => "\"id\"".to_string(),
            "createdAt" => "\"created_at\"".to_string(),
            "updatedAt" => "\"updated_at\"".to_string(),
            other => field_expression(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_dash_prefix_and_pairs() {
        let infos = FilterOrder::validate_and_parse(&json!("-createdAt, name asc")).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].column, "createdAt");
        assert_eq!(infos[0].sort, SortDirection::Desc);
        assert_eq!(infos[1].sort, SortDirection::Asc);
    }

    #[test]
    fn generates_column_and_body_sorts() {
        let infos = FilterOrder::validate_and_parse(&json!({ "createdAt": -1, "salary": "asc" })).unwrap();
        let sql = FilterOrder::generate(&infos);
        assert_eq!(sql, "ORDER BY \"created_at\" DESC, (\"body\" #> '{salary}') ASC");
    }

    #[test]
    fn rejects_injection_in_sort_field() {
        assert!(FilterOrder::validate_and_parse(&json!("name;drop")).is_err());
    }
}
