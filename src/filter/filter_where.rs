use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{Condition, FilterOp, FilterWhereInfo, SqlParam};

/// Timestamp rendering that matches the string form stored in document bodies
const TIMESTAMP_FORMAT: &str = r#"'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"'"#;

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse a Mongo-style `where` object into a condition tree
    pub fn parse(where_data: &Value) -> Result<Condition, FilterError> {
        match where_data {
            Value::Null => Ok(Condition::And(vec![])),
            Value::Object(obj) => Ok(Condition::And(Self::parse_object(obj)?)),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_object(obj: &Map<String, Value>) -> Result<Vec<Condition>, FilterError> {
        let mut conditions = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(Self::parse_logical_operator(key, value)?);
            } else {
                conditions.extend(Self::parse_field_condition(key, value)?);
            }
        }
        Ok(conditions)
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires a non-empty array", op)))?;
                let mut parts = Vec::with_capacity(arr.len());
                for v in arr {
                    parts.push(Self::parse(v)?);
                }
                Ok(if op == "$and" { Condition::And(parts) } else { Condition::Or(parts) })
            }
            "$not" => Ok(Condition::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        validate_field_name(field)?;

        let operators = match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => obj,
            // Implicit equality: { field: value }
            _ => {
                return Ok(vec![Condition::Field(FilterWhereInfo {
                    column: field.to_string(),
                    operator: FilterOp::Eq,
                    data: value.clone(),
                })])
            }
        };

        let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");
        let mut conditions = Vec::new();
        for (op_key, op_val) in operators {
            if op_key == "$options" {
                continue;
            }
            let operator = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
            let data = Self::validate_operand(operator, op_val, options)?;
            conditions.push(Condition::Field(FilterWhereInfo {
                column: field.to_string(),
                operator,
                data,
            }));
        }
        Ok(conditions)
    }

    fn validate_operand(operator: FilterOp, data: &Value, options: &str) -> Result<Value, FilterError> {
        match operator {
            FilterOp::In | FilterOp::NIn => {
                if !data.is_array() {
                    return Err(FilterError::InvalidOperatorData("$in/$nin require an array".to_string()));
                }
                Ok(data.clone())
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => match data {
                Value::Number(_) | Value::String(_) | Value::Bool(_) => Ok(data.clone()),
                _ => Err(FilterError::InvalidOperatorData(
                    "comparison operators require a number, string or boolean".to_string(),
                )),
            },
            FilterOp::Exists => match data {
                Value::Bool(_) => Ok(data.clone()),
                _ => Err(FilterError::InvalidOperatorData("$exists requires a boolean".to_string())),
            },
            FilterOp::Regex => {
                let pattern = data
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$regex requires a string".to_string()))?;
                let pattern = if options.contains('i') && !pattern.starts_with("(?i)") {
                    format!("(?i){}", pattern)
                } else {
                    pattern.to_string()
                };
                regex::Regex::new(&pattern).map_err(|e| FilterError::InvalidOperatorData(format!("invalid $regex: {}", e)))?;
                Ok(Value::String(pattern))
            }
            FilterOp::Eq | FilterOp::Ne => Ok(data.clone()),
        }
    }

    /// Render a condition tree as a WHERE clause with `$n` placeholders
    pub fn generate(condition: &Condition, starting_param_index: usize, include_deleted: bool) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);
        let mut sql_conditions = vec![];
        if !include_deleted {
            sql_conditions.push("NOT \"is_deleted\"".to_string());
        }
        let rendered = filter_where.render(condition);
        if rendered != "TRUE" {
            sql_conditions.push(rendered);
        }
        let where_clause = if sql_conditions.is_empty() { "TRUE".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, filter_where.param_values)
    }

    pub fn generate_empty(include_deleted: bool) -> (String, Vec<SqlParam>) {
        Self::generate(&Condition::And(vec![]), 0, include_deleted)
    }

    fn render(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Field(info) => self.render_field(info),
            Condition::And(parts) => self.render_group(parts, " AND ", "TRUE"),
            Condition::Or(parts) => self.render_group(parts, " OR ", "FALSE"),
            Condition::Not(inner) => format!("NOT ({})", self.render(inner)),
        }
    }

    fn render_group(&mut self, parts: &[Condition], joiner: &str, empty: &str) -> String {
        match parts.len() {
            0 => empty.to_string(),
            1 => self.render(&parts[0]),
            _ => {
                let sql: Vec<String> = parts.iter().map(|p| format!("({})", self.render(p))).collect();
                sql.join(joiner)
            }
        }
    }

    fn render_field(&mut self, info: &FilterWhereInfo) -> String {
        let fx = field_expression(&info.column);
        match info.operator {
            FilterOp::Eq => self.render_eq(&fx, &info.data),
            FilterOp::Ne => format!("NOT ({})", self.render_eq(&fx, &info.data)),
            FilterOp::In => self.render_in(&fx, &info.data),
            FilterOp::NIn => format!("NOT ({})", self.render_in(&fx, &info.data)),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let op = info.operator.comparison().unwrap_or("=");
                let p = self.param(SqlParam::Json(info.data.clone()));
                format!("COALESCE({fx} {op} {p} AND jsonb_typeof({fx}) = jsonb_typeof({p}), FALSE)")
            }
            FilterOp::Regex => {
                let pattern = info.data.as_str().unwrap_or_default().to_string();
                let p = self.param(SqlParam::Text(pattern));
                format!(
                    "COALESCE(CASE WHEN jsonb_typeof({fx}) = 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements({fx}) AS elem WHERE jsonb_typeof(elem) = 'string' AND (elem #>> '{{}}') ~ {p}) ELSE jsonb_typeof({fx}) = 'string' AND ({fx} #>> '{{}}') ~ {p} END, FALSE)"
                )
            }
            FilterOp::Exists => {
                if info.data.as_bool().unwrap_or(true) {
                    format!("{fx} IS NOT NULL")
                } else {
                    format!("{fx} IS NULL")
                }
            }
        }
    }

    fn render_eq(&mut self, fx: &str, data: &Value) -> String {
        if data.is_null() {
            return format!("({fx} IS NULL OR {fx} = 'null'::jsonb)");
        }
        // Equality against an array field matches when any element equals the value
        let p = self.param(SqlParam::Json(data.clone()));
        format!("COALESCE({fx} = {p} OR (jsonb_typeof({fx}) = 'array' AND {fx} @> jsonb_build_array({p})), FALSE)")
    }

    fn render_in(&mut self, fx: &str, data: &Value) -> String {
        let values = data.as_array().cloned().unwrap_or_default();
        if values.is_empty() {
            return "FALSE".to_string();
        }
        let parts: Vec<String> = values.iter().map(|v| format!("({})", self.render_eq(fx, v))).collect();
        parts.join(" OR ")
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::{}", self.param_index, match self.param_values.last() {
            Some(SqlParam::Text(_)) => "text",
            _ => "jsonb",
        })
    }
}

/// Field names are dotted identifiers; anything else could escape the path literal
pub fn validate_field_name(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidColumn("Field name cannot be empty".to_string()));
    }
    for segment in name.split('.') {
        let mut chars = segment.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidColumn(format!("Invalid field name format: {}", name)));
        }
    }
    Ok(())
}

/// `jsonb` expression addressing a document field; system fields map to their columns
pub fn field_expression(path: &str) -> String {
    match path {
        "_id" => "to_jsonb(\"id\")".to_string(),
        "createdAt" => format!("to_jsonb(to_char(\"created_at\" AT TIME ZONE 'UTC', {}))", TIMESTAMP_FORMAT),
        "updatedAt" => format!("to_jsonb(to_char(\"updated_at\" AT TIME ZONE 'UTC', {}))", TIMESTAMP_FORMAT),
        _ => format!("(\"body\" #> '{{{}}}')", path.replace('.', ",")),
    }
}
