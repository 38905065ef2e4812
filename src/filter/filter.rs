use serde_json::Value;
use std::cmp::Ordering;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::matcher;
use super::types::{Condition, FilterData, FilterOrderInfo, SortDirection, SqlResult};
use crate::database::Document;

/// Compiled query against one collection
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    where_data: Option<Condition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    include_deleted: bool,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: None,
            order_data: vec![FilterOrderInfo {
                column: "createdAt".to_string(),
                sort: SortDirection::Asc,
            }],
            limit: None,
            offset: None,
            include_deleted: false,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if data.limit.is_some() || data.offset.is_some() {
            self.limit(data.limit, data.offset)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        self.where_data = Some(FilterWhere::parse(&conditions)?);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        let order_info = FilterOrder::validate_and_parse(&order_spec)?;
        if !order_info.is_empty() {
            self.order_data = order_info;
        }
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if matches!(limit, Some(l) if l < 0) {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if matches!(offset, Some(o) if o < 0) {
            return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
        }

        // Apply max limit from config
        let max_limit = crate::config::config().filter.max_limit.unwrap_or(i64::MAX);
        self.limit = limit.map(|l| {
            if l > max_limit {
                tracing::warn!("Limit {} exceeds max {}, capping to max", l, max_limit);
                max_limit
            } else {
                l
            }
        });
        self.offset = offset;
        Ok(self)
    }

    pub fn include_deleted(&mut self, include: bool) -> &mut Self {
        self.include_deleted = include;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn to_sql(&self, columns: &str) -> SqlResult {
        let (where_clause, params) = self.where_sql();
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", columns),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_sql();
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause),
            params,
        }
    }

    fn where_sql(&self) -> (String, Vec<super::types::SqlParam>) {
        match self.where_data {
            Some(ref condition) => FilterWhere::generate(condition, 0, self.include_deleted),
            None => FilterWhere::generate_empty(self.include_deleted),
        }
    }

    /// In-memory counterpart of the WHERE clause
    pub fn matches(&self, doc: &Document) -> bool {
        if doc.is_deleted && !self.include_deleted {
            return false;
        }
        self.where_data.as_ref().map_or(true, |c| matcher::matches(c, doc))
    }

    /// In-memory counterpart of ORDER BY
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for info in &self.order_data {
            let ord = matcher::compare_for_sort(a.field(&info.column).as_ref(), b.field(&info.column).as_ref(), info.sort);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// In-memory counterpart of LIMIT/OFFSET
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let iter = items.into_iter().skip(offset);
        match self.limit {
            Some(l) => iter.take(l.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        match chars.next() {
            None => Err(FilterError::InvalidTableName("Collection name cannot be empty".to_string())),
            Some(first) if (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => Ok(()),
            Some(_) => Err(FilterError::InvalidTableName(format!("Invalid collection name format: {}", name))),
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
