pub mod auth_service;
pub mod bootstrap_service;
pub mod company_service;
pub mod job_service;
pub mod mail_service;
pub mod permission_service;
pub mod resume_service;
pub mod role_service;
pub mod subscriber_service;
pub mod user_service;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password::PasswordError;
use crate::auth::JwtError;
use crate::database::models::Actor;
use crate::database::{DatabaseError, Record, Repository};
use crate::filter::ListQuery;
use crate::mail::MailError;

pub use auth_service::AuthService;
pub use bootstrap_service::BootstrapService;
pub use company_service::CompanyService;
pub use job_service::JobService;
pub use mail_service::MailService;
pub use permission_service::PermissionService;
pub use resume_service::ResumeService;
pub use role_service::RoleService;
pub use subscriber_service::SubscriberService;
pub use user_service::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        ServiceError::Validation { message, field_errors }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Malformed ids are reported exactly like missing ones
pub fn parse_id(raw: &str, entity: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::NotFound(format!("{} with id {} not found", entity, raw)))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub current: i64,
    pub page_size: i64,
    pub pages: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T> {
    pub meta: ListMeta,
    pub result: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn new(query: &ListQuery, total: i64, result: Vec<T>) -> Self {
        let pages = total / query.page_size + i64::from(total % query.page_size != 0);
        Self {
            meta: ListMeta {
                current: query.current,
                page_size: query.page_size,
                pages,
                total,
            },
            result,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            meta: self.meta,
            result: self.result.into_iter().map(f).collect(),
        }
    }
}

/// Runs a paged list query against a repository
pub(crate) async fn list_page<T>(repo: &Repository<T>, query: &ListQuery) -> ServiceResult<ListResult<Record<T>>>
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    let total = repo.count(query.count_filter()).await.map_err(filter_as_bad_request)?;
    let result = repo.select_any(query.page_filter()).await.map_err(filter_as_bad_request)?;
    Ok(ListResult::new(query, total, result))
}

/// Malformed filters from the query string are client errors
fn filter_as_bad_request(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::Filter(e) => ServiceError::BadRequest(e.to_string()),
        other => other.into(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateAck {
    pub fn modified() -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteAck {
    pub deleted: u64,
}

/// Soft-deletes a record, telling "never existed" apart from "already deleted"
pub(crate) async fn soft_delete<T>(repo: &Repository<T>, id: Uuid, actor: &Actor, entity: &str) -> ServiceResult<DeleteAck>
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    if repo.find_by_id_with_deleted(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("{} with id {} not found", entity, id)));
    }
    let mut stamp = Map::new();
    stamp.insert("deletedBy".to_string(), serde_json::to_value(actor).map_err(DatabaseError::from)?);
    let deleted = repo.soft_delete(id, stamp).await?;
    Ok(DeleteAck { deleted: u64::from(deleted) })
}

/// Applies a patch to a live record, stamping `updatedBy`
pub(crate) async fn apply_update<T>(
    repo: &Repository<T>,
    id: Uuid,
    mut patch: Map<String, Value>,
    actor: &Actor,
    entity: &str,
) -> ServiceResult<UpdateAck>
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    patch.insert("updatedBy".to_string(), serde_json::to_value(actor).map_err(DatabaseError::from)?);
    match repo.update(id, patch).await? {
        Some(_) => Ok(UpdateAck::modified()),
        None => Err(ServiceError::NotFound(format!("{} with id {} not found", entity, id))),
    }
}

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .unwrap()
});

pub fn is_email_valid(email: &str) -> bool {
    email.len() <= 320 && EMAIL_REGEX.is_match(email)
}

/// Collects field-level problems and reports them together
#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn require(&mut self, field: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.add(field, message);
        }
    }

    pub fn require_some<T>(&mut self, field: &str, value: &Option<T>, message: &str) {
        if value.is_none() {
            self.add(field, message);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "Email must not be empty");
        } else if !is_email_valid(value.trim()) {
            self.add(field, "Email is not valid");
        }
    }

    pub fn finish(self) -> ServiceResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation {
                message: "Validation failed".to_string(),
                field_errors: self.0,
            })
        }
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_ids_are_not_found() {
        assert!(matches!(parse_id("abc", "User"), Err(ServiceError::NotFound(_))));
        assert!(parse_id(&Uuid::new_v4().to_string(), "User").is_ok());
    }

    #[test]
    fn list_meta_rounds_pages_up() {
        let query = ListQuery::new(2, 10);
        let list = ListResult::new(&query, 21, vec![1, 2]);
        assert_eq!(list.meta.pages, 3);
        assert_eq!(list.meta.current, 2);
        assert_eq!(ListResult::<i32>::new(&query, 0, vec![]).meta.pages, 0);
    }

    #[test]
    fn list_meta_survives_huge_page_sizes() {
        let query = ListQuery::new(1, i64::MAX);
        assert_eq!(ListResult::<i32>::new(&query, 2, vec![]).meta.pages, 1);
        let query = ListQuery::new(1, 1);
        assert_eq!(ListResult::<i32>::new(&query, i64::MAX, vec![]).meta.pages, i64::MAX);
    }

    #[test]
    fn field_errors_collect_and_fail() {
        let mut errors = FieldErrors::new();
        errors.email("email", "not-an-email");
        errors.require("name", " ", "Name must not be empty");
        match errors.finish() {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert_eq!(field_errors.len(), 2);
                assert_eq!(field_errors["email"], "Email is not valid");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(FieldErrors::new().finish().is_ok());
    }

    #[test]
    fn email_validation() {
        assert!(is_email_valid("admin@gmail.com"));
        assert!(!is_email_valid("admin@"));
        assert!(!is_email_valid("admin gmail.com"));
    }

    #[test]
    fn dates_accept_both_forms() {
        assert!(parse_date("2030-01-01").is_some());
        assert!(parse_date("2030-01-01T10:00:00Z").is_some());
        assert!(parse_date("next week").is_none());
    }
}
