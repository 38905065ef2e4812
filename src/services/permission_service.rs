use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::database::collections::PERMISSIONS;
use crate::database::models::{Actor, Audit, Permission};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::ListQuery;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub module: String,
}

impl CreatePermissionDto {
    fn validate(&self) -> ServiceResult<()> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Name must not be empty");
        errors.require("apiPath", &self.api_path, "API path must not be empty");
        errors.require("module", &self.module, "Module must not be empty");
        validate_method(&mut errors, &self.method);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionDto {
    pub name: Option<String>,
    pub api_path: Option<String>,
    pub method: Option<String>,
    pub module: Option<String>,
}

fn validate_method(errors: &mut FieldErrors, method: &str) {
    if !HTTP_METHODS.contains(&method.trim().to_ascii_uppercase().as_str()) {
        errors.add("method", format!("Method must be one of {}", HTTP_METHODS.join(", ")));
    }
}

#[derive(Clone)]
pub struct PermissionService {
    repo: Repository<Permission>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(PERMISSIONS, store),
        }
    }

    async fn route_taken(&self, api_path: &str, method: &str, except: Option<Uuid>) -> ServiceResult<bool> {
        let mut filter = json!({ "apiPath": api_path, "method": method });
        if let Some(id) = except {
            filter["_id"] = json!({ "$ne": id });
        }
        Ok(self.repo.exists(filter).await?)
    }

    pub async fn create(&self, dto: CreatePermissionDto, actor: &Actor) -> ServiceResult<Created> {
        dto.validate()?;
        let method = dto.method.trim().to_ascii_uppercase();
        let api_path = dto.api_path.trim().to_string();

        if self.route_taken(&api_path, &method, None).await? {
            return Err(ServiceError::Conflict(format!(
                "Permission with apiPath={} , method={} already exists",
                api_path, method
            )));
        }

        let record = self
            .repo
            .insert(&Permission {
                name: dto.name.trim().to_string(),
                api_path,
                method,
                module: dto.module.trim().to_ascii_uppercase(),
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Permission {} {} created by {}", record.data.method, record.data.api_path, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Permission>>> {
        list_page(&self.repo, query).await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<Permission>> {
        let id = parse_id(id, "Permission")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Permission with id={} not found", id)))
    }

    pub async fn update(&self, id: &str, dto: UpdatePermissionDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let current = self.get_by_id(id).await?;

        let mut errors = FieldErrors::new();
        if let Some(method) = &dto.method {
            validate_method(&mut errors, method);
        }
        if let Some(path) = &dto.api_path {
            errors.require("apiPath", path, "API path must not be empty");
        }
        errors.finish()?;

        let api_path = dto.api_path.as_deref().map(str::trim).unwrap_or(&current.data.api_path).to_string();
        let method = dto
            .method
            .as_deref()
            .map(|m| m.trim().to_ascii_uppercase())
            .unwrap_or_else(|| current.data.method.clone());
        if self.route_taken(&api_path, &method, Some(current.id)).await? {
            return Err(ServiceError::Conflict(format!(
                "Permission with apiPath={} , method={} already exists",
                api_path, method
            )));
        }

        let mut patch = Map::new();
        patch.insert("apiPath".into(), Value::String(api_path));
        patch.insert("method".into(), Value::String(method));
        if let Some(name) = dto.name {
            patch.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(module) = dto.module {
            patch.insert("module".into(), Value::String(module.trim().to_ascii_uppercase()));
        }
        apply_update(&self.repo, current.id, patch, actor, "Permission").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Permission")?;
        soft_delete(&self.repo, id, actor, "Permission").await
    }

    /// Ids of every live permission, in creation order
    pub async fn all_ids(&self) -> ServiceResult<Vec<Uuid>> {
        let all = self.repo.select_any(Default::default()).await?;
        Ok(all.into_iter().map(|p| p.id).collect())
    }

    pub async fn insert_many(&self, permissions: &[Permission]) -> ServiceResult<usize> {
        Ok(self.repo.insert_many(permissions).await?.len())
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.repo.count(Default::default()).await?)
    }
}
