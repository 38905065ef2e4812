use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::auth::{PermissionGrant, RoleRef};
use crate::database::collections::{PERMISSIONS, ROLES};
use crate::database::models::role::ADMIN_ROLE;
use crate::database::models::{Actor, Audit, Permission, Role};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::{FilterData, ListQuery};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub permissions: Option<Vec<String>>,
}

/// Populated entry of a role's permission list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub api_path: String,
    pub method: String,
    pub module: String,
}

impl From<Record<Permission>> for PermissionSummary {
    fn from(record: Record<Permission>) -> Self {
        Self {
            id: record.id,
            name: record.data.name,
            api_path: record.data.api_path,
            method: record.data.method,
            module: record.data.module,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub permissions: Vec<PermissionSummary>,
}

/// What a role grants at this moment
#[derive(Debug, Clone, Default)]
pub struct ResolvedRole {
    pub role: Option<RoleRef>,
    pub permissions: Vec<PermissionGrant>,
}

fn parse_permission_ids(raw: &[String]) -> ServiceResult<Vec<Uuid>> {
    raw.iter()
        .map(|id| {
            Uuid::parse_str(id.trim())
                .map_err(|_| ServiceError::validation("permissions", format!("Permission id {} is not valid", id)))
        })
        .collect()
}

#[derive(Clone)]
pub struct RoleService {
    repo: Repository<Role>,
    permissions: Repository<Permission>,
}

impl RoleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(ROLES, store.clone()),
            permissions: Repository::new(PERMISSIONS, store),
        }
    }

    async fn name_taken(&self, name: &str, except: Option<Uuid>) -> ServiceResult<bool> {
        let mut filter = json!({ "name": name });
        if let Some(id) = except {
            filter["_id"] = json!({ "$ne": id });
        }
        Ok(self.repo.exists(filter).await?)
    }

    pub async fn create(&self, dto: CreateRoleDto, actor: &Actor) -> ServiceResult<Created> {
        let mut errors = FieldErrors::new();
        errors.require("name", &dto.name, "Name must not be empty");
        errors.require_some("isActive", &dto.is_active, "isActive must be a boolean");
        errors.finish()?;
        let permissions = parse_permission_ids(&dto.permissions)?;

        let name = dto.name.trim().to_string();
        if self.name_taken(&name, None).await? {
            return Err(ServiceError::Conflict(format!("Role with name={} already exists", name)));
        }

        let record = self
            .repo
            .insert(&Role {
                name,
                description: dto.description,
                is_active: dto.is_active.unwrap_or(true),
                permissions,
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Role {} created by {}", record.data.name, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Role>>> {
        list_page(&self.repo, query).await
    }

    async fn find(&self, id: &str) -> ServiceResult<Record<Role>> {
        let id = parse_id(id, "Role")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role with id {} not found", id)))
    }

    /// The role with its live permissions populated
    pub async fn get_by_id(&self, id: &str) -> ServiceResult<RoleDetail> {
        let role = self.find(id).await?;
        let permissions = self.permissions.select_ids(&role.data.permissions).await?;
        Ok(RoleDetail {
            id: role.id,
            name: role.data.name,
            description: role.data.description,
            is_active: role.data.is_active,
            permissions: permissions.into_iter().map(PermissionSummary::from).collect(),
        })
    }

    pub async fn update(&self, id: &str, dto: UpdateRoleDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let current = self.find(id).await?;

        let mut patch = Map::new();
        if let Some(name) = dto.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::validation("name", "Name must not be empty"));
            }
            if name != current.data.name && self.name_taken(&name, Some(current.id)).await? {
                return Err(ServiceError::Conflict(format!("Role with name={} already exists", name)));
            }
            patch.insert("name".into(), Value::String(name));
        }
        if let Some(description) = dto.description {
            patch.insert("description".into(), Value::String(description));
        }
        if let Some(active) = dto.is_active {
            patch.insert("isActive".into(), Value::Bool(active));
        }
        if let Some(raw) = dto.permissions {
            patch.insert("permissions".into(), json!(parse_permission_ids(&raw)?));
        }
        apply_update(&self.repo, current.id, patch, actor, "Role").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Role")?;
        if let Some(role) = self.repo.find_by_id(id).await? {
            if role.data.name == ADMIN_ROLE {
                return Err(ServiceError::BadRequest(format!("Can not remove role {}", ADMIN_ROLE)));
            }
        }
        soft_delete(&self.repo, id, actor, "Role").await
    }

    pub async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Record<Role>>> {
        Ok(self.repo.select_one(FilterData::where_(json!({ "name": name }))).await?)
    }

    /// Joins a user's role to its current permission set. Inactive or deleted roles grant nothing.
    pub async fn resolve(&self, role_id: Option<Uuid>) -> ServiceResult<ResolvedRole> {
        let Some(role_id) = role_id else {
            return Ok(ResolvedRole::default());
        };
        let Some(role) = self.repo.find_by_id(role_id).await? else {
            return Ok(ResolvedRole::default());
        };

        let permissions = if role.data.is_active {
            self.permissions
                .select_ids(&role.data.permissions)
                .await?
                .into_iter()
                .map(|p| PermissionGrant {
                    api_path: p.data.api_path,
                    method: p.data.method,
                })
                .collect()
        } else {
            vec![]
        };

        Ok(ResolvedRole {
            role: Some(RoleRef {
                id: role.id,
                name: role.data.name,
            }),
            permissions,
        })
    }

    pub async fn insert_many(&self, roles: &[Role]) -> ServiceResult<usize> {
        Ok(self.repo.insert_many(roles).await?.len())
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.repo.count(FilterData::default()).await?)
    }
}
