use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::auth::password::hash_password;
use crate::database::collections::USERS;
use crate::database::models::{Actor, Audit, CompanyRef, User, UserView};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::{FilterData, ListQuery};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub role: Option<Uuid>,
    pub company: Option<CompanyRef>,
}

/// Self-service sign-up; the role is assigned by the server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

/// Credentials and identity are not patchable here; unknown keys are dropped
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub role: Option<Uuid>,
    pub company: Option<CompanyRef>,
}

fn validate_profile(name: &str, email: &str, password: &str) -> ServiceResult<()> {
    let mut errors = FieldErrors::new();
    errors.require("name", name, "Name must not be empty");
    errors.email("email", email);
    errors.require("password", password, "Password must not be empty");
    errors.finish()
}

#[derive(Clone)]
pub struct UserService {
    repo: Repository<User>,
    admin_email: String,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, admin_email: impl Into<String>) -> Self {
        Self {
            repo: Repository::new(USERS, store),
            admin_email: admin_email.into(),
        }
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> ServiceResult<()> {
        let mut filter = json!({ "email": email });
        if let Some(id) = except {
            filter["_id"] = json!({ "$ne": id });
        }
        if self.repo.exists(filter).await? {
            return Err(ServiceError::Conflict(format!(
                "Email {} already exists in the system, please use another email",
                email
            )));
        }
        Ok(())
    }

    pub async fn create(&self, dto: CreateUserDto, actor: &Actor) -> ServiceResult<Created> {
        validate_profile(&dto.name, &dto.email, &dto.password)?;
        let email = dto.email.trim().to_string();
        self.ensure_email_free(&email, None).await?;

        let record = self
            .repo
            .insert(&User {
                name: dto.name.trim().to_string(),
                email,
                password: hash_password(&dto.password)?,
                age: dto.age,
                gender: dto.gender,
                address: dto.address,
                role: dto.role,
                company: dto.company,
                refresh_token: None,
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("User {} created by {}", record.data.email, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn register(&self, dto: RegisterUserDto, role: Option<Uuid>) -> ServiceResult<Created> {
        validate_profile(&dto.name, &dto.email, &dto.password)?;
        let email = dto.email.trim().to_string();
        self.ensure_email_free(&email, None).await?;

        let record = self
            .repo
            .insert(&User {
                name: dto.name.trim().to_string(),
                email,
                password: hash_password(&dto.password)?,
                age: dto.age,
                gender: dto.gender,
                address: dto.address,
                role,
                company: None,
                refresh_token: None,
                audit: Audit::default(),
            })
            .await?;
        info!("User {} registered", record.data.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<UserView>>> {
        Ok(list_page(&self.repo, query).await?.map(|r| r.map(UserView::from)))
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<UserView>> {
        let id = parse_id(id, "User")?;
        self.find(id)
            .await?
            .map(|r| r.map(UserView::from))
            .ok_or_else(|| ServiceError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn update(&self, id: &str, dto: UpdateUserDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let id = parse_id(id, "User")?;
        let current = self
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User with id {} not found", id)))?;

        let mut patch = Map::new();
        if let Some(email) = dto.email {
            let email = email.trim().to_string();
            let mut errors = FieldErrors::new();
            errors.email("email", &email);
            errors.finish()?;
            if email != current.data.email {
                self.ensure_email_free(&email, Some(id)).await?;
            }
            patch.insert("email".into(), Value::String(email));
        }
        if let Some(name) = dto.name {
            patch.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(age) = dto.age {
            patch.insert("age".into(), json!(age));
        }
        if let Some(gender) = dto.gender {
            patch.insert("gender".into(), Value::String(gender));
        }
        if let Some(address) = dto.address {
            patch.insert("address".into(), Value::String(address));
        }
        if let Some(role) = dto.role {
            patch.insert("role".into(), json!(role));
        }
        if let Some(company) = dto.company {
            patch.insert("company".into(), json!(company));
        }
        apply_update(&self.repo, id, patch, actor, "User").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "User")?;
        if let Some(user) = self.find(id).await? {
            if user.data.email.eq_ignore_ascii_case(&self.admin_email) {
                warn!("{} tried to remove the admin account", actor.email);
                return Err(ServiceError::BadRequest("Can not remove admin account".to_string()));
            }
        }
        soft_delete(&self.repo, id, actor, "User").await
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<Record<User>>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Record<User>>> {
        Ok(self
            .repo
            .select_one(FilterData::where_(json!({ "email": email.trim() })))
            .await?)
    }

    /// Stores the digest of the user's active refresh token; `None` signs the user out
    pub async fn set_refresh_token(&self, id: Uuid, digest: Option<String>) -> ServiceResult<()> {
        let mut patch = Map::new();
        patch.insert("refreshToken".into(), digest.map(Value::String).unwrap_or(Value::Null));
        self.repo.update(id, patch).await?;
        Ok(())
    }

    pub async fn insert_many(&self, users: &[User]) -> ServiceResult<usize> {
        Ok(self.repo.insert_many(users).await?.len())
    }

    pub async fn count(&self) -> ServiceResult<i64> {
        Ok(self.repo.count(FilterData::default()).await?)
    }
}
