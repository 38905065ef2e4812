use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::database::collections::COMPANIES;
use crate::database::models::{Actor, Audit, Company, CompanyRef};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::ListQuery;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompanyDto {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

#[derive(Clone)]
pub struct CompanyService {
    repo: Repository<Company>,
}

impl CompanyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(COMPANIES, store),
        }
    }

    pub async fn create(&self, dto: CreateCompanyDto, actor: &Actor) -> ServiceResult<Created> {
        let mut errors = FieldErrors::new();
        errors.require("name", &dto.name, "Name must not be empty");
        errors.require("address", &dto.address, "Address must not be empty");
        errors.finish()?;

        let record = self
            .repo
            .insert(&Company {
                name: dto.name.trim().to_string(),
                address: dto.address.trim().to_string(),
                description: dto.description,
                logo: dto.logo,
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Company {} created by {}", record.data.name, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Company>>> {
        list_page(&self.repo, query).await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<Company>> {
        let id = parse_id(id, "Company")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Company with id {} not found", id)))
    }

    pub async fn update(&self, id: &str, dto: UpdateCompanyDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let id = parse_id(id, "Company")?;
        let mut patch = Map::new();
        if let Some(name) = dto.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("name", "Name must not be empty"));
            }
            patch.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(address) = dto.address {
            patch.insert("address".into(), Value::String(address.trim().to_string()));
        }
        if let Some(description) = dto.description {
            patch.insert("description".into(), Value::String(description));
        }
        if let Some(logo) = dto.logo {
            patch.insert("logo".into(), Value::String(logo));
        }
        apply_update(&self.repo, id, patch, actor, "Company").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Company")?;
        soft_delete(&self.repo, id, actor, "Company").await
    }

    /// Live companies among `ids`, as embeddable references
    pub async fn references(&self, ids: &[Uuid]) -> ServiceResult<Vec<CompanyRef>> {
        Ok(self
            .repo
            .select_ids(ids)
            .await?
            .into_iter()
            .map(|c| CompanyRef {
                id: c.id,
                name: c.data.name,
                logo: c.data.logo,
            })
            .collect())
    }
}
