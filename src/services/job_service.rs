use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::{apply_update, list_page, parse_date, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::database::collections::JOBS;
use crate::database::models::{Actor, Audit, CompanyRef, Job};
use crate::database::store::{format_timestamp, now};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::{FilterData, ListQuery};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub company: Option<CompanyRef>,
    #[serde(default)]
    pub location: String,
    pub salary: Option<u64>,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobDto {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub company: Option<CompanyRef>,
    pub location: Option<String>,
    pub salary: Option<u64>,
    pub quantity: Option<u32>,
    pub level: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: Option<bool>,
}

fn date_field(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.add(field, format!("{} must be a date (YYYY-MM-DD or RFC 3339)", field));
    }
    parsed
}

fn check_window(errors: &mut FieldErrors, start: DateTime<Utc>, end: DateTime<Utc>) {
    if end <= start {
        errors.add("endDate", "endDate must be after startDate");
    }
}

fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct JobService {
    repo: Repository<Job>,
}

impl JobService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(JOBS, store),
        }
    }

    pub async fn create(&self, dto: CreateJobDto, actor: &Actor) -> ServiceResult<Created> {
        let mut errors = FieldErrors::new();
        errors.require("name", &dto.name, "Name must not be empty");
        errors.require("location", &dto.location, "Location must not be empty");
        errors.require("level", &dto.level, "Level must not be empty");
        errors.require_some("company", &dto.company, "Company must not be empty");
        errors.require_some("salary", &dto.salary, "Salary must not be empty");
        errors.require_some("quantity", &dto.quantity, "Quantity must not be empty");
        let skills = normalize_skills(dto.skills);
        if skills.is_empty() {
            errors.add("skills", "Skills must not be empty");
        }
        let start = date_field(&mut errors, "startDate", &dto.start_date);
        let end = date_field(&mut errors, "endDate", &dto.end_date);
        if let Some(end) = end {
            if end <= now() {
                errors.add("endDate", "endDate must be in the future");
            }
            if let Some(start) = start {
                check_window(&mut errors, start, end);
            }
        }
        errors.finish()?;

        let (Some(company), Some(start_date), Some(end_date)) = (dto.company, start, end) else {
            return Err(ServiceError::BadRequest("Job is missing required fields".to_string()));
        };

        let record = self
            .repo
            .insert(&Job {
                name: dto.name.trim().to_string(),
                skills,
                company,
                location: dto.location.trim().to_string(),
                salary: dto.salary.unwrap_or_default(),
                quantity: dto.quantity.unwrap_or_default(),
                level: dto.level.trim().to_string(),
                description: dto.description,
                start_date,
                end_date,
                is_active: dto.is_active.unwrap_or(true),
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Job {} created by {}", record.data.name, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Job>>> {
        list_page(&self.repo, query).await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<Job>> {
        let id = parse_id(id, "Job")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Job with id {} not found", id)))
    }

    pub async fn update(&self, id: &str, dto: UpdateJobDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let current = self.get_by_id(id).await?;

        let mut errors = FieldErrors::new();
        let start = dto.start_date.as_deref().and_then(|raw| date_field(&mut errors, "startDate", raw));
        let end = dto.end_date.as_deref().and_then(|raw| date_field(&mut errors, "endDate", raw));
        if start.is_some() || end.is_some() {
            check_window(
                &mut errors,
                start.unwrap_or(current.data.start_date),
                end.unwrap_or(current.data.end_date),
            );
        }
        let skills = dto.skills.map(normalize_skills);
        if matches!(&skills, Some(s) if s.is_empty()) {
            errors.add("skills", "Skills must not be empty");
        }
        errors.finish()?;

        let mut patch = Map::new();
        if let Some(name) = dto.name {
            patch.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(skills) = skills {
            patch.insert("skills".into(), json!(skills));
        }
        if let Some(company) = dto.company {
            patch.insert("company".into(), json!(company));
        }
        if let Some(location) = dto.location {
            patch.insert("location".into(), Value::String(location.trim().to_string()));
        }
        if let Some(salary) = dto.salary {
            patch.insert("salary".into(), json!(salary));
        }
        if let Some(quantity) = dto.quantity {
            patch.insert("quantity".into(), json!(quantity));
        }
        if let Some(level) = dto.level {
            patch.insert("level".into(), Value::String(level.trim().to_string()));
        }
        if let Some(description) = dto.description {
            patch.insert("description".into(), Value::String(description));
        }
        if let Some(start) = start {
            patch.insert("startDate".into(), Value::String(format_timestamp(&start)));
        }
        if let Some(end) = end {
            patch.insert("endDate".into(), Value::String(format_timestamp(&end)));
        }
        if let Some(active) = dto.is_active {
            patch.insert("isActive".into(), Value::Bool(active));
        }
        apply_update(&self.repo, current.id, patch, actor, "Job").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Job")?;
        soft_delete(&self.repo, id, actor, "Job").await
    }

    /// Active, still-open jobs sharing at least one skill with `skills`
    pub async fn open_matching(&self, skills: &[String]) -> ServiceResult<Vec<Record<Job>>> {
        if skills.is_empty() {
            return Ok(vec![]);
        }
        let filter = FilterData::where_(json!({
            "skills": { "$in": skills },
            "isActive": true,
            "endDate": { "$gte": format_timestamp(&now()) },
        }));
        Ok(self.repo.select_any(filter).await?)
    }

    pub async fn find_many(&self, ids: &[uuid::Uuid]) -> ServiceResult<Vec<Record<Job>>> {
        Ok(self.repo.select_ids(ids).await?)
    }
}
