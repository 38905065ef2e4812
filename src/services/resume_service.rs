use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::company_service::CompanyService;
use super::job_service::JobService;
use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::database::collections::RESUMES;
use crate::database::models::{Actor, Audit, Resume, ResumeHistory, ResumeStatus};
use crate::database::record::timestamp;
use crate::database::store::now;
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::{FilterData, ListQuery};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResumeDto {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default)]
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResumeDto {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// A caller's resume with its company and job names resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResume {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub url: String,
    pub status: ResumeStatus,
    pub company_id: Option<NamedRef>,
    pub job_id: Option<NamedRef>,
    pub history: Vec<ResumeHistory>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn id_field(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<Uuid> {
    let parsed = Uuid::parse_str(raw.trim()).ok();
    if parsed.is_none() {
        errors.add(field, format!("{} must be a valid id", field));
    }
    parsed
}

#[derive(Clone)]
pub struct ResumeService {
    repo: Repository<Resume>,
    companies: CompanyService,
    jobs: JobService,
}

impl ResumeService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(RESUMES, store.clone()),
            companies: CompanyService::new(store.clone()),
            jobs: JobService::new(store),
        }
    }

    /// Submits a resume for the caller; it starts out `PENDING`
    pub async fn create(&self, dto: CreateResumeDto, actor: &Actor) -> ServiceResult<Created> {
        let mut errors = FieldErrors::new();
        errors.require("url", &dto.url, "Url must not be empty");
        let company_id = id_field(&mut errors, "companyId", &dto.company_id);
        let job_id = id_field(&mut errors, "jobId", &dto.job_id);
        errors.finish()?;
        let (Some(company_id), Some(job_id)) = (company_id, job_id) else {
            return Err(ServiceError::BadRequest("Resume is missing required fields".to_string()));
        };

        let status = ResumeStatus::Pending;
        let record = self
            .repo
            .insert(&Resume {
                email: actor.email.clone(),
                user_id: actor.id,
                url: dto.url.trim().to_string(),
                status,
                company_id,
                job_id,
                history: vec![ResumeHistory {
                    status,
                    updated_at: now(),
                    updated_by: actor.clone(),
                }],
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Resume {} submitted by {}", record.id, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Resume>>> {
        list_page(&self.repo, query).await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<Resume>> {
        let id = parse_id(id, "Resume")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resume with id {} not found", id)))
    }

    /// Moves the resume to a new status and appends it to the history
    pub async fn update(&self, id: &str, dto: UpdateResumeDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let status: ResumeStatus = dto
            .status
            .parse()
            .map_err(|_| ServiceError::validation("status", "Status must be one of PENDING, REVIEWING, APPROVED, REJECTED"))?;
        let current = self.get_by_id(id).await?;

        let mut history = current.data.history;
        history.push(ResumeHistory {
            status,
            updated_at: now(),
            updated_by: actor.clone(),
        });

        let mut patch = Map::new();
        patch.insert("status".into(), Value::String(status.to_string()));
        patch.insert("history".into(), json!(history));
        apply_update(&self.repo, current.id, patch, actor, "Resume").await
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Resume")?;
        soft_delete(&self.repo, id, actor, "Resume").await
    }

    /// The caller's resumes, newest first
    pub async fn by_user(&self, actor: &Actor) -> ServiceResult<Vec<UserResume>> {
        let resumes = self
            .repo
            .select_any(FilterData {
                where_clause: Some(json!({ "userId": actor.id })),
                order: Some(json!("-createdAt")),
                ..Default::default()
            })
            .await?;

        let company_ids: Vec<Uuid> = resumes.iter().map(|r| r.data.company_id).collect();
        let job_ids: Vec<Uuid> = resumes.iter().map(|r| r.data.job_id).collect();
        let companies: HashMap<Uuid, String> = self
            .companies
            .references(&company_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let jobs: HashMap<Uuid, String> = self
            .jobs
            .find_many(&job_ids)
            .await?
            .into_iter()
            .map(|j| (j.id, j.data.name))
            .collect();

        let named = |lookup: &HashMap<Uuid, String>, id: Uuid| lookup.get(&id).map(|name| NamedRef { id, name: name.clone() });

        Ok(resumes
            .into_iter()
            .map(|r| UserResume {
                id: r.id,
                company_id: named(&companies, r.data.company_id),
                job_id: named(&jobs, r.data.job_id),
                email: r.data.email,
                url: r.data.url,
                status: r.data.status,
                history: r.data.history,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect())
    }
}
