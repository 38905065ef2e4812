use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{apply_update, list_page, parse_id, soft_delete, DeleteAck, FieldErrors, ListResult, ServiceError, ServiceResult, UpdateAck};
use crate::database::collections::SUBSCRIBERS;
use crate::database::models::{Actor, Audit, Subscriber};
use crate::database::{Created, DocumentStore, Record, Repository};
use crate::filter::{FilterData, ListQuery};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriberDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubscriberDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberSkills {
    pub skills: Vec<String>,
}

fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        if !cleaned.contains(&skill) {
            cleaned.push(skill);
        }
    }
    cleaned
}

#[derive(Clone)]
pub struct SubscriberService {
    repo: Repository<Subscriber>,
}

impl SubscriberService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            repo: Repository::new(SUBSCRIBERS, store),
        }
    }

    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> ServiceResult<()> {
        let mut filter = json!({ "email": email });
        if let Some(id) = except {
            filter["_id"] = json!({ "$ne": id });
        }
        if self.repo.exists(filter).await? {
            return Err(ServiceError::Conflict(format!("Subscriber with email {} already exists", email)));
        }
        Ok(())
    }

    pub async fn create(&self, dto: CreateSubscriberDto, actor: &Actor) -> ServiceResult<Created> {
        let mut errors = FieldErrors::new();
        errors.require("name", &dto.name, "Name must not be empty");
        errors.email("email", &dto.email);
        let skills = clean_skills(dto.skills);
        if skills.is_empty() {
            errors.add("skills", "Skills must not be empty");
        }
        errors.finish()?;

        let email = dto.email.trim().to_string();
        self.ensure_email_free(&email, None).await?;
        let record = self
            .repo
            .insert(&Subscriber {
                name: dto.name.trim().to_string(),
                email,
                skills,
                audit: Audit::created(Some(actor)),
            })
            .await?;
        info!("Subscriber {} created by {}", record.data.email, actor.email);
        Ok(Created::from(&record))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<ListResult<Record<Subscriber>>> {
        list_page(&self.repo, query).await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Record<Subscriber>> {
        let id = parse_id(id, "Subscriber")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Subscriber with id {} not found", id)))
    }

    pub async fn update(&self, id: &str, dto: UpdateSubscriberDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let current = self.get_by_id(id).await?;
        let patch = self.patch_from(dto, &current).await?;
        apply_update(&self.repo, current.id, patch, actor, "Subscriber").await
    }

    /// Creates or updates the subscription registered under the caller's email
    pub async fn update_self(&self, dto: UpdateSubscriberDto, actor: &Actor) -> ServiceResult<UpdateAck> {
        let existing = self.find_by_email(&actor.email).await?;
        match existing {
            Some(current) => {
                let dto = UpdateSubscriberDto { email: None, ..dto };
                let patch = self.patch_from(dto, &current).await?;
                apply_update(&self.repo, current.id, patch, actor, "Subscriber").await
            }
            None => {
                let skills = clean_skills(dto.skills.unwrap_or_default());
                let name = dto.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| actor.email.clone());
                self.repo
                    .insert(&Subscriber {
                        name: name.trim().to_string(),
                        email: actor.email.clone(),
                        skills,
                        audit: Audit::created(Some(actor)),
                    })
                    .await?;
                info!("Subscriber {} created by self-service", actor.email);
                Ok(UpdateAck {
                    acknowledged: true,
                    matched_count: 0,
                    modified_count: 1,
                })
            }
        }
    }

    async fn patch_from(&self, dto: UpdateSubscriberDto, current: &Record<Subscriber>) -> ServiceResult<Map<String, Value>> {
        let mut patch = Map::new();
        if let Some(email) = dto.email {
            let email = email.trim().to_string();
            let mut errors = FieldErrors::new();
            errors.email("email", &email);
            errors.finish()?;
            if email != current.data.email {
                self.ensure_email_free(&email, Some(current.id)).await?;
            }
            patch.insert("email".into(), Value::String(email));
        }
        if let Some(name) = dto.name {
            patch.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(skills) = dto.skills {
            patch.insert("skills".into(), json!(clean_skills(skills)));
        }
        Ok(patch)
    }

    pub async fn remove(&self, id: &str, actor: &Actor) -> ServiceResult<DeleteAck> {
        let id = parse_id(id, "Subscriber")?;
        soft_delete(&self.repo, id, actor, "Subscriber").await
    }

    /// Skills of the caller's subscription, `None` when not subscribed
    pub async fn skills(&self, actor: &Actor) -> ServiceResult<Option<SubscriberSkills>> {
        Ok(self
            .find_by_email(&actor.email)
            .await?
            .map(|s| SubscriberSkills { skills: s.data.skills }))
    }

    pub async fn all(&self) -> ServiceResult<Vec<Record<Subscriber>>> {
        Ok(self.repo.select_any(FilterData::default()).await?)
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<Record<Subscriber>>> {
        Ok(self.repo.select_one(FilterData::where_(json!({ "email": email }))).await?)
    }
}
