// handlers/jobs.rs - /jobs[/:id] handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Job;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::job_service::{CreateJobDto, UpdateJobDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateJobDto>,
) -> ApiResult<Created> {
    let created = state.jobs.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a new job"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Job>>> {
    let page = state.jobs.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch jobs with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<Job>> {
    let found = state.jobs.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a job by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateJobDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.jobs.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a job"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.jobs.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a job"))
}
