// handlers/resumes.rs - /resumes[/:id], /resumes/by-user handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Resume;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::resume_service::{CreateResumeDto, UpdateResumeDto, UserResume};
use crate::services::{DeleteAck, ListResult, UpdateAck};

/// Any signed-in user may apply
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateResumeDto>,
) -> ApiResult<Created> {
    let created = state.resumes.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a new resume"))
}

pub async fn by_user(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<UserResume>> {
    let resumes = state.resumes.by_user(&user.actor()).await?;
    Ok(ApiResponse::created(resumes).message("Get Resumes by User"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Resume>>> {
    let page = state.resumes.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch all resumes with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<Resume>> {
    let found = state.resumes.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a resume by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateResumeDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.resumes.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update status resume"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.resumes.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a resume by id"))
}
