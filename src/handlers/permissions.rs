// handlers/permissions.rs - /permissions[/:id] handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Permission;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::permission_service::{CreatePermissionDto, UpdatePermissionDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreatePermissionDto>,
) -> ApiResult<Created> {
    let created = state.permissions.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a permission"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Permission>>> {
    let page = state.permissions.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch permissions with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<Permission>> {
    let found = state.permissions.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a permission by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdatePermissionDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.permissions.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a permission"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.permissions.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a permission"))
}
