// handlers/roles.rs - /roles[/:id] handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Role;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::role_service::{CreateRoleDto, RoleDetail, UpdateRoleDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateRoleDto>,
) -> ApiResult<Created> {
    let created = state.roles.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a role"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Role>>> {
    let page = state.roles.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch roles with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<RoleDetail> {
    let found = state.roles.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a role by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateRoleDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.roles.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a role"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.roles.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a role"))
}
