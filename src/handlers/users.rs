// handlers/users.rs - /users[/:id] handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::UserView;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::user_service::{CreateUserDto, UpdateUserDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateUserDto>,
) -> ApiResult<Created> {
    let created = state.users.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a new user"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<UserView>>> {
    let page = state.users.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch all user with paginate"))
}

/// Public: profiles are readable without a token
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<UserView>> {
    let found = state.users.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch user by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateUserDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.users.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a User"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.users.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a User"))
}
