// handlers/subscribers.rs - /subscribers[/:id], /subscribers/skills handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Subscriber;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::subscriber_service::{CreateSubscriberDto, SubscriberSkills, UpdateSubscriberDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateSubscriberDto>,
) -> ApiResult<Created> {
    let created = state.subscribers.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a subscriber"))
}

/// PATCH /subscribers - the caller's own subscription, created on first use
pub async fn update_self(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateSubscriberDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.subscribers.update_self(dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a subscriber"))
}

pub async fn skills(State(state): State<AppState>, user: AuthUser) -> ApiResult<Option<SubscriberSkills>> {
    let skills = state.subscribers.skills(&user.actor()).await?;
    Ok(ApiResponse::created(skills).message("Get subscriber's skills"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Subscriber>>> {
    let page = state.subscribers.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch subscribers with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<Subscriber>> {
    let found = state.subscribers.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a subscriber by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateSubscriberDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.subscribers.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a subscriber"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.subscribers.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a subscriber"))
}
