// handlers/companies.rs - /companies[/:id] handlers
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

use super::list_query;
use crate::app::AppState;
use crate::database::models::Company;
use crate::database::{Created, Record};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::company_service::{CreateCompanyDto, UpdateCompanyDto};
use crate::services::{DeleteAck, ListResult, UpdateAck};

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(dto): JsonBody<CreateCompanyDto>,
) -> ApiResult<Created> {
    let created = state.companies.create(dto, &user.actor()).await?;
    Ok(ApiResponse::created(created).message("Create a new company"))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<ListResult<Record<Company>>> {
    let page = state.companies.list(&list_query(&state, &params)).await?;
    Ok(ApiResponse::success(page).message("Fetch list company with paginate"))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Record<Company>> {
    let found = state.companies.get_by_id(&id).await?;
    Ok(ApiResponse::success(found).message("Fetch a company by id"))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
    JsonBody(dto): JsonBody<UpdateCompanyDto>,
) -> ApiResult<UpdateAck> {
    let ack = state.companies.update(&id, dto, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Update a company"))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>, user: AuthUser) -> ApiResult<DeleteAck> {
    let ack = state.companies.remove(&id, &user.actor()).await?;
    Ok(ApiResponse::success(ack).message("Delete a company"))
}
