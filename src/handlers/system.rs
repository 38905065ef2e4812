// handlers/system.rs - GET / and GET /health
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = state.policy.prefix();

    Json(json!({
        "success": true,
        "data": {
            "name": "Recruit API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Recruitment platform backend with role-based access control",
            "endpoints": {
                "health": "/health (public)",
                "auth": format!("{}/auth/* (login, register, refresh public)", prefix),
                "users": format!("{}/users[/:id]", prefix),
                "companies": format!("{}/companies[/:id]", prefix),
                "jobs": format!("{}/jobs[/:id]", prefix),
                "roles": format!("{}/roles[/:id]", prefix),
                "permissions": format!("{}/permissions[/:id]", prefix),
                "resumes": format!("{}/resumes[/:id]", prefix),
                "subscribers": format!("{}/subscribers[/:id]", prefix),
                "mail": format!("{}/mail", prefix),
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            let error = ApiError::service_unavailable("database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(error.to_json()))
        }
    }
}
