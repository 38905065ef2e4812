// handlers/mail.rs - GET /mail, runs the job digest on demand
use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::mail_service::DigestReport;

pub async fn send_digest(State(state): State<AppState>) -> ApiResult<DigestReport> {
    let report = state.mail.send_digest().await?;
    Ok(ApiResponse::success(report).message("Send job digest"))
}
