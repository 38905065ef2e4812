// handlers/auth.rs - /auth/* handlers
//
// The refresh token never appears in a response body; it travels in the
// HTTP-only `refresh_token` cookie scoped to `/`.
use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::Created;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::auth_service::{LoginResponse, Session, SessionUser};
use crate::services::user_service::RegisterUserDto;

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Deserialize)]
pub struct LoginDto {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .path("/")
        .secure(state.config.security.cookie_secure)
        .max_age(time::Duration::seconds(state.tokens.refresh_ttl_secs()))
        .build()
}

fn with_session(state: &AppState, jar: CookieJar, session: Session) -> (CookieJar, LoginResponse) {
    let jar = jar.add(refresh_cookie(state, session.refresh_token));
    (jar, session.response)
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(dto): JsonBody<LoginDto>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    if dto.username.trim().is_empty() || dto.password.is_empty() {
        return Err(ApiError::unauthorized("Username/password is invalid"));
    }
    let session = state.auth.login(dto.username.trim(), &dto.password).await?;
    let (jar, body) = with_session(&state, jar, session);
    Ok((jar, ApiResponse::created(body).message("User Login")))
}

/// POST /auth/register
pub async fn register(State(state): State<AppState>, JsonBody(dto): JsonBody<RegisterUserDto>) -> ApiResult<Created> {
    let created = state.auth.register(dto).await?;
    Ok(ApiResponse::created(created).message("Register a new user"))
}

/// GET /auth/account
pub async fn account(State(state): State<AppState>, user: AuthUser) -> ApiResult<Value> {
    let account: SessionUser = state.auth.account(&user.actor()).await?;
    Ok(ApiResponse::success(json!({ "user": account })).message("Get user information"))
}

/// GET /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let session = state.auth.process_new_token(token.as_deref()).await?;
    let (jar, body) = with_session(&state, jar, session);
    Ok((jar, ApiResponse::success(body).message("Get User by refresh token")))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: AuthUser,
) -> Result<(CookieJar, ApiResponse<&'static str>), ApiError> {
    state.auth.logout(&user.actor()).await?;
    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, ApiResponse::created("ok").message("Logout User")))
}
