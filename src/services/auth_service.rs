use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::role_service::RoleService;
use super::user_service::{RegisterUserDto, UserService};
use super::{ServiceError, ServiceResult};
use crate::auth::password::verify_password;
use crate::auth::{hash_token, PermissionGrant, RoleRef, TokenIssuer};
use crate::database::models::role::USER_ROLE;
use crate::database::models::{Actor, User};
use crate::database::{Created, Record};

const INVALID_CREDENTIALS: &str = "Username/password is invalid";
const INVALID_REFRESH: &str = "Refresh token is invalid, please login again";

/// Caller identity as returned by login, refresh and account
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Option<RoleRef>,
    pub permissions: Vec<PermissionGrant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: SessionUser,
}

/// A freshly issued token pair. The refresh token travels in a cookie, never in the body.
#[derive(Debug, Clone)]
pub struct Session {
    pub response: LoginResponse,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    roles: RoleService,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: UserService, roles: RoleService, tokens: TokenIssuer) -> Self {
        Self { users, roles, tokens }
    }

    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<Session> {
        let Some(user) = self.users.find_by_email(username).await? else {
            warn!("login for unknown user {}", username);
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };
        if !verify_password(password, &user.data.password)? {
            warn!("login with wrong password for {}", username);
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let session = self.issue_session(&user).await?;
        info!("User {} logged in", user.data.email);
        Ok(session)
    }

    pub async fn register(&self, dto: RegisterUserDto) -> ServiceResult<Created> {
        let role = self.roles.find_by_name(USER_ROLE).await?.map(|r| r.id);
        if role.is_none() {
            warn!("role {} is missing; registering {} without a role", USER_ROLE, dto.email);
        }
        self.users.register(dto, role).await
    }

    /// Exchanges the refresh token on file for a new pair, invalidating the old one
    pub async fn process_new_token(&self, refresh_token: Option<&str>) -> ServiceResult<Session> {
        let token = refresh_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("Refresh token is missing".to_string()))?;

        let claims = self.tokens.verify_refresh(token).map_err(|e| {
            warn!("refresh rejected: {}", e);
            ServiceError::Unauthorized(INVALID_REFRESH.to_string())
        })?;

        let user = self
            .users
            .find(claims.sub)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_REFRESH.to_string()))?;
        if user.data.refresh_token.as_deref() != Some(hash_token(token).as_str()) {
            warn!("refresh token for {} does not match the one on file", user.data.email);
            return Err(ServiceError::Unauthorized(INVALID_REFRESH.to_string()));
        }

        self.issue_session(&user).await
    }

    pub async fn logout(&self, actor: &Actor) -> ServiceResult<()> {
        self.users.set_refresh_token(actor.id, None).await?;
        info!("User {} logged out", actor.email);
        Ok(())
    }

    /// Current identity with the role's permission set as it stands in the store now
    pub async fn account(&self, actor: &Actor) -> ServiceResult<SessionUser> {
        let user = self
            .users
            .find(actor.id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;
        self.session_user(&user).await
    }

    async fn session_user(&self, user: &Record<User>) -> ServiceResult<SessionUser> {
        let resolved = self.roles.resolve(user.data.role).await?;
        Ok(SessionUser {
            id: user.id,
            email: user.data.email.clone(),
            name: user.data.name.clone(),
            role: resolved.role,
            permissions: resolved.permissions,
        })
    }

    async fn issue_session(&self, user: &Record<User>) -> ServiceResult<Session> {
        let session_user = self.session_user(user).await?;
        let access_token = self.tokens.issue_access(
            session_user.id,
            &session_user.email,
            &session_user.name,
            session_user.role.clone(),
            session_user.permissions.clone(),
        )?;
        let refresh_token = self.tokens.issue_refresh(user.id)?;
        self.users.set_refresh_token(user.id, Some(hash_token(&refresh_token))).await?;

        Ok(Session {
            response: LoginResponse {
                access_token,
                user: session_user,
            },
            refresh_token,
        })
    }
}
