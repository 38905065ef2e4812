use axum::{
    async_trait,
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{Claims, PermissionGrant, RoleRef};
use crate::database::models::Actor;
use crate::error::ApiError;

/// Authenticated caller, decoded from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Option<RoleRef>,
    pub permissions: Vec<PermissionGrant>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            email: self.email.clone(),
        }
    }

    /// Exact match of route template and verb against the token's grants
    pub fn allows(&self, method: &Method, route: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.api_path == route && p.method == method.as_str())
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            permissions: claims.permissions,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Token is missing"))
    }
}

/// Route-level guard: authenticates the bearer token, then checks the caller's
/// permission set against the matched route template and method.
pub async fn authorization_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().clone();
    let access = state.policy.access(&method, &route);

    if access.public {
        debug!("{} {} is public", method, route);
        return Ok(next.run(request).await);
    }

    let token = extract_jwt_from_headers(request.headers()).map_err(|msg| {
        debug!("{} {} rejected: {}", method, route, msg);
        ApiError::unauthorized(msg)
    })?;

    let claims = state.tokens.verify_access(&token).map_err(|e| {
        warn!("{} {} rejected: {}", method, route, e);
        ApiError::unauthorized("Token is invalid or has expired")
    })?;
    let user = AuthUser::from(claims);

    let allowed = state.policy.in_auth_namespace(&route) || access.skip_permission_check || user.allows(&method, &route);
    if !allowed {
        warn!("{} denied {} {}", user.email, method, route);
        return Err(ApiError::forbidden("You have no permission to access this endpoint"));
    }

    debug!("{} allowed {} {}", user.email, method, route);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(grants: &[(&str, &str)]) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.io".into(),
            name: "A".into(),
            role: None,
            permissions: grants
                .iter()
                .map(|(path, method)| PermissionGrant {
                    api_path: path.to_string(),
                    method: method.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn grants_match_template_and_verb_exactly() {
        let user = user(&[("/api/v1/jobs/:id", "PATCH")]);
        assert!(user.allows(&Method::PATCH, "/api/v1/jobs/:id"));
        assert!(!user.allows(&Method::DELETE, "/api/v1/jobs/:id"));
        assert!(!user.allows(&Method::PATCH, "/api/v1/jobs"));
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer  "));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def");
    }
}
