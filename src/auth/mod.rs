pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Resolved role carried in the access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// One (route template, method) pair the bearer may call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub api_path: String,
    pub method: String,
}

/// Access token claims. The permission set is materialized at login and immutable for the token's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Option<RoleRef>,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        name: String,
        role: Option<RoleRef>,
        permissions: Vec<PermissionGrant>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            name,
            role,
            permissions,
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    /// Unique per issue, so two tokens minted in the same second still differ
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Signs and verifies the access/refresh token pair with their separate secrets
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    access_ttl_secs: i64,
    refresh_secret: String,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            access_secret: security.access_token_secret.clone(),
            access_ttl_secs: security.access_token_expiry_secs,
            refresh_secret: security.refresh_token_secret.clone(),
            refresh_ttl_secs: security.refresh_token_expiry_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    pub fn issue_access(
        &self,
        user_id: Uuid,
        email: &str,
        name: &str,
        role: Option<RoleRef>,
        permissions: Vec<PermissionGrant>,
    ) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, email.to_string(), name.to_string(), role, permissions, self.access_ttl_secs);
        sign(&claims, &self.access_secret)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            exp: (now + Duration::seconds(self.refresh_ttl_secs)).timestamp(),
            iat: now.timestamp(),
        };
        sign(&claims, &self.refresh_secret)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        verify(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        verify(token, &self.refresh_secret)
    }
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

fn verify<T: for<'de> Deserialize<'de>>(token: &str, secret: &str) -> Result<T, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<T>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Digest stored server-side in place of the raw refresh token
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
