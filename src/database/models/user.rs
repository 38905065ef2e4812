use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Audit, CompanyRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<Uuid>,
    #[serde(default)]
    pub company: Option<CompanyRef>,
    /// SHA-256 digest of the active refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// User as returned by the API, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub role: Option<Uuid>,
    pub company: Option<CompanyRef>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            age: user.age,
            gender: user.gender,
            address: user.address,
            role: user.role,
            company: user.company,
            audit: user.audit,
        }
    }
}
