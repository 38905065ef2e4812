use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Audit;

pub const ADMIN_ROLE: &str = "SUPER_ADMIN";
pub const USER_ROLE: &str = "NORMAL_USER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active: bool,
    /// Permission ids, resolved by reference at login
    #[serde(default)]
    pub permissions: Vec<Uuid>,
    #[serde(flatten)]
    pub audit: Audit,
}
