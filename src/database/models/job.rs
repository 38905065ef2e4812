use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Audit, CompanyRef};
use crate::database::record::timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub company: CompanyRef,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub salary: u64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub audit: Audit,
}
