use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Actor, Audit};
use crate::database::record::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResumeStatus {
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Pending => "PENDING",
            ResumeStatus::Reviewing => "REVIEWING",
            ResumeStatus::Approved => "APPROVED",
            ResumeStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ResumeStatus::Pending),
            "REVIEWING" => Ok(ResumeStatus::Reviewing),
            "APPROVED" => Ok(ResumeStatus::Approved),
            "REJECTED" => Ok(ResumeStatus::Rejected),
            other => Err(format!("unknown resume status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHistory {
    pub status: ResumeStatus,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub email: String,
    pub user_id: Uuid,
    pub url: String,
    pub status: ResumeStatus,
    pub company_id: Uuid,
    pub job_id: Uuid,
    #[serde(default)]
    pub history: Vec<ResumeHistory>,
    #[serde(flatten)]
    pub audit: Audit,
}
