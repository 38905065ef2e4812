use serde::{Deserialize, Serialize};

use super::Audit;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub name: String,
    /// Route template as registered with the router, e.g. `/api/v1/jobs/:id`
    pub api_path: String,
    /// Upper-case HTTP verb
    pub method: String,
    pub module: String,
    #[serde(flatten)]
    pub audit: Audit,
}
