use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity stamp recorded on writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default)]
    pub created_by: Option<Actor>,
    #[serde(default)]
    pub updated_by: Option<Actor>,
    #[serde(default)]
    pub deleted_by: Option<Actor>,
}

impl Audit {
    pub fn created(actor: Option<&Actor>) -> Self {
        Self {
            created_by: actor.cloned(),
            ..Default::default()
        }
    }
}
