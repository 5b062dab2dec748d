use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user together with the groups they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(id: String, username: String, email: Option<String>) -> Self {
        Self {
            id,
            username,
            email,
            groups: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
