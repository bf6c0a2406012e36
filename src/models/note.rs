use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A free-standing note outside the daily chat flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickNote {
    pub id: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QuickNote {
    pub fn new(content: impl Into<String>, tags: Vec<String>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            tags,
            created_at: now,
            updated_at: now,
        }
    }
}
