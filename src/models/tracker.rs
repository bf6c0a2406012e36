use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Done,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
            TaskStatus::Archived => "archived",
        }
    }

    /// Unknown status strings fall back to `Open` rather than failing a row
    /// load.
    pub fn parse(s: &str) -> TaskStatus {
        match s {
            "done" => TaskStatus::Done,
            "archived" => TaskStatus::Archived,
            _ => TaskStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}

impl Task {
    pub fn new(title: impl Into<String>, tags: Vec<String>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            notes: None,
            tags,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// A recurring habit checked off per calendar day. Check-in dates feed the
/// same streak computation as journal entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub archived: bool,
}

impl Habit {
    pub fn new(name: impl Into<String>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            archived: false,
        }
    }
}
