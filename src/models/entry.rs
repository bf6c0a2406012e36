use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mood labels are mirrored into the tag list under this prefix so tag
/// search finds them alongside regular tags.
pub const MOOD_TAG_PREFIX: &str = "#mood-";

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// One message inside a day's conversation. `id` stays stable across edits
/// and merges; an edit replaces `content` and bumps `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    /// Creation or last-edit time, epoch milliseconds.
    pub timestamp: i64,
    pub image_uri: Option<String>,
    pub reply_to_message_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
            content: content.into(),
            timestamp,
            image_uri: None,
            reply_to_message_id: None,
        }
    }
}

/// One calendar day's journal. At most one exists per day in storage; the
/// `date_key` column enforces that on upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    /// Local midnight of the entry's day, epoch milliseconds.
    pub date_millis: i64,
    pub messages: Vec<ChatMessage>,
    pub tags: Vec<String>,
    pub mood: Option<String>,
}

impl JournalEntry {
    pub fn new_for_date(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date_millis: local_midnight_millis(date),
            messages: Vec::new(),
            tags: Vec::new(),
            mood: None,
        }
    }

    /// The entry's calendar date, projected from `date_millis` in local time.
    pub fn date(&self) -> NaiveDate {
        DateTime::from_timestamp_millis(self.date_millis)
            .map(|dt| dt.with_timezone(&Local).date_naive())
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn date_key(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }

    /// Set or clear the mood, keeping the encoded `#mood-<name>` tag in sync.
    pub fn set_mood(&mut self, mood: Option<String>) {
        self.tags.retain(|t| !t.starts_with(MOOD_TAG_PREFIX));
        if let Some(name) = mood.as_deref() {
            let name = name.trim().to_lowercase();
            if !name.is_empty() {
                self.tags.push(format!("{}{}", MOOD_TAG_PREFIX, name));
            }
        }
        self.mood = mood.filter(|m| !m.trim().is_empty());
    }

    pub fn mood_from_tags(&self) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|t| t.strip_prefix(MOOD_TAG_PREFIX))
    }
}

/// Epoch milliseconds of local midnight for `date`.
pub fn local_midnight_millis(date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight).timestamp_millis())
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
