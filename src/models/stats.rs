use serde::{Deserialize, Serialize};

/// Aggregates over the set of dates that have a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalStats {
    pub total_entries: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub entries_this_month: u32,
}

/// Streak pair for a single habit's check-in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}
