use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use rusqlite::Connection;

use crate::database::{self, queries};
use crate::models::{
    now_millis, ChatMessage, Habit, JournalEntry, JournalStats, QuickNote, Settings,
    StreakSummary, Task, TaskStatus,
};
use crate::services::sync_engine::{self, RemoteSource};
use crate::services::{export, stats_engine};
use crate::utils::config;

/// The application-facing surface of the journal: one handle owning the
/// database connection, the data directory and the settings. Everything a
/// shell UI would call goes through here; the engines underneath stay pure.
pub struct Journal {
    conn: Connection,
    data_dir: PathBuf,
    settings: Settings,
}

impl Journal {
    pub fn open(data_dir: impl Into<PathBuf>, mut settings: Settings) -> Result<Self> {
        config::load_dotenv();
        config::apply_env_defaults(&mut settings);

        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let conn = database::init_database(&data_dir.join("daybook.db"))?;
        info!("opened journal at {}", data_dir.display());

        Ok(Self {
            conn,
            data_dir,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ─── Entries ───

    /// The entry for `date`, created (and persisted) on first access.
    pub fn entry_for(&self, date: NaiveDate) -> Result<JournalEntry> {
        if let Some(entry) = queries::get_entry(&self.conn, date)? {
            return Ok(entry);
        }
        let entry = JournalEntry::new_for_date(date);
        queries::upsert_entry(&self.conn, &entry)?;
        Ok(entry)
    }

    pub fn today_entry(&self) -> Result<JournalEntry> {
        self.entry_for(Local::now().date_naive())
    }

    pub fn set_mood(&self, date: NaiveDate, mood: Option<String>) -> Result<JournalEntry> {
        let mut entry = self.entry_for(date)?;
        entry.set_mood(mood);
        queries::upsert_entry(&self.conn, &entry)?;
        Ok(entry)
    }

    pub fn add_tag(&self, date: NaiveDate, tag: &str) -> Result<JournalEntry> {
        let mut entry = self.entry_for(date)?;
        let tag = tag.trim();
        if !tag.is_empty() && !entry.tags.iter().any(|t| t == tag) {
            entry.tags.push(tag.to_string());
            queries::upsert_entry(&self.conn, &entry)?;
        }
        Ok(entry)
    }

    pub fn remove_tag(&self, date: NaiveDate, tag: &str) -> Result<JournalEntry> {
        let mut entry = self.entry_for(date)?;
        entry.tags.retain(|t| t != tag);
        queries::upsert_entry(&self.conn, &entry)?;
        Ok(entry)
    }

    // ─── Messages ───

    pub fn send_message(
        &self,
        date: NaiveDate,
        role: &str,
        content: &str,
        image_uri: Option<String>,
        reply_to_message_id: Option<String>,
    ) -> Result<ChatMessage> {
        let entry = self.entry_for(date)?;
        let now = now_millis();

        let mut msg = ChatMessage::new(role, content, now);
        msg.image_uri = image_uri;
        msg.reply_to_message_id = reply_to_message_id;

        queries::insert_message(&self.conn, &entry.date_key(), &msg)?;
        queries::touch_entry(&self.conn, &entry.date_key(), now)?;
        Ok(msg)
    }

    /// Replace a message's content and bump its timestamp, so a later sync
    /// treats the edit as the newest copy.
    pub fn edit_message(&self, message_id: &str, content: &str) -> Result<bool> {
        let now = now_millis();
        let changed = queries::update_message_content(&self.conn, message_id, content, now)?;
        if changed {
            if let Some(key) = queries::message_entry_key(&self.conn, message_id)? {
                queries::touch_entry(&self.conn, &key, now)?;
            }
        }
        Ok(changed)
    }

    /// Delete a message and its attached image file, if any.
    pub fn delete_message(&self, message_id: &str) -> Result<bool> {
        let key = match queries::message_entry_key(&self.conn, message_id)? {
            Some(key) => key,
            None => return Ok(false),
        };

        if let Some(uri) = queries::delete_message(&self.conn, message_id)? {
            let path = self.image_path(&uri);
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("could not remove image {}: {}", path.display(), e);
                }
            }
        }
        queries::touch_entry(&self.conn, &key, now_millis())?;
        Ok(true)
    }

    fn image_path(&self, uri: &str) -> PathBuf {
        let trimmed = uri.strip_prefix("file://").unwrap_or(uri);
        let path = Path::new(trimmed);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir
                .join(&self.settings.storage.image_dir)
                .join(path)
        }
    }

    // ─── Quick notes ───

    pub fn add_note(&self, content: &str, tags: Vec<String>) -> Result<QuickNote> {
        let note = QuickNote::new(content, tags, now_millis());
        queries::insert_note(&self.conn, &note)?;
        Ok(note)
    }

    pub fn notes(&self, limit: Option<i64>) -> Result<Vec<QuickNote>> {
        queries::list_notes(&self.conn, limit)
    }

    pub fn update_note(&self, note_id: &str, content: &str, tags: &[String]) -> Result<bool> {
        queries::update_note(&self.conn, note_id, content, tags, now_millis())
    }

    pub fn delete_note(&self, note_id: &str) -> Result<()> {
        queries::delete_note(&self.conn, note_id)
    }

    // ─── Tasks ───

    pub fn add_task(&self, title: &str, tags: Vec<String>) -> Result<Task> {
        let task = Task::new(title, tags, now_millis());
        queries::insert_task(&self.conn, &task)?;
        Ok(task)
    }

    pub fn tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        queries::list_tasks(&self.conn, status)
    }

    pub fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<bool> {
        queries::set_task_status(&self.conn, task_id, status, now_millis())
    }

    pub fn complete_task(&self, task_id: &str) -> Result<bool> {
        self.set_task_status(task_id, TaskStatus::Done)
    }

    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        queries::delete_task(&self.conn, task_id)
    }

    // ─── Habits ───

    pub fn add_habit(&self, name: &str) -> Result<Habit> {
        let habit = Habit::new(name, now_millis());
        queries::insert_habit(&self.conn, &habit)?;
        Ok(habit)
    }

    pub fn habits(&self, include_archived: bool) -> Result<Vec<Habit>> {
        queries::list_habits(&self.conn, include_archived)
    }

    pub fn archive_habit(&self, habit_id: &str) -> Result<bool> {
        queries::set_habit_archived(&self.conn, habit_id, true)
    }

    pub fn check_habit(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        queries::check_habit(&self.conn, habit_id, date, now_millis())
    }

    pub fn uncheck_habit(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        queries::uncheck_habit(&self.conn, habit_id, date)
    }

    /// Habit check-ins run through the same streak computation as journal
    /// entries.
    pub fn habit_streak(&self, habit_id: &str, today: NaiveDate) -> Result<StreakSummary> {
        let dates = queries::habit_check_dates(&self.conn, habit_id)?;
        Ok(StreakSummary {
            current: stats_engine::current_streak(&dates, today),
            longest: stats_engine::longest_streak(&dates),
        })
    }

    // ─── Stats ───

    pub fn stats(&self, today: NaiveDate) -> Result<JournalStats> {
        let dates = queries::entry_dates(&self.conn)?;
        Ok(JournalStats {
            total_entries: queries::count_entries(&self.conn)?,
            current_streak: stats_engine::current_streak(&dates, today),
            longest_streak: stats_engine::longest_streak(&dates),
            entries_this_month: stats_engine::entries_in_month(&dates, today),
        })
    }

    pub fn monthly_counts(&self) -> Result<BTreeMap<String, u32>> {
        let dates = queries::entry_dates(&self.conn)?;
        Ok(stats_engine::monthly_counts(&dates))
    }

    // ─── Sync ───

    pub async fn sync_entry<R: RemoteSource>(
        &self,
        remote: &R,
        date: NaiveDate,
    ) -> Result<Option<JournalEntry>> {
        sync_engine::sync_entry(&self.conn, remote, date).await
    }

    pub async fn sync_today<R: RemoteSource>(&self, remote: &R) -> Result<Option<JournalEntry>> {
        self.sync_entry(remote, Local::now().date_naive()).await
    }

    // ─── Export / import ───

    pub fn export_markdown(&self) -> Result<PathBuf> {
        let export_root = self.data_dir.join(&self.settings.storage.export_dir);
        export::export_entries(&self.conn, &export_root)
    }

    /// Parse a markdown document and upsert it as that day's entry.
    pub fn import_markdown(&self, text: &str) -> Result<JournalEntry> {
        let entry = export::entry_from_markdown(text)?;
        queries::upsert_entry(&self.conn, &entry)?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_USER;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_journal() -> (tempfile::TempDir, Journal) {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path(), Settings::default()).unwrap();
        (dir, journal)
    }

    #[test]
    fn entry_is_created_lazily_and_persisted() {
        let (_dir, journal) = open_journal();
        let day = date(2026, 8, 1);

        let first = journal.entry_for(day).unwrap();
        let second = journal.entry_for(day).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(journal.stats(day).unwrap().total_entries, 1);
    }

    #[test]
    fn message_lifecycle() {
        let (_dir, journal) = open_journal();
        let day = date(2026, 8, 1);

        let sent = journal
            .send_message(day, ROLE_USER, "first draft", None, None)
            .unwrap();
        let reply = journal
            .send_message(day, ROLE_USER, "follow-up", None, Some(sent.id.clone()))
            .unwrap();

        assert!(journal.edit_message(&sent.id, "final wording").unwrap());
        let entry = journal.entry_for(day).unwrap();
        assert_eq!(entry.messages.len(), 2);
        let edited = entry.messages.iter().find(|m| m.id == sent.id).unwrap();
        assert_eq!(edited.content, "final wording");
        assert!(edited.timestamp >= sent.timestamp);
        let threaded = entry.messages.iter().find(|m| m.id == reply.id).unwrap();
        assert_eq!(threaded.reply_to_message_id.as_deref(), Some(sent.id.as_str()));

        assert!(journal.delete_message(&reply.id).unwrap());
        assert!(!journal.delete_message(&reply.id).unwrap());
        assert_eq!(journal.entry_for(day).unwrap().messages.len(), 1);
    }

    #[test]
    fn delete_message_removes_the_image_file() {
        let (dir, journal) = open_journal();
        let day = date(2026, 8, 2);

        let image_dir = dir.path().join("images");
        fs::create_dir_all(&image_dir).unwrap();
        let image = image_dir.join("sketch.png");
        fs::write(&image, b"png").unwrap();

        let msg = journal
            .send_message(day, "user", "", Some("sketch.png".to_string()), None)
            .unwrap();
        assert!(journal.delete_message(&msg.id).unwrap());
        assert!(!image.exists());
    }

    #[test]
    fn mood_and_tags_round_through_storage() {
        let (_dir, journal) = open_journal();
        let day = date(2026, 8, 3);

        journal.set_mood(day, Some("calm".to_string())).unwrap();
        journal.add_tag(day, "#garden").unwrap();
        journal.add_tag(day, "#garden").unwrap();

        let entry = journal.entry_for(day).unwrap();
        assert_eq!(entry.mood.as_deref(), Some("calm"));
        assert_eq!(
            entry.tags,
            vec!["#mood-calm".to_string(), "#garden".to_string()]
        );

        journal.remove_tag(day, "#garden").unwrap();
        assert_eq!(journal.entry_for(day).unwrap().tags, vec!["#mood-calm".to_string()]);
    }

    #[test]
    fn stats_cover_stored_entries() {
        let (_dir, journal) = open_journal();
        let today = date(2026, 8, 10);

        for day in [today, date(2026, 8, 9), date(2026, 8, 8), date(2026, 8, 1)] {
            journal.entry_for(day).unwrap();
        }

        let stats = journal.stats(today).unwrap();
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.entries_this_month, 4);
        assert_eq!(journal.monthly_counts().unwrap().get("2026-08"), Some(&4));
    }

    #[test]
    fn habit_streak_tracks_check_ins() {
        let (_dir, journal) = open_journal();
        let today = date(2026, 8, 10);

        let habit = journal.add_habit("morning pages").unwrap();
        for day in [today, date(2026, 8, 9), date(2026, 8, 5), date(2026, 8, 4)] {
            journal.check_habit(&habit.id, day).unwrap();
        }

        let streak = journal.habit_streak(&habit.id, today).unwrap();
        assert_eq!(streak.current, 2);
        assert_eq!(streak.longest, 2);
    }

    #[test]
    fn import_markdown_upserts_the_entry() {
        let (_dir, journal) = open_journal();
        let day = date(2026, 8, 4);

        let mut entry = journal.entry_for(day).unwrap();
        entry.set_mood(Some("rested".to_string()));
        entry
            .messages
            .push(ChatMessage::new("user", "slept in", 1_700_000_000_000));

        let imported = journal
            .import_markdown(&crate::services::export::entry_to_markdown(&entry))
            .unwrap();
        assert_eq!(imported, entry);
        assert_eq!(journal.entry_for(day).unwrap(), entry);
        assert_eq!(journal.stats(day).unwrap().total_entries, 1);
    }
}
