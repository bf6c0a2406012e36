use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::models::{now_millis, ChatMessage, Habit, JournalEntry, QuickNote, Task, TaskStatus};

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ─── Entries ───

pub fn get_entry(conn: &Connection, date: NaiveDate) -> Result<Option<JournalEntry>> {
    let key = date_key(date);

    let row: Result<(String, i64, Option<String>, Option<Vec<u8>>), _> = conn.query_row(
        "SELECT id, date_millis, mood, tags FROM entries WHERE date_key = ?1",
        [&key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    );

    let (id, date_millis, mood, tags_blob) = match row {
        Ok(r) => r,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let tags: Vec<String> = tags_blob
        .and_then(|b| serde_json::from_slice(&b).ok())
        .unwrap_or_default();

    Ok(Some(JournalEntry {
        id,
        date_millis,
        messages: get_messages(conn, &key)?,
        tags,
        mood,
    }))
}

fn get_messages(conn: &Connection, key: &str) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, role, content, timestamp, image_uri, reply_to_message_id
         FROM messages
         WHERE entry_date_key = ?1
         ORDER BY timestamp ASC, rowid ASC",
    )?;

    let messages = stmt
        .query_map([key], |row| {
            Ok(ChatMessage {
                id: row.get(0)?,
                role: row.get(1)?,
                content: row.get(2)?,
                timestamp: row.get(3)?,
                image_uri: row.get(4)?,
                reply_to_message_id: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(messages)
}

/// Insert-or-replace keyed on the entry's calendar date. The whole message
/// list is rewritten in the same transaction so a reread always sees the
/// persisted entry exactly as passed in.
pub fn upsert_entry(conn: &Connection, entry: &JournalEntry) -> Result<()> {
    let key = entry.date_key();
    let tags_blob = serde_json::to_vec(&entry.tags)?;
    let now = now_millis();

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO entries (date_key, id, date_millis, mood, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT(date_key) DO UPDATE SET
             id = excluded.id,
             date_millis = excluded.date_millis,
             mood = excluded.mood,
             tags = excluded.tags,
             updated_at = excluded.updated_at",
        rusqlite::params![key, entry.id, entry.date_millis, entry.mood, tags_blob, now],
    )?;

    tx.execute("DELETE FROM messages WHERE entry_date_key = ?1", [&key])?;
    for msg in &entry.messages {
        tx.execute(
            "INSERT INTO messages (id, entry_date_key, role, content, timestamp, image_uri, reply_to_message_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                msg.id,
                key,
                msg.role,
                msg.content,
                msg.timestamp,
                msg.image_uri,
                msg.reply_to_message_id,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// All dates that have an entry, for streak and monthly aggregation.
pub fn entry_dates(conn: &Connection) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT date_key FROM entries ORDER BY date_key ASC")?;

    let dates = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .filter_map(|key| NaiveDate::parse_from_str(&key, "%Y-%m-%d").ok())
        .collect();

    Ok(dates)
}

pub fn count_entries(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(count)
}

pub fn touch_entry(conn: &Connection, key: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE entries SET updated_at = ?1 WHERE date_key = ?2",
        rusqlite::params![now, key],
    )?;
    Ok(())
}

// ─── Messages ───

pub fn insert_message(conn: &Connection, key: &str, msg: &ChatMessage) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, entry_date_key, role, content, timestamp, image_uri, reply_to_message_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            msg.id,
            key,
            msg.role,
            msg.content,
            msg.timestamp,
            msg.image_uri,
            msg.reply_to_message_id,
        ],
    )?;
    Ok(())
}

pub fn update_message_content(
    conn: &Connection,
    message_id: &str,
    content: &str,
    timestamp: i64,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE messages SET content = ?1, timestamp = ?2 WHERE id = ?3",
        rusqlite::params![content, timestamp, message_id],
    )?;
    Ok(changed > 0)
}

/// Remove a message, returning its image uri (if any) so the caller can
/// clean the file up.
pub fn delete_message(conn: &Connection, message_id: &str) -> Result<Option<String>> {
    let image: Option<String> = match conn.query_row(
        "SELECT image_uri FROM messages WHERE id = ?1",
        [message_id],
        |row| row.get(0),
    ) {
        Ok(uri) => uri,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    conn.execute("DELETE FROM messages WHERE id = ?1", [message_id])?;
    Ok(image)
}

pub fn message_entry_key(conn: &Connection, message_id: &str) -> Result<Option<String>> {
    match conn.query_row(
        "SELECT entry_date_key FROM messages WHERE id = ?1",
        [message_id],
        |row| row.get(0),
    ) {
        Ok(key) => Ok(Some(key)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ─── Notes ───

pub fn insert_note(conn: &Connection, note: &QuickNote) -> Result<()> {
    let tags_blob = serde_json::to_vec(&note.tags)?;
    conn.execute(
        "INSERT INTO notes (id, content, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![note.id, note.content, tags_blob, note.created_at, note.updated_at],
    )?;
    Ok(())
}

pub fn list_notes(conn: &Connection, limit: Option<i64>) -> Result<Vec<QuickNote>> {
    let limit_clause = limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default();

    let mut stmt = conn.prepare(&format!(
        "SELECT id, content, tags, created_at, updated_at
         FROM notes
         ORDER BY updated_at DESC
         {}",
        limit_clause
    ))?;

    let notes = stmt
        .query_map([], |row| {
            let tags_blob: Option<Vec<u8>> = row.get(2)?;
            Ok(QuickNote {
                id: row.get(0)?,
                content: row.get(1)?,
                tags: tags_blob
                    .and_then(|b| serde_json::from_slice(&b).ok())
                    .unwrap_or_default(),
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(notes)
}

pub fn update_note(conn: &Connection, note_id: &str, content: &str, tags: &[String], now: i64) -> Result<bool> {
    let tags_blob = serde_json::to_vec(tags)?;
    let changed = conn.execute(
        "UPDATE notes SET content = ?1, tags = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![content, tags_blob, now, note_id],
    )?;
    Ok(changed > 0)
}

pub fn delete_note(conn: &Connection, note_id: &str) -> Result<()> {
    conn.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
    Ok(())
}

// ─── Tasks ───

pub fn insert_task(conn: &Connection, task: &Task) -> Result<()> {
    let tags_blob = serde_json::to_vec(&task.tags)?;
    conn.execute(
        "INSERT INTO tasks (id, title, notes, tags, status, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            task.id,
            task.title,
            task.notes,
            tags_blob,
            task.status.as_str(),
            task.created_at,
            task.updated_at,
            task.completed_at,
        ],
    )?;
    Ok(())
}

pub fn list_tasks(conn: &Connection, status: Option<TaskStatus>) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, notes, tags, status, created_at, updated_at, completed_at
         FROM tasks
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC",
    )?;

    let tasks = stmt
        .query_map([status.map(|s| s.as_str())], |row| {
            let tags_blob: Option<Vec<u8>> = row.get(3)?;
            let status_str: String = row.get(4)?;
            Ok(Task {
                id: row.get(0)?,
                title: row.get(1)?,
                notes: row.get(2)?,
                tags: tags_blob
                    .and_then(|b| serde_json::from_slice(&b).ok())
                    .unwrap_or_default(),
                status: TaskStatus::parse(&status_str),
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
                completed_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tasks)
}

pub fn set_task_status(conn: &Connection, task_id: &str, status: TaskStatus, now: i64) -> Result<bool> {
    let completed_at = if status == TaskStatus::Done { Some(now) } else { None };
    let changed = conn.execute(
        "UPDATE tasks SET status = ?1, updated_at = ?2, completed_at = ?3 WHERE id = ?4",
        rusqlite::params![status.as_str(), now, completed_at, task_id],
    )?;
    Ok(changed > 0)
}

pub fn delete_task(conn: &Connection, task_id: &str) -> Result<()> {
    conn.execute("DELETE FROM tasks WHERE id = ?1", [task_id])?;
    Ok(())
}

// ─── Habits ───

pub fn insert_habit(conn: &Connection, habit: &Habit) -> Result<()> {
    conn.execute(
        "INSERT INTO habits (id, name, created_at, archived)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![habit.id, habit.name, habit.created_at, habit.archived],
    )?;
    Ok(())
}

pub fn list_habits(conn: &Connection, include_archived: bool) -> Result<Vec<Habit>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, archived
         FROM habits
         WHERE (?1 OR archived = 0)
         ORDER BY created_at ASC",
    )?;

    let habits = stmt
        .query_map([include_archived], |row| {
            Ok(Habit {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                archived: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(habits)
}

pub fn set_habit_archived(conn: &Connection, habit_id: &str, archived: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE habits SET archived = ?1 WHERE id = ?2",
        rusqlite::params![archived, habit_id],
    )?;
    Ok(changed > 0)
}

/// Checking a habit twice on the same day is a no-op.
pub fn check_habit(conn: &Connection, habit_id: &str, date: NaiveDate, now: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO habit_checks (habit_id, date_key, checked_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![habit_id, date_key(date), now],
    )?;
    Ok(())
}

pub fn uncheck_habit(conn: &Connection, habit_id: &str, date: NaiveDate) -> Result<()> {
    conn.execute(
        "DELETE FROM habit_checks WHERE habit_id = ?1 AND date_key = ?2",
        rusqlite::params![habit_id, date_key(date)],
    )?;
    Ok(())
}

pub fn habit_check_dates(conn: &Connection, habit_id: &str) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT date_key FROM habit_checks WHERE habit_id = ?1 ORDER BY date_key ASC",
    )?;

    let dates = stmt
        .query_map([habit_id], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .filter_map(|key| NaiveDate::parse_from_str(&key, "%Y-%m-%d").ok())
        .collect();

    Ok(dates)
}
