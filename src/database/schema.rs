use anyhow::Result;
use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<()> {
    // Journal entries, one row per calendar day
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            date_key TEXT PRIMARY KEY,
            id TEXT NOT NULL,
            date_millis INTEGER NOT NULL,
            mood TEXT,
            tags BLOB,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Chat messages within an entry
    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            entry_date_key TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            image_uri TEXT,
            reply_to_message_id TEXT,
            FOREIGN KEY (entry_date_key) REFERENCES entries(date_key) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_entry_timestamp
         ON messages(entry_date_key, timestamp)",
        [],
    )?;

    // Quick notes
    conn.execute(
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            tags BLOB,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Tasks
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            notes TEXT,
            tags BLOB,
            status TEXT NOT NULL DEFAULT 'open',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            completed_at INTEGER
        )",
        [],
    )?;

    // Habits and their per-day check-ins
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            archived INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_checks (
            habit_id TEXT NOT NULL,
            date_key TEXT NOT NULL,
            checked_at INTEGER NOT NULL,
            UNIQUE(habit_id, date_key),
            FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(())
}
