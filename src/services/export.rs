//! Markdown export/import for journal entries.
//!
//! One document per entry: a `# YYYY-MM-DD` heading, an identity comment,
//! mood/tag bullets, then one `###` block per message. The format round
//! trips: ids, timestamps, roles, bodies, tags and mood all survive an
//! export followed by an import.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use log::info;
use regex::Regex;
use thiserror::Error;

use crate::database::queries;
use crate::models::{local_midnight_millis, ChatMessage, JournalEntry};
use rusqlite::Connection;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing `# YYYY-MM-DD` date heading")]
    MissingHeading,
    #[error("unrecognized date in heading: {0}")]
    BadDate(String),
    #[error("malformed message header at line {0}")]
    BadMessageHeader(usize),
}

pub fn entry_to_markdown(entry: &JournalEntry) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", entry.date_key()));
    out.push_str(&format!(
        "<!-- entry id={} date_millis={} -->\n\n",
        entry.id, entry.date_millis
    ));

    if let Some(mood) = &entry.mood {
        out.push_str(&format!("- mood: {}\n", mood));
    }
    if !entry.tags.is_empty() {
        out.push_str(&format!("- tags: {}\n", entry.tags.join(" ")));
    }
    if entry.mood.is_some() || !entry.tags.is_empty() {
        out.push('\n');
    }

    out.push_str("## Conversation\n");
    for msg in &entry.messages {
        out.push('\n');
        let mut header = format!("### {} @{} id={}", msg.role, msg.timestamp, msg.id);
        if let Some(reply) = &msg.reply_to_message_id {
            header.push_str(&format!(" reply={}", reply));
        }
        if let Some(image) = &msg.image_uri {
            header.push_str(&format!(" image={}", image));
        }
        out.push_str(&header);
        out.push('\n');
        if !msg.content.is_empty() {
            out.push_str(&msg.content);
            out.push('\n');
        }
    }
    out
}

// TODO: escape message bodies that themselves contain `### ` heading lines;
// until then such a body splits into two messages on import.
pub fn entry_from_markdown(text: &str) -> Result<JournalEntry, ImportError> {
    let id_comment = Regex::new(r"^<!-- entry id=(\S+) date_millis=(-?\d+) -->$")
        .expect("static regex");
    let msg_header = Regex::new(r"^### (\S+) @(-?\d+) id=(\S+)(?: reply=(\S+))?(?: image=(.*))?$")
        .expect("static regex");

    let mut date: Option<NaiveDate> = None;
    let mut entry_id: Option<String> = None;
    let mut date_millis: Option<i64> = None;
    let mut mood: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut messages: Vec<ChatMessage> = Vec::new();
    let mut content_lines: Vec<String> = Vec::new();
    let mut in_conversation = false;

    let mut flush = |messages: &mut Vec<ChatMessage>, lines: &mut Vec<String>| {
        if let Some(msg) = messages.last_mut() {
            while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
                lines.pop();
            }
            msg.content = lines.join("\n");
        }
        lines.clear();
    };

    for (lineno, line) in text.lines().enumerate() {
        if date.is_none() {
            if let Some(rest) = line.strip_prefix("# ") {
                let parsed = NaiveDate::parse_from_str(rest.trim(), "%Y-%m-%d")
                    .map_err(|_| ImportError::BadDate(rest.trim().to_string()))?;
                date = Some(parsed);
                continue;
            }
            if !line.trim().is_empty() {
                return Err(ImportError::MissingHeading);
            }
            continue;
        }

        if !in_conversation {
            if let Some(caps) = id_comment.captures(line) {
                entry_id = Some(caps[1].to_string());
                date_millis = caps[2].parse().ok();
            } else if let Some(rest) = line.strip_prefix("- mood: ") {
                mood = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("- tags: ") {
                tags = rest.split_whitespace().map(str::to_string).collect();
            } else if line.trim() == "## Conversation" || line.starts_with("### ") {
                in_conversation = true;
            } else {
                continue;
            }
            if !line.starts_with("### ") {
                continue;
            }
        }

        if line.starts_with("### ") {
            let caps = msg_header
                .captures(line)
                .ok_or(ImportError::BadMessageHeader(lineno + 1))?;
            flush(&mut messages, &mut content_lines);
            messages.push(ChatMessage {
                id: caps[3].to_string(),
                role: caps[1].to_string(),
                content: String::new(),
                timestamp: caps[2].parse().unwrap_or(0),
                image_uri: caps.get(5).map(|m| m.as_str().to_string()),
                reply_to_message_id: caps.get(4).map(|m| m.as_str().to_string()),
            });
        } else if !messages.is_empty() {
            content_lines.push(line.to_string());
        }
    }
    flush(&mut messages, &mut content_lines);

    let date = date.ok_or(ImportError::MissingHeading)?;
    Ok(JournalEntry {
        id: entry_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        date_millis: date_millis.unwrap_or_else(|| local_midnight_millis(date)),
        messages,
        tags,
        mood,
    })
}

/// Write every stored entry as one markdown file into a fresh timestamped
/// directory under `export_root`. Returns the directory created.
pub fn export_entries(conn: &Connection, export_root: &Path) -> Result<PathBuf> {
    let dir = export_root.join(format!(
        "daybook_export_{}",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::create_dir_all(&dir)?;

    let mut written = 0;
    for date in queries::entry_dates(conn)? {
        if let Some(entry) = queries::get_entry(conn, date)? {
            let path = dir.join(format!("{}.md", entry.date_key()));
            fs::write(&path, entry_to_markdown(&entry))?;
            written += 1;
        }
    }

    info!("exported {} entries to {}", written, dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_test_database;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn sample_entry() -> JournalEntry {
        let mut entry = JournalEntry::new_for_date(day());
        entry.tags.push("#work".to_string());
        entry.set_mood(Some("Focused".to_string()));

        let mut first = ChatMessage::new("user", "Shipped the release.", 1_754_468_102_123);
        first.image_uri = Some("images/release-party.jpg".to_string());
        let mut second = ChatMessage::new(
            "user",
            "Retro notes:\n- cut scope earlier\n- demos helped",
            1_754_470_000_000,
        );
        second.reply_to_message_id = Some(first.id.clone());
        entry.messages.push(first);
        entry.messages.push(second);
        entry
    }

    #[test]
    fn round_trip_preserves_everything() {
        let entry = sample_entry();
        let markdown = entry_to_markdown(&entry);
        let parsed = entry_from_markdown(&markdown).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn round_trip_of_an_empty_entry() {
        let entry = JournalEntry::new_for_date(day());
        let parsed = entry_from_markdown(&entry_to_markdown(&entry)).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn heading_is_required() {
        assert!(matches!(
            entry_from_markdown("no heading here"),
            Err(ImportError::MissingHeading)
        ));
        assert!(matches!(
            entry_from_markdown("# not-a-date"),
            Err(ImportError::BadDate(_))
        ));
    }

    #[test]
    fn malformed_message_header_is_reported_with_its_line() {
        let text = "# 2026-08-06\n\n## Conversation\n\n### broken header\n";
        assert!(matches!(
            entry_from_markdown(text),
            Err(ImportError::BadMessageHeader(5))
        ));
    }

    #[test]
    fn export_entries_writes_one_file_per_entry() {
        let conn = open_test_database();
        let days = [day(), NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()];
        for d in days {
            queries::upsert_entry(&conn, &JournalEntry::new_for_date(d)).unwrap();
        }

        let root = tempfile::tempdir().unwrap();
        let dir = export_entries(&conn, root.path()).unwrap();

        let mut files: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["2026-08-06.md", "2026-08-07.md"]);
    }
}
