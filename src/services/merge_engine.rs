use std::collections::HashMap;

use crate::models::{ChatMessage, JournalEntry};

/// Reconcile the locally stored entry for a day with the remote copy of the
/// same day.
///
/// The local entry is the base when present: its tags, mood and date are
/// kept verbatim. The remote id becomes the entry id either way, so the
/// server-assigned identifier is canonical from then on. Messages from both
/// sides are deduplicated by id with the newest timestamp winning; on an
/// exact timestamp tie the remote copy wins. The result is ordered by
/// timestamp ascending.
///
/// Pure function: persistence is the caller's job.
pub fn merge_entries(local: Option<JournalEntry>, remote: JournalEntry) -> JournalEntry {
    let JournalEntry {
        id: remote_id,
        date_millis: remote_date_millis,
        messages: remote_messages,
        tags: remote_tags,
        mood: remote_mood,
    } = remote;

    let (mut merged, local_messages) = match local {
        Some(mut local) => {
            local.id = remote_id;
            let messages = std::mem::take(&mut local.messages);
            (local, messages)
        }
        None => (
            JournalEntry {
                id: remote_id,
                date_millis: remote_date_millis,
                messages: Vec::new(),
                tags: remote_tags,
                mood: remote_mood,
            },
            Vec::new(),
        ),
    };

    merged.messages = dedup_latest(local_messages.into_iter().chain(remote_messages));
    merged
}

/// Collapse messages sharing an id down to the single copy with the highest
/// timestamp. A later duplicate replaces an earlier one on equal timestamps,
/// so feeding the remote side last makes it the tie-break winner. Messages
/// without an id never collide: each gets its own synthetic key.
fn dedup_latest(messages: impl IntoIterator<Item = ChatMessage>) -> Vec<ChatMessage> {
    let mut by_id: HashMap<String, ChatMessage> = HashMap::new();

    for (i, msg) in messages.into_iter().enumerate() {
        let key = if msg.id.is_empty() {
            format!("missing-id:{}", i)
        } else {
            msg.id.clone()
        };
        match by_id.get(&key) {
            Some(existing) if existing.timestamp > msg.timestamp => {}
            _ => {
                by_id.insert(key, msg);
            }
        }
    }

    let mut out: Vec<ChatMessage> = by_id.into_values().collect();
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    fn msg(id: &str, content: &str, timestamp: i64) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            role: "user".to_string(),
            content: content.to_string(),
            timestamp,
            image_uri: None,
            reply_to_message_id: None,
        }
    }

    fn entry(id: &str, messages: Vec<ChatMessage>) -> JournalEntry {
        let mut e = JournalEntry::new_for_date(day());
        e.id = id.to_string();
        e.messages = messages;
        e
    }

    #[test]
    fn absent_local_adopts_remote() {
        let mut remote = entry("srv-1", vec![msg("a", "hello", 100)]);
        remote.set_mood(Some("calm".to_string()));

        let merged = merge_entries(None, remote.clone());
        assert_eq!(merged.id, "srv-1");
        assert_eq!(merged.mood, remote.mood);
        assert_eq!(merged.tags, remote.tags);
        assert_eq!(merged.messages, remote.messages);
    }

    #[test]
    fn local_fields_win_remote_id_becomes_canonical() {
        let mut local = entry("loc-1", vec![]);
        local.set_mood(Some("tired".to_string()));
        local.tags.push("#travel".to_string());

        let mut remote = entry("srv-1", vec![]);
        remote.set_mood(Some("great".to_string()));

        let merged = merge_entries(Some(local.clone()), remote);
        assert_eq!(merged.id, "srv-1");
        assert_eq!(merged.mood, local.mood);
        assert_eq!(merged.tags, local.tags);
        assert_eq!(merged.date_millis, local.date_millis);
    }

    #[test]
    fn union_of_unique_ids_is_preserved() {
        let local = entry("loc", vec![msg("a", "only local", 100), msg("b", "shared", 200)]);
        let remote = entry("srv", vec![msg("b", "shared", 200), msg("c", "only remote", 300)]);

        let merged = merge_entries(Some(local), remote);
        let mut ids: Vec<_> = merged.messages.iter().map(|m| m.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn latest_edit_wins() {
        let local = entry("loc", vec![msg("a", "stale local", 100)]);
        let remote = entry("srv", vec![msg("a", "newer remote edit", 900)]);
        let merged = merge_entries(Some(local), remote);
        assert_eq!(merged.messages.len(), 1);
        assert_eq!(merged.messages[0].content, "newer remote edit");

        let local = entry("loc", vec![msg("a", "newer local edit", 900)]);
        let remote = entry("srv", vec![msg("a", "stale remote", 100)]);
        let merged = merge_entries(Some(local), remote);
        assert_eq!(merged.messages.len(), 1);
        assert_eq!(merged.messages[0].content, "newer local edit");
    }

    #[test]
    fn equal_timestamps_prefer_the_remote_copy() {
        let local = entry("loc", vec![msg("a", "local copy", 500)]);
        let remote = entry("srv", vec![msg("a", "remote copy", 500)]);
        let merged = merge_entries(Some(local), remote);
        assert_eq!(merged.messages.len(), 1);
        assert_eq!(merged.messages[0].content, "remote copy");
    }

    #[test]
    fn output_is_sorted_by_timestamp() {
        let local = entry("loc", vec![msg("c", "late", 900), msg("a", "early", 100)]);
        let remote = entry("srv", vec![msg("b", "middle", 500)]);

        let merged = merge_entries(Some(local), remote);
        let timestamps: Vec<_> = merged.messages.iter().map(|m| m.timestamp).collect();
        assert_eq!(timestamps, vec![100, 500, 900]);
    }

    #[test]
    fn remerging_the_same_snapshot_is_idempotent() {
        let local = entry("loc", vec![msg("a", "local", 100), msg("b", "old", 200)]);
        let remote = entry("srv", vec![msg("b", "edited", 400), msg("c", "remote", 300)]);

        let once = merge_entries(Some(local), remote.clone());
        let twice = merge_entries(Some(once.clone()), remote);
        assert_eq!(once, twice);
    }

    #[test]
    fn blank_ids_never_collide() {
        let local = entry("loc", vec![msg("", "first orphan", 100)]);
        let remote = entry("srv", vec![msg("", "second orphan", 100)]);

        let merged = merge_entries(Some(local), remote);
        assert_eq!(merged.messages.len(), 2);
    }
}
