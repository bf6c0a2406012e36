use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::Connection;

use crate::database::queries;
use crate::models::{JournalEntry, SyncSettings};
use crate::services::merge_engine;
use crate::utils::config;

/// Remote copy of the journal, one entry per calendar day.
pub trait RemoteSource {
    fn fetch_entry(&self, date: NaiveDate) -> impl Future<Output = Result<JournalEntry>> + Send;
}

/// Talks to the sync endpoint over HTTP with a bearer token.
pub struct HttpRemote {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl HttpRemote {
    pub fn new(settings: &SyncSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_token: config::resolve_sync_token(&settings.api_token),
        }
    }
}

impl RemoteSource for HttpRemote {
    async fn fetch_entry(&self, date: NaiveDate) -> Result<JournalEntry> {
        let url = format!("{}/entries/{}", self.endpoint, date.format("%Y-%m-%d"));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .context("sync request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("sync endpoint returned {}", response.status());
        }

        response
            .json::<JournalEntry>()
            .await
            .context("malformed sync payload")
    }
}

/// Reconcile `date`'s entry with the remote copy and persist the result.
///
/// A failed fetch degrades to the local entry: nothing is merged, nothing
/// is persisted, and `None` comes back. Persistence errors after a
/// successful fetch still propagate.
pub async fn sync_entry<R: RemoteSource>(
    conn: &Connection,
    remote: &R,
    date: NaiveDate,
) -> Result<Option<JournalEntry>> {
    let fetched = match remote.fetch_entry(date).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!("sync fetch for {} failed, keeping local entry: {:#}", date, e);
            return Ok(None);
        }
    };

    let local = queries::get_entry(conn, date)?;
    let merged = merge_engine::merge_entries(local, fetched);
    queries::upsert_entry(conn, &merged)?;

    info!(
        "synced entry {} for {} ({} messages)",
        merged.id,
        date,
        merged.messages.len()
    );
    Ok(Some(merged))
}
