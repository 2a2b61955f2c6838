//! Concurrent fan-out fetch of every list announced by the manifest.
//!
//! One task per manifest entry. A failing entry is logged and dropped without
//! touching the others. Results are only persisted after every task has
//! finished, so the content store never sees a half-finished batch.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ValidatedConfig;
use crate::manifest::{Manifest, ManifestEntry};
use crate::stores::Content;

/// A list body that changed since the cached etag.
#[derive(Debug, Clone)]
pub struct FetchedList {
    pub id: String,
    pub source_url: String,
    pub etag: String,
    pub fetched_at: DateTime<Utc>,
    pub data: Vec<u8>,
}

/// Fetches every manifest entry concurrently and persists the changed ones.
/// Returns how many lists were stored.
pub async fn fetch_token_lists(
    config: Arc<ValidatedConfig>,
    manifest: &Manifest,
    cancel: &CancellationToken,
) -> usize {
    let start = Instant::now();
    let entries = &manifest.token_lists;
    if entries.is_empty() {
        debug!("ListFetcher: manifest has no token lists");
        return 0;
    }

    let (tx, mut rx) = mpsc::channel::<FetchedList>(entries.len());

    let tasks: Vec<_> = entries
        .iter()
        .cloned()
        .map(|entry| {
            let config = config.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match fetch_entry(&config, &entry, &cancel).await {
                    Ok(Some(fetched)) => {
                        // Capacity equals the number of entries, so this never waits.
                        if tx.send(fetched).await.is_err() {
                            warn!("ListFetcher: result channel closed before {} was collected", entry.id);
                        }
                    }
                    Ok(None) => debug!("ListFetcher: {} not modified", entry.id),
                    Err(e) => warn!("ListFetcher: dropping {} ({}): {}", entry.id, entry.source_url, e),
                }
            })
        })
        .collect();
    drop(tx);

    for result in join_all(tasks).await {
        if let Err(e) = result {
            warn!("ListFetcher: fetch task panicked: {}", e);
        }
    }

    let mut stored = 0usize;
    while let Some(fetched) = rx.recv().await {
        let id = fetched.id.clone();
        let content = Content {
            source_url: fetched.source_url,
            etag: fetched.etag,
            data: fetched.data,
            fetched_at: fetched.fetched_at,
        };
        match config.content_store.set(&id, content) {
            Ok(()) => stored += 1,
            Err(e) => warn!("ListFetcher: failed to store {}: {}", id, e),
        }
    }

    info!(
        "ListFetcher: stored {}/{} token lists in {:?}",
        stored,
        entries.len(),
        start.elapsed()
    );
    stored
}

async fn fetch_entry(
    config: &ValidatedConfig,
    entry: &ManifestEntry,
    cancel: &CancellationToken,
) -> Result<Option<FetchedList>> {
    let etag = match config.content_store.get_etag(&entry.id) {
        Ok(etag) => etag.unwrap_or_default(),
        Err(e) => {
            warn!("ListFetcher: no etag for {}: {}", entry.id, e);
            String::new()
        }
    };

    let response = config.fetcher.fetch(&entry.source_url, &etag, cancel).await?;
    let Some(body) = response.body else {
        return Ok(None);
    };

    if let Some(schema_url) = entry.schema.as_deref().filter(|s| !s.is_empty()) {
        let schema = config
            .fetcher
            .fetch(schema_url, "", cancel)
            .await?
            .body
            .ok_or_else(|| anyhow!("schema {} answered without a body", schema_url))?;
        config.schema_validator.validate(&body, &schema)?;
    }

    Ok(Some(FetchedList {
        id: entry.id.clone(),
        source_url: entry.source_url.clone(),
        etag: response.etag,
        fetched_at: Utc::now(),
        data: body,
    }))
}
