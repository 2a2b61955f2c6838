//! The manifest: the remote "list of token lists".
//!
//! Resolution never fails. Network, schema and parse problems degrade to the
//! cached manifest, and with nothing cached to an empty one.

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use crate::config::ValidatedConfig;
use crate::schema::{SchemaValidator, MANIFEST_SCHEMA};
use crate::stores::Content;
use crate::types::Version;

/// Content store ID reserved for the manifest itself.
pub const MANIFEST_ID: &str = "__manifest__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub timestamp: String,
    pub version: Version,
    pub token_lists: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub source_url: String,
    /// URL of a JSON schema the list body must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl Manifest {
    /// Schema-validates and parses a manifest document. Repeated IDs keep
    /// their first occurrence.
    pub fn decode(raw: &[u8], validator: &dyn SchemaValidator) -> anyhow::Result<Self> {
        validator.validate(raw, MANIFEST_SCHEMA.as_bytes())?;
        let mut manifest: Manifest = serde_json::from_slice(raw)?;
        let mut seen = HashSet::new();
        manifest.token_lists.retain(|entry| seen.insert(entry.id.clone()));
        Ok(manifest)
    }
}

fn load_cached(config: &ValidatedConfig) -> Option<(Manifest, Content)> {
    let content = match config.content_store.get(MANIFEST_ID) {
        Ok(Some(content)) => content,
        Ok(None) => return None,
        Err(e) => {
            warn!("Manifest: failed to read cached manifest: {}", e);
            return None;
        }
    };
    match Manifest::decode(&content.data, config.schema_validator.as_ref()) {
        Ok(manifest) => Some((manifest, content)),
        Err(e) => {
            warn!("Manifest: ignoring unusable cached manifest: {}", e);
            None
        }
    }
}

/// Best available manifest: freshly fetched when possible, else cached.
pub async fn resolve_manifest(config: &ValidatedConfig, cancel: &CancellationToken) -> Manifest {
    let cached = load_cached(config);

    let Some(url) = config.manifest_url() else {
        return cached.map(|(m, _)| m).unwrap_or_default();
    };

    // An etag only means something for the URL it was issued by.
    let etag = cached
        .as_ref()
        .filter(|(_, content)| content.source_url == url)
        .map(|(_, content)| content.etag.clone())
        .unwrap_or_default();
    let fallback = cached.map(|(m, _)| m).unwrap_or_default();

    let response = match config.fetcher.fetch(url, &etag, cancel).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Manifest: fetch from {} failed, using cache: {}", url, e);
            return fallback;
        }
    };

    let Some(body) = response.body else {
        debug!("Manifest: {} not modified", url);
        return fallback;
    };

    let manifest = match Manifest::decode(&body, config.schema_validator.as_ref()) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Manifest: invalid manifest from {}, using cache: {}", url, e);
            return fallback;
        }
    };

    let content = Content {
        source_url: url.to_string(),
        etag: response.etag,
        data: body,
        fetched_at: Utc::now(),
    };
    if let Err(e) = config.content_store.set(MANIFEST_ID, content) {
        warn!("Manifest: failed to persist manifest: {}", e);
    }

    info!(
        "Manifest: resolved {} token lists (version {})",
        manifest.token_lists.len(),
        manifest.version
    );
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructuralValidator;

    #[test]
    fn test_decode_deduplicates_ids() {
        let raw = br#"{
            "timestamp": "2024-01-01T00:00:00Z",
            "version": {"major": 2, "minor": 1, "patch": 0},
            "tokenLists": [
                {"id": "uniswap", "sourceUrl": "https://a.example/uniswap.json"},
                {"id": "aave", "sourceUrl": "https://a.example/aave.json", "schema": "https://a.example/schema.json"},
                {"id": "uniswap", "sourceUrl": "https://b.example/uniswap.json"}
            ]
        }"#;
        let manifest = Manifest::decode(raw, &StructuralValidator).unwrap();
        assert_eq!(manifest.token_lists.len(), 2);
        assert_eq!(manifest.token_lists[0].source_url, "https://a.example/uniswap.json");
        assert_eq!(
            manifest.token_lists[1].schema.as_deref(),
            Some("https://a.example/schema.json")
        );
    }

    #[test]
    fn test_decode_rejects_schema_violations() {
        let raw = br#"{"timestamp": "t", "version": {"major": 1, "minor": 0, "patch": 0}, "tokenLists": [{"sourceUrl": "x"}]}"#;
        assert!(Manifest::decode(raw, &StructuralValidator).is_err());
    }
}
