//! Collaborator contracts consumed by the engine plus in-memory implementations.
//!
//! Real deployments back these with a database; the engine only assumes each
//! store is safe for concurrent use.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::types::ChainId;

/// Cached fetch artifact of one token list (or the manifest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub source_url: String,
    pub etag: String,
    pub data: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

/// A token added by the user. Fields are raw and validated before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomToken {
    pub chain_id: ChainId,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: String,
    #[serde(default)]
    pub cross_chain_id: String,
}

pub trait ContentStore: Send + Sync {
    /// Etag of the cached entry, `None` when nothing is cached.
    fn get_etag(&self, id: &str) -> Result<Option<String>>;
    fn get(&self, id: &str) -> Result<Option<Content>>;
    fn set(&self, id: &str, content: Content) -> Result<()>;
    fn get_all(&self) -> Result<HashMap<String, Content>>;
}

/// Unix seconds of the last completed refresh attempt, 0 when never.
pub trait LastRefreshTimeStore: Send + Sync {
    fn get(&self) -> Result<i64>;
    fn set(&self, unix_secs: i64) -> Result<()>;
}

pub trait CustomTokenStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<CustomToken>>;
}

pub trait PrivacyGuard: Send + Sync {
    fn is_privacy_on(&self) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: DashMap<String, Content>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn get_etag(&self, id: &str) -> Result<Option<String>> {
        Ok(self.entries.get(id).map(|e| e.etag.clone()))
    }

    fn get(&self, id: &str) -> Result<Option<Content>> {
        Ok(self.entries.get(id).map(|e| e.value().clone()))
    }

    fn set(&self, id: &str, content: Content) -> Result<()> {
        self.entries.insert(id.to_string(), content);
        Ok(())
    }

    fn get_all(&self) -> Result<HashMap<String, Content>> {
        Ok(self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryLastRefreshTimeStore {
    unix_secs: AtomicI64,
}

impl MemoryLastRefreshTimeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LastRefreshTimeStore for MemoryLastRefreshTimeStore {
    fn get(&self) -> Result<i64> {
        Ok(self.unix_secs.load(Ordering::Acquire))
    }

    fn set(&self, unix_secs: i64) -> Result<()> {
        self.unix_secs.store(unix_secs, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCustomTokenStore {
    tokens: DashMap<(ChainId, String), CustomToken>,
}

impl MemoryCustomTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the token at its chain and (lowercased) address.
    pub fn add(&self, token: CustomToken) {
        let key = (token.chain_id, token.address.to_lowercase());
        self.tokens.insert(key, token);
    }

    pub fn remove(&self, chain_id: ChainId, address: &str) -> Option<CustomToken> {
        self.tokens
            .remove(&(chain_id, address.to_lowercase()))
            .map(|(_, t)| t)
    }
}

impl CustomTokenStore for MemoryCustomTokenStore {
    fn get_all(&self) -> Result<Vec<CustomToken>> {
        let mut entries: Vec<((ChainId, String), CustomToken)> = self
            .tokens
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, t)| t).collect())
    }
}

/// Privacy switch toggled by the embedding application.
#[derive(Debug, Default)]
pub struct StaticPrivacyGuard {
    on: AtomicBool,
}

impl StaticPrivacyGuard {
    pub fn new(on: bool) -> Self {
        Self {
            on: AtomicBool::new(on),
        }
    }

    pub fn set(&self, on: bool) {
        self.on.store(on, Ordering::Release);
    }
}

impl PrivacyGuard for StaticPrivacyGuard {
    fn is_privacy_on(&self) -> Result<bool> {
        Ok(self.on.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_content_store() {
        let store = MemoryContentStore::new();
        assert_eq!(store.get_etag("uniswap").unwrap(), None);

        store
            .set(
                "uniswap",
                Content {
                    source_url: "https://example.org/uniswap.json".into(),
                    etag: "\"v1\"".into(),
                    data: b"{}".to_vec(),
                    fetched_at: Utc::now(),
                },
            )
            .unwrap();

        assert_eq!(store.get_etag("uniswap").unwrap().as_deref(), Some("\"v1\""));
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_token_store_sorted_and_deduplicated() {
        let store = MemoryCustomTokenStore::new();
        let token = |chain, address: &str, symbol: &str| CustomToken {
            chain_id: chain,
            address: address.into(),
            name: symbol.into(),
            symbol: symbol.into(),
            decimals: 18,
            logo_uri: String::new(),
            cross_chain_id: String::new(),
        };
        store.add(token(10, "0x00000000000000000000000000000000000000bb", "B"));
        store.add(token(1, "0x00000000000000000000000000000000000000AA", "A"));
        store.add(token(1, "0x00000000000000000000000000000000000000aa", "A2"));

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "A2");
        assert_eq!(all[1].chain_id, 10);
    }
}
