//! Raw token list bytes to normalized [`TokenList`]s.
//!
//! Every parser drops tokens on unsupported chains or with malformed addresses
//! instead of failing; only a malformed document is an error.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::errors::ParseError;
use crate::types::{ChainId, TokenList, Version};

pub mod coingecko;
pub mod standard;
pub mod status;

pub use coingecko::CoinGeckoAllTokensParser;
pub use standard::StandardTokenListParser;
pub use status::StatusTokenListParser;

pub trait Parser: Send + Sync {
    /// `fetched_at` is `None` for bundled bytes that never went over the network.
    fn parse(
        &self,
        raw: &[u8],
        source_url: &str,
        fetched_at: Option<DateTime<Utc>>,
        supported_chains: &[ChainId],
    ) -> Result<TokenList, ParseError>;
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC3339 of the fetch time, else the producer's own timestamp.
pub(crate) fn fetched_timestamp(fetched_at: Option<DateTime<Utc>>, producer_timestamp: &str) -> String {
    match fetched_at {
        Some(ts) => format_timestamp(ts),
        None => producer_timestamp.to_string(),
    }
}

/// Envelope shared by the Standard and Status formats.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListEnvelope<T> {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub tags: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub tokens: Vec<T>,
}

impl<T> ListEnvelope<T> {
    pub fn into_token_list(
        self,
        source_url: &str,
        fetched_at: Option<DateTime<Utc>>,
    ) -> (TokenList, Vec<T>) {
        let list = TokenList {
            fetched_timestamp: fetched_timestamp(fetched_at, &self.timestamp),
            name: self.name,
            timestamp: self.timestamp,
            source: source_url.to_string(),
            version: self.version,
            tags: self.tags,
            logo_uri: self.logo_uri,
            keywords: self.keywords,
            tokens: Vec::new(),
        };
        (list, self.tokens)
    }
}
