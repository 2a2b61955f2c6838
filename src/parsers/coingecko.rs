//! CoinGecko "all tokens" dump: a bare array fanning out over `platforms`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::{format_timestamp, Parser};
use crate::chains::DEFAULT_PLATFORM_CHAINS;
use crate::errors::ParseError;
use crate::types::{parse_address, ChainId, Token, TokenList};

pub const COINGECKO_LIST_NAME: &str = "CoinGecko All Tokens";

#[derive(Debug, Deserialize)]
struct CoinGeckoToken {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    platforms: BTreeMap<String, Option<String>>,
}

/// Maps CoinGecko platform names to chain IDs; unknown platforms are skipped.
#[derive(Debug, Clone)]
pub struct CoinGeckoAllTokensParser {
    platform_chains: HashMap<String, ChainId>,
}

impl CoinGeckoAllTokensParser {
    pub fn new(platform_chains: HashMap<String, ChainId>) -> Self {
        Self { platform_chains }
    }
}

impl Default for CoinGeckoAllTokensParser {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_CHAINS.clone())
    }
}

impl Parser for CoinGeckoAllTokensParser {
    fn parse(
        &self,
        raw: &[u8],
        source_url: &str,
        fetched_at: Option<DateTime<Utc>>,
        supported_chains: &[ChainId],
    ) -> Result<TokenList, ParseError> {
        let records: Vec<CoinGeckoToken> = serde_json::from_slice(raw)?;
        let timestamp = fetched_at.map(format_timestamp).unwrap_or_default();

        let mut tokens = Vec::new();
        for record in records {
            for (platform, addr) in &record.platforms {
                let Some(&chain_id) = self.platform_chains.get(platform) else {
                    continue;
                };
                if !supported_chains.contains(&chain_id) {
                    continue;
                }
                let Some(address) = addr.as_deref().and_then(parse_address) else {
                    continue;
                };
                tokens.push(Token {
                    cross_chain_id: record.id.clone(),
                    chain_id,
                    address,
                    // Not provided by the source.
                    decimals: 0,
                    name: record.name.clone(),
                    symbol: record.symbol.to_uppercase(),
                    logo_uri: String::new(),
                    custom_token: false,
                });
            }
        }

        Ok(TokenList {
            name: COINGECKO_LIST_NAME.to_string(),
            fetched_timestamp: timestamp.clone(),
            timestamp,
            source: source_url.to_string(),
            tokens,
            ..Default::default()
        })
    }
}
