//! Uniswap-style token lists: one record per chain and address.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

use super::{ListEnvelope, Parser};
use crate::errors::ParseError;
use crate::types::{parse_address, ChainId, Token, TokenList};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandardToken {
    chain_id: ChainId,
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    decimals: u32,
    #[serde(default, rename = "logoURI")]
    logo_uri: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardTokenListParser;

impl Parser for StandardTokenListParser {
    fn parse(
        &self,
        raw: &[u8],
        source_url: &str,
        fetched_at: Option<DateTime<Utc>>,
        supported_chains: &[ChainId],
    ) -> Result<TokenList, ParseError> {
        let envelope: ListEnvelope<StandardToken> = serde_json::from_slice(raw)?;
        let (mut list, raw_tokens) = envelope.into_token_list(source_url, fetched_at);

        for t in raw_tokens {
            if !supported_chains.contains(&t.chain_id) {
                continue;
            }
            let (Some(address), Ok(decimals)) = (parse_address(&t.address), u8::try_from(t.decimals)) else {
                debug!("StandardParser: dropping {} on chain {} from {}", t.address, t.chain_id, source_url);
                continue;
            };
            list.tokens.push(Token {
                cross_chain_id: String::new(),
                chain_id: t.chain_id,
                address,
                decimals,
                name: t.name,
                symbol: t.symbol,
                logo_uri: t.logo_uri,
                custom_token: false,
            });
        }

        Ok(list)
    }
}
