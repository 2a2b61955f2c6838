//! Status-style token lists: one record fans out over a `{chainId: address}` map.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::{ListEnvelope, Parser};
use crate::errors::ParseError;
use crate::types::{parse_address, ChainId, Token, TokenList};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusToken {
    #[serde(default)]
    cross_chain_id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    decimals: u32,
    #[serde(default, rename = "logoURI")]
    logo_uri: String,
    #[serde(default)]
    contracts: HashMap<String, String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusTokenListParser;

impl Parser for StatusTokenListParser {
    fn parse(
        &self,
        raw: &[u8],
        source_url: &str,
        fetched_at: Option<DateTime<Utc>>,
        supported_chains: &[ChainId],
    ) -> Result<TokenList, ParseError> {
        let envelope: ListEnvelope<StatusToken> = serde_json::from_slice(raw)?;
        let (mut list, raw_tokens) = envelope.into_token_list(source_url, fetched_at);

        for t in raw_tokens {
            let Ok(decimals) = u8::try_from(t.decimals) else {
                debug!("StatusParser: dropping {} with decimals {}", t.symbol, t.decimals);
                continue;
            };
            // Chain order inside one record is kept stable for deterministic merges.
            let contracts: BTreeMap<ChainId, &String> = t
                .contracts
                .iter()
                .filter_map(|(chain, addr)| chain.parse::<ChainId>().ok().map(|c| (c, addr)))
                .collect();

            for (chain_id, addr) in contracts {
                if !supported_chains.contains(&chain_id) {
                    continue;
                }
                let Some(address) = parse_address(addr) else {
                    debug!("StatusParser: dropping {} on chain {}: bad address {}", t.symbol, chain_id, addr);
                    continue;
                };
                list.tokens.push(Token {
                    cross_chain_id: t.cross_chain_id.clone(),
                    chain_id,
                    address,
                    decimals,
                    name: t.name.clone(),
                    symbol: t.symbol.clone(),
                    logo_uri: t.logo_uri.clone(),
                    custom_token: false,
                });
            }
        }

        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LIST: &str = r#"{
        "name": "Status Token List",
        "timestamp": "2024-02-01T00:00:00Z",
        "version": {"major": 1, "minor": 0, "patch": 3},
        "tokens": [
            {
                "crossChainId": "usd-coin",
                "symbol": "USDC",
                "name": "USD Coin",
                "decimals": 6,
                "contracts": {
                    "1": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
                    "10": "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85",
                    "42161": "0xaf88d065e77c8cC2239327C5EDb3A432268e5831",
                    "nope": "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_fans_out_contracts() {
        let fetched = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let list = StatusTokenListParser
            .parse(LIST.as_bytes(), "https://example.org/status.json", Some(fetched), &[1, 42161])
            .unwrap();

        assert_eq!(list.tokens.len(), 2);
        assert!(list.tokens.iter().all(|t| t.cross_chain_id == "usd-coin"));
        assert_eq!(list.tokens[0].chain_id, 1);
        assert_eq!(list.tokens[1].chain_id, 42161);
        assert_eq!(list.fetched_timestamp, "2024-06-01T12:00:00Z");
        assert_eq!(list.timestamp, "2024-02-01T00:00:00Z");
    }
}
