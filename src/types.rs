use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::chains;

pub type ChainId = u64;

/// Source marker for lists that never came from the network.
pub const LOCAL_SOURCE: &str = "local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Token metadata for a single chain.
///
/// Identity inside a snapshot is the [`Token::key`]; `cross_chain_id` groups the
/// same asset across chains and is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(default)]
    pub cross_chain_id: String,
    pub chain_id: ChainId,
    pub address: Address,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: String,
    #[serde(default)]
    pub custom_token: bool,
}

impl Token {
    pub fn key(&self) -> String {
        token_key(self.chain_id, &self.address)
    }

    /// Zero address carrying the chain family's native symbol.
    pub fn is_native(&self) -> bool {
        self.address == Address::zero()
            && self
                .symbol
                .eq_ignore_ascii_case(chains::native_symbol(self.chain_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenList {
    pub name: String,
    /// Producer-declared timestamp, kept verbatim.
    pub timestamp: String,
    /// When the list was actually fetched; the producer timestamp if it never was.
    pub fetched_timestamp: String,
    /// [`LOCAL_SOURCE`] or the URL the list was fetched from.
    pub source: String,
    pub version: Version,
    #[serde(default)]
    pub tags: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub tokens: Vec<Token>,
}

/// Lowercase `0x`-prefixed hex form of an address.
pub fn address_to_string(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_hex_address(s: &str) -> bool {
    let digits = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(d) => d,
        None => return false,
    };
    digits.len() == 40 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Strict address parsing: rejects anything [`is_hex_address`] rejects.
pub fn parse_address(s: &str) -> Option<Address> {
    if !is_hex_address(s) {
        return None;
    }
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(&s[2..], &mut bytes).ok()?;
    Some(Address::from(bytes))
}

pub fn token_key(chain_id: ChainId, address: &Address) -> String {
    format!("{}-{}", chain_id, address_to_string(address))
}

/// Inverse of [`token_key`].
pub fn parse_token_key(key: &str) -> Option<(ChainId, Address)> {
    let (chain, addr) = key.split_once('-')?;
    let chain_id = chain.parse::<ChainId>().ok()?;
    let address = parse_address(addr)?;
    Some((chain_id, address))
}
