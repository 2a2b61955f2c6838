//! Chain families and the per-chain native asset.

use ethers::types::Address;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::types::{ChainId, Token};

pub const ETHEREUM_MAINNET: ChainId = 1;
pub const ETHEREUM_SEPOLIA: ChainId = 11155111;
pub const OPTIMISM_MAINNET: ChainId = 10;
pub const OPTIMISM_SEPOLIA: ChainId = 11155420;
pub const ARBITRUM_MAINNET: ChainId = 42161;
pub const ARBITRUM_SEPOLIA: ChainId = 421614;
pub const BASE_MAINNET: ChainId = 8453;
pub const BASE_SEPOLIA: ChainId = 84532;
pub const BSC_MAINNET: ChainId = 56;
pub const BSC_TESTNET: ChainId = 97;

pub const ETH_SYMBOL: &str = "ETH";
pub const BNB_SYMBOL: &str = "BNB";

pub fn is_bsc_family(chain_id: ChainId) -> bool {
    matches!(chain_id, BSC_MAINNET | BSC_TESTNET)
}

pub fn native_symbol(chain_id: ChainId) -> &'static str {
    if is_bsc_family(chain_id) {
        BNB_SYMBOL
    } else {
        ETH_SYMBOL
    }
}

/// Native asset of `chain_id`, synthesized without any list.
pub fn native_token(chain_id: ChainId) -> Token {
    let (name, symbol, cross_chain_id) = if is_bsc_family(chain_id) {
        ("BNB", BNB_SYMBOL, "bnb-native")
    } else {
        ("Ether", ETH_SYMBOL, "eth-native")
    };
    Token {
        cross_chain_id: cross_chain_id.to_string(),
        chain_id,
        address: Address::zero(),
        decimals: 18,
        name: name.to_string(),
        symbol: symbol.to_string(),
        logo_uri: String::new(),
        custom_token: false,
    }
}

/// CoinGecko `platforms` keys for the chains this crate knows about.
pub static DEFAULT_PLATFORM_CHAINS: Lazy<HashMap<String, ChainId>> = Lazy::new(|| {
    [
        ("ethereum", ETHEREUM_MAINNET),
        ("optimistic-ethereum", OPTIMISM_MAINNET),
        ("arbitrum-one", ARBITRUM_MAINNET),
        ("base", BASE_MAINNET),
        ("binance-smart-chain", BSC_MAINNET),
    ]
    .into_iter()
    .map(|(platform, chain)| (platform.to_string(), chain))
    .collect()
});
