use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::chains::{self, DEFAULT_PLATFORM_CHAINS};
use crate::config::TokenListsConfig;
use crate::parsers::CoinGeckoAllTokensParser;
use crate::types::ChainId;

pub const DEFAULT_SETTINGS_FILE: &str = "TokenLists.toml";

/// File/env backed settings for the scalar parts of [`TokenListsConfig`].
///
/// Collaborators (stores, privacy guard) and bundled list bytes are wired in
/// code; everything an operator may want to tune lives here.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainId>,
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default = "default_auto_refresh_interval_secs")]
    pub auto_refresh_interval_secs: u64,
    #[serde(default = "default_auto_refresh_check_interval_secs")]
    pub auto_refresh_check_interval_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// CoinGecko platform name -> chain ID.
    #[serde(default = "default_platform_chains")]
    pub platform_chains: HashMap<String, ChainId>,
}

fn default_chains() -> Vec<ChainId> {
    vec![
        chains::ETHEREUM_MAINNET,
        chains::OPTIMISM_MAINNET,
        chains::ARBITRUM_MAINNET,
        chains::BASE_MAINNET,
        chains::BSC_MAINNET,
    ]
}
fn default_auto_refresh_interval_secs() -> u64 {
    30 * 60
}
fn default_auto_refresh_check_interval_secs() -> u64 {
    60
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_platform_chains() -> HashMap<String, ChainId> {
    DEFAULT_PLATFORM_CHAINS.clone()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            manifest_url: None,
            auto_refresh_interval_secs: default_auto_refresh_interval_secs(),
            auto_refresh_check_interval_secs: default_auto_refresh_check_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            platform_chains: default_platform_chains(),
        }
    }
}

impl Settings {
    /// Loads `TokenLists.toml` from the working directory when present, then
    /// applies `TOKEN_LISTS_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path(DEFAULT_SETTINGS_FILE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = env::var("TOKEN_LISTS_CHAINS") {
            let parsed: Vec<ChainId> = raw
                .split(',')
                .filter_map(|c| c.trim().parse().ok())
                .collect();
            if !parsed.is_empty() {
                self.chains = parsed;
            }
        }
        if let Ok(raw) = env::var("TOKEN_LISTS_MANIFEST_URL") {
            let trimmed = raw.trim();
            self.manifest_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(secs) = env_u64("TOKEN_LISTS_AUTO_REFRESH_INTERVAL_SECS") {
            self.auto_refresh_interval_secs = secs;
        }
        if let Some(secs) = env_u64("TOKEN_LISTS_AUTO_REFRESH_CHECK_INTERVAL_SECS") {
            self.auto_refresh_check_interval_secs = secs;
        }
        if let Some(secs) = env_u64("TOKEN_LISTS_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = secs;
        }
    }

    pub fn coingecko_parser(&self) -> CoinGeckoAllTokensParser {
        CoinGeckoAllTokensParser::new(self.platform_chains.clone())
    }

    /// Copies the tunables onto `config`. Validation still happens in
    /// [`TokenListsConfig::validate`].
    pub fn apply(&self, mut config: TokenListsConfig) -> TokenListsConfig {
        config = config
            .with_chains(self.chains.iter().copied())
            .with_auto_refresh(
                Duration::from_secs(self.auto_refresh_interval_secs),
                Duration::from_secs(self.auto_refresh_check_interval_secs),
            )
            .with_http_timeout(Duration::from_secs(self.http_timeout_secs));
        if let Some(url) = &self.manifest_url {
            config = config.with_manifest_url(url.clone());
        }
        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
