//! Engine configuration.
//!
//! [`TokenListsConfig`] is assembled with `with_*` calls and validated exactly
//! once by [`TokenListsConfig::validate`]. The resulting [`ValidatedConfig`] is
//! immutable and shared behind an `Arc` for the lifetime of the engine.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::http_fetcher::{ConditionalFetcher, HttpFetcher, DEFAULT_HTTP_TIMEOUT};
use crate::parsers::{Parser, StandardTokenListParser};
use crate::schema::{SchemaValidator, StructuralValidator};
use crate::stores::{ContentStore, CustomTokenStore, LastRefreshTimeStore, PrivacyGuard};
use crate::types::ChainId;

pub const DEFAULT_AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_AUTO_REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub struct TokenListsConfig {
    main_list_id: String,
    main_list: Vec<u8>,
    initial_lists: BTreeMap<String, Vec<u8>>,
    parsers: HashMap<String, Arc<dyn Parser>>,
    default_parser: Arc<dyn Parser>,
    chains: Vec<ChainId>,
    manifest_url: Option<String>,
    auto_refresh_interval: Duration,
    auto_refresh_check_interval: Duration,
    http_timeout: Duration,
    content_store: Option<Arc<dyn ContentStore>>,
    custom_token_store: Option<Arc<dyn CustomTokenStore>>,
    last_refresh_time_store: Option<Arc<dyn LastRefreshTimeStore>>,
    privacy_guard: Option<Arc<dyn PrivacyGuard>>,
    fetcher: Option<Arc<dyn ConditionalFetcher>>,
    schema_validator: Arc<dyn SchemaValidator>,
}

impl TokenListsConfig {
    /// `main_list` is the bundled fallback for `main_list_id`.
    pub fn new(main_list_id: impl Into<String>, main_list: Vec<u8>, main_parser: Arc<dyn Parser>) -> Self {
        let main_list_id = main_list_id.into();
        let mut parsers: HashMap<String, Arc<dyn Parser>> = HashMap::new();
        parsers.insert(main_list_id.clone(), main_parser);
        Self {
            main_list_id,
            main_list,
            initial_lists: BTreeMap::new(),
            parsers,
            default_parser: Arc::new(StandardTokenListParser),
            chains: Vec::new(),
            manifest_url: None,
            auto_refresh_interval: DEFAULT_AUTO_REFRESH_INTERVAL,
            auto_refresh_check_interval: DEFAULT_AUTO_REFRESH_CHECK_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            content_store: None,
            custom_token_store: None,
            last_refresh_time_store: None,
            privacy_guard: None,
            fetcher: None,
            schema_validator: Arc::new(StructuralValidator),
        }
    }

    /// Bundled list shipped with the application.
    pub fn with_initial_list(mut self, id: impl Into<String>, raw: Vec<u8>, parser: Arc<dyn Parser>) -> Self {
        let id = id.into();
        self.parsers.insert(id.clone(), parser);
        self.initial_lists.insert(id, raw);
        self
    }

    /// Bundled list whose parser is registered separately with [`Self::with_parser`].
    pub fn with_initial_list_bytes(mut self, id: impl Into<String>, raw: Vec<u8>) -> Self {
        self.initial_lists.insert(id.into(), raw);
        self
    }

    /// Parser for a list ID, typically a remote list announced by the manifest.
    pub fn with_parser(mut self, id: impl Into<String>, parser: Arc<dyn Parser>) -> Self {
        self.parsers.insert(id.into(), parser);
        self
    }

    /// Parser for remote lists without a dedicated one.
    pub fn with_default_parser(mut self, parser: Arc<dyn Parser>) -> Self {
        self.default_parser = parser;
        self
    }

    pub fn with_chains(mut self, chains: impl IntoIterator<Item = ChainId>) -> Self {
        self.chains = chains.into_iter().collect();
        self
    }

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = Some(url.into());
        self
    }

    pub fn with_auto_refresh(mut self, interval: Duration, check_interval: Duration) -> Self {
        self.auto_refresh_interval = interval;
        self.auto_refresh_check_interval = check_interval;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content_store = Some(store);
        self
    }

    pub fn with_custom_token_store(mut self, store: Arc<dyn CustomTokenStore>) -> Self {
        self.custom_token_store = Some(store);
        self
    }

    pub fn with_last_refresh_time_store(mut self, store: Arc<dyn LastRefreshTimeStore>) -> Self {
        self.last_refresh_time_store = Some(store);
        self
    }

    pub fn with_privacy_guard(mut self, guard: Arc<dyn PrivacyGuard>) -> Self {
        self.privacy_guard = Some(guard);
        self
    }

    /// Replaces the reqwest fetcher built from the HTTP timeout.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ConditionalFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_schema_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.schema_validator = validator;
        self
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let content_store = self
            .content_store
            .ok_or(ConfigError::MissingCollaborator("content store"))?;
        let custom_token_store = self
            .custom_token_store
            .ok_or(ConfigError::MissingCollaborator("custom token store"))?;
        let last_refresh_time_store = self
            .last_refresh_time_store
            .ok_or(ConfigError::MissingCollaborator("last refresh time store"))?;
        let privacy_guard = self
            .privacy_guard
            .ok_or(ConfigError::MissingCollaborator("privacy guard"))?;

        if self.main_list_id.is_empty() {
            return Err(ConfigError::MissingMainList);
        }
        for id in std::iter::once(&self.main_list_id).chain(self.initial_lists.keys()) {
            if !self.parsers.contains_key(id) {
                return Err(ConfigError::MissingParser(id.clone()));
            }
        }

        let mut chains = self.chains;
        chains.sort_unstable();
        chains.dedup();
        if chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        if self.auto_refresh_interval.is_zero() || self.auto_refresh_check_interval.is_zero() {
            return Err(ConfigError::ZeroAutoRefreshInterval);
        }
        if self.auto_refresh_check_interval > self.auto_refresh_interval {
            return Err(ConfigError::InvalidAutoRefreshInterval {
                interval_secs: self.auto_refresh_interval.as_secs(),
                check_secs: self.auto_refresh_check_interval.as_secs(),
            });
        }

        let manifest_url = match self.manifest_url {
            Some(raw) if !raw.trim().is_empty() => {
                url::Url::parse(&raw).map_err(|e| ConfigError::InvalidManifestUrl {
                    url: raw.clone(),
                    reason: e.to_string(),
                })?;
                Some(raw)
            }
            _ => None,
        };

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let http = HttpFetcher::new(self.http_timeout)
                    .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
                Arc::new(http) as Arc<dyn ConditionalFetcher>
            }
        };

        Ok(ValidatedConfig {
            main_list_id: self.main_list_id,
            main_list: self.main_list,
            initial_lists: self.initial_lists,
            parsers: self.parsers,
            default_parser: self.default_parser,
            chains,
            manifest_url,
            auto_refresh_interval: self.auto_refresh_interval,
            auto_refresh_check_interval: self.auto_refresh_check_interval,
            content_store,
            custom_token_store,
            last_refresh_time_store,
            privacy_guard,
            fetcher,
            schema_validator: self.schema_validator,
        })
    }
}

/// Frozen configuration. Never mutated after [`TokenListsConfig::validate`].
pub struct ValidatedConfig {
    pub(crate) main_list_id: String,
    pub(crate) main_list: Vec<u8>,
    pub(crate) initial_lists: BTreeMap<String, Vec<u8>>,
    pub(crate) parsers: HashMap<String, Arc<dyn Parser>>,
    pub(crate) default_parser: Arc<dyn Parser>,
    pub(crate) chains: Vec<ChainId>,
    pub(crate) manifest_url: Option<String>,
    pub(crate) auto_refresh_interval: Duration,
    pub(crate) auto_refresh_check_interval: Duration,
    pub(crate) content_store: Arc<dyn ContentStore>,
    pub(crate) custom_token_store: Arc<dyn CustomTokenStore>,
    pub(crate) last_refresh_time_store: Arc<dyn LastRefreshTimeStore>,
    pub(crate) privacy_guard: Arc<dyn PrivacyGuard>,
    pub(crate) fetcher: Arc<dyn ConditionalFetcher>,
    pub(crate) schema_validator: Arc<dyn SchemaValidator>,
}

impl ValidatedConfig {
    pub fn main_list_id(&self) -> &str {
        &self.main_list_id
    }

    /// Sorted and deduplicated.
    pub fn chains(&self) -> &[ChainId] {
        &self.chains
    }

    pub fn manifest_url(&self) -> Option<&str> {
        self.manifest_url.as_deref()
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        self.auto_refresh_interval
    }

    pub fn auto_refresh_check_interval(&self) -> Duration {
        self.auto_refresh_check_interval
    }

    pub fn initial_list_ids(&self) -> impl Iterator<Item = &str> {
        self.initial_lists.keys().map(String::as_str)
    }

    /// Dedicated parser for `id`, else the default one.
    pub fn parser_for(&self, id: &str) -> Arc<dyn Parser> {
        self.parsers
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.default_parser.clone())
    }
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("main_list_id", &self.main_list_id)
            .field("initial_lists", &self.initial_lists.keys().collect::<Vec<_>>())
            .field("chains", &self.chains)
            .field("manifest_url", &self.manifest_url)
            .field("auto_refresh_interval", &self.auto_refresh_interval)
            .field("auto_refresh_check_interval", &self.auto_refresh_check_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::StatusTokenListParser;
    use crate::stores::{
        MemoryContentStore, MemoryCustomTokenStore, MemoryLastRefreshTimeStore, StaticPrivacyGuard,
    };

    fn base() -> TokenListsConfig {
        TokenListsConfig::new("status", b"{}".to_vec(), Arc::new(StatusTokenListParser))
            .with_chains([1, 10, 1])
            .with_content_store(Arc::new(MemoryContentStore::new()))
            .with_custom_token_store(Arc::new(MemoryCustomTokenStore::new()))
            .with_last_refresh_time_store(Arc::new(MemoryLastRefreshTimeStore::new()))
            .with_privacy_guard(Arc::new(StaticPrivacyGuard::new(false)))
    }

    #[test]
    fn test_valid_config() {
        let config = base().validate().unwrap();
        assert_eq!(config.chains(), &[1, 10]);
        assert_eq!(config.main_list_id(), "status");
        assert!(config.manifest_url().is_none());
    }

    #[test]
    fn test_check_interval_exceeding_interval() {
        let err = base()
            .with_auto_refresh(Duration::from_secs(60), Duration::from_secs(120))
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidAutoRefreshInterval {
                interval_secs: 60,
                check_secs: 120
            }
        );
    }

    #[test]
    fn test_missing_pieces() {
        let err = TokenListsConfig::new("status", vec![], Arc::new(StatusTokenListParser))
            .with_chains([1])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCollaborator(_)));

        let err = base().with_chains(Vec::new()).validate().unwrap_err();
        assert_eq!(err, ConfigError::NoChains);

        let err = base()
            .with_initial_list_bytes("orphan", b"{}".to_vec())
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParser("orphan".into()));

        let err = base().with_manifest_url("not a url").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidManifestUrl { .. }));
    }

    #[test]
    fn test_parser_fallback() {
        let config = base()
            .with_parser("coingecko", Arc::new(crate::parsers::CoinGeckoAllTokensParser::default()))
            .validate()
            .unwrap();
        // Unknown IDs get the default (standard) parser.
        let raw = br#"{"name": "x", "tokens": []}"#;
        assert!(config.parser_for("unknown").parse(raw, "local", None, &[1]).is_ok());
        assert!(config.parser_for("coingecko").parse(raw, "local", None, &[1]).is_err());
    }
}
