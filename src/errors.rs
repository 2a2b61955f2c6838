//! Error taxonomy for the token list engine.
//!
//! Only [`ConfigError`] and the lifecycle misuse variants of [`TokenListsError`]
//! ever reach a caller. Fetch, parse, schema and per-token validation errors are
//! logged and degraded inside the engine.

use crate::types::ChainId;

/// Construction-time configuration errors. Fatal and permanent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("missing parser for token list {0}")]
    MissingParser(String),
    #[error("main token list id is empty")]
    MissingMainList,
    #[error("auto refresh check interval ({check_secs}s) exceeds auto refresh interval ({interval_secs}s)")]
    InvalidAutoRefreshInterval { interval_secs: u64, check_secs: u64 },
    #[error("auto refresh intervals must be non-zero")]
    ZeroAutoRefreshInterval,
    #[error("failed to build http client: {0}")]
    HttpClient(String),
    #[error("no chains configured")]
    NoChains,
    #[error("invalid manifest url {url}: {reason}")]
    InvalidManifestUrl { url: String, reason: String },
}

/// Transient fetch errors produced by the conditional HTTP fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("unexpected status {status} from {url}")]
    BadStatus { url: String, status: u16 },
    #[error("request to {0} cancelled")]
    Cancelled(String),
}

impl FetchError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::BadStatus { status, .. } => Some(*status),
            FetchError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            FetchError::Timeout(_) | FetchError::Cancelled(_) => None,
        }
    }
}

/// Token list parsing failures. A parse error never yields a partial list.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed token list json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural (JSON-Schema subset) validation failures.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("document is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("schema is not usable: {0}")]
    InvalidSchema(String),
    #[error("{path}: {reason}")]
    Violation { path: String, reason: String },
}

/// Reasons a single custom token is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("chain {0} is not supported")]
    UnsupportedChain(ChainId),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("symbol is empty")]
    EmptySymbol,
    #[error("decimals {0} exceed 18")]
    TooManyDecimals(u32),
    #[error("logo uri {0:?} has an unsupported scheme")]
    InvalidLogoUri(String),
}

/// Errors returned by the [`crate::token_lists::TokenLists`] facade.
#[derive(Debug, thiserror::Error)]
pub enum TokenListsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("token lists already started")]
    AlreadyStarted,
    #[error("token lists not started")]
    NotStarted,
    #[error("token lists already stopped")]
    AlreadyStopped,
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
