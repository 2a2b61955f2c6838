//! # Token Lists SDK
//!
//! A multi-chain token metadata catalog for wallets. The SDK merges bundled,
//! remote and user supplied token lists into one deduplicated set of tokens
//! and keeps the remote part fresh in the background.
//!
//! ## Overview
//!
//! - **Bundled lists**: the main list and any initial lists ship with the
//!   embedding application and are always available offline
//! - **Remote lists**: a manifest names the lists to download; each one is
//!   fetched with ETag conditional GETs and cached in a [`stores::ContentStore`]
//! - **Custom tokens**: tokens added by the user are validated and merged last
//! - **Privacy mode**: while on, nothing touches the network
//!
//! ## Architecture
//!
//! ### Fetch Layer
//! [`http_fetcher`] performs conditional GETs, [`manifest`] resolves the list
//! manifest and [`list_fetcher`] downloads every listed entry concurrently.
//!
//! ### Parse Layer
//! [`parsers`] turn raw bytes of a known list format into a [`types::TokenList`].
//!
//! ### State Layer
//! [`state_builder`] merges all tiers into an immutable snapshot with
//! first-writer-wins deduplication. [`token_lists::TokenLists`] publishes the
//! snapshot and drives the [`refresh_worker`].

// Core Types
/// Token and token list types, address helpers
pub mod types;
/// Chain ids and native tokens
pub mod chains;
/// Error types
pub mod errors;

// Configuration
/// Engine configuration and validation
pub mod config;
/// File and environment backed settings
pub mod settings;

// Persistence
/// Storage collaborators and in-memory implementations
pub mod stores;

// Fetch Layer
/// Conditional HTTP GET with ETags
pub mod http_fetcher;
/// Remote manifest resolution
pub mod manifest;
/// Concurrent download of manifest entries
pub mod list_fetcher;
/// JSON schema validation
pub mod schema;

// Parse Layer
/// Token list format parsers
pub mod parsers;
/// Custom token validation
pub mod token_validation;

// State Layer
/// Tiered merge of all sources into a snapshot
pub mod state_builder;
/// Periodic background refresh
pub mod refresh_worker;
/// Public facade
pub mod token_lists;

// Re-exports for convenience
pub use config::TokenListsConfig;
pub use errors::{ConfigError, TokenListsError};
pub use parsers::{CoinGeckoAllTokensParser, Parser, StandardTokenListParser, StatusTokenListParser};
pub use settings::Settings;
pub use token_lists::TokenLists;
pub use types::{ChainId, Token, TokenList};
