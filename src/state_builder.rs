//! Deterministic merge of every token source into one immutable [`State`].
//!
//! Tiers are merged strictly in this order, first writer wins per token key:
//!
//! 1. **Native**: one synthesized native token per configured chain
//! 2. **Main**: the designated main list, cached content else bundled bytes
//! 3. **Initial**: the other bundled lists in sorted ID order, same fallback
//! 4. **Remote**: every other cached list in sorted ID order, cache only
//! 5. **Custom**: user tokens that pass validation
//!
//! A failing tier is logged and contributes nothing further; the merge itself
//! never fails.

use chrono::{DateTime, Utc};
use ethers::types::Address;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::chains::native_token;
use crate::config::ValidatedConfig;
use crate::manifest::MANIFEST_ID;
use crate::stores::Content;
use crate::token_validation::validate_custom_token;
use crate::types::{token_key, ChainId, Token, TokenList, LOCAL_SOURCE};

pub const NATIVE_LIST_ID: &str = "native";
pub const CUSTOM_LIST_ID: &str = "custom";

/// Published snapshot. Never mutated once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    tokens: IndexMap<String, Token>,
    token_lists: IndexMap<String, TokenList>,
}

impl State {
    /// Adds `list` under `id`; only tokens with unseen keys enter the index.
    fn add_list(&mut self, id: &str, list: TokenList) -> usize {
        let mut added = 0;
        for token in &list.tokens {
            if let indexmap::map::Entry::Vacant(slot) = self.tokens.entry(token.key()) {
                slot.insert(token.clone());
                added += 1;
            }
        }
        self.token_lists.insert(id.to_string(), list);
        added
    }

    /// Deduplicated tokens in merge order.
    pub fn unique_tokens(&self) -> Vec<Token> {
        self.tokens.values().cloned().collect()
    }

    pub fn token_by_chain_address(&self, chain_id: ChainId, address: &Address) -> Option<Token> {
        self.tokens.get(&token_key(chain_id, address)).cloned()
    }

    pub fn tokens_by_chain(&self, chain_id: ChainId) -> Vec<Token> {
        self.tokens
            .values()
            .filter(|t| t.chain_id == chain_id)
            .cloned()
            .collect()
    }

    pub fn tokens_by_cross_chain_id(&self, cross_chain_id: &str) -> Vec<Token> {
        self.tokens
            .values()
            .filter(|t| !t.cross_chain_id.is_empty() && t.cross_chain_id == cross_chain_id)
            .cloned()
            .collect()
    }

    pub fn token_list(&self, id: &str) -> Option<TokenList> {
        self.token_lists.get(id).cloned()
    }

    pub fn token_lists(&self) -> Vec<TokenList> {
        self.token_lists.values().cloned().collect()
    }

    pub fn token_list_ids(&self) -> Vec<String> {
        self.token_lists.keys().cloned().collect()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// One way of obtaining a list's bytes; tried in order until one parses.
struct Attempt<'a> {
    label: &'static str,
    raw: &'a [u8],
    source_url: &'a str,
    fetched_at: Option<DateTime<Utc>>,
}

impl<'a> Attempt<'a> {
    fn cached(content: &'a Content) -> Self {
        Self {
            label: "cached",
            raw: &content.data,
            source_url: &content.source_url,
            fetched_at: Some(content.fetched_at),
        }
    }

    fn bundled(raw: &'a [u8]) -> Self {
        Self {
            label: "bundled",
            raw,
            source_url: LOCAL_SOURCE,
            fetched_at: None,
        }
    }
}

struct StateBuilder<'a> {
    config: &'a ValidatedConfig,
    cache: BTreeMap<String, Content>,
    state: State,
}

impl<'a> StateBuilder<'a> {
    fn new(config: &'a ValidatedConfig) -> Self {
        let cache = match config.content_store.get_all() {
            Ok(all) => all.into_iter().collect(),
            Err(e) => {
                warn!("StateBuilder: content store unavailable, using bundled lists only: {}", e);
                BTreeMap::new()
            }
        };
        Self {
            config,
            cache,
            state: State::default(),
        }
    }

    fn parse_first(&self, id: &str, attempts: Vec<Attempt<'_>>) -> Option<TokenList> {
        let parser = self.config.parser_for(id);
        for attempt in attempts {
            match parser.parse(attempt.raw, attempt.source_url, attempt.fetched_at, &self.config.chains) {
                Ok(list) => {
                    debug!("StateBuilder: {} parsed from {} content", id, attempt.label);
                    return Some(list);
                }
                Err(e) => warn!("StateBuilder: failed to parse {} content of {}: {}", attempt.label, id, e),
            }
        }
        None
    }

    fn merge_list(&mut self, id: &str, bundled: Option<&[u8]>) {
        let mut attempts = Vec::with_capacity(2);
        if let Some(content) = self.cache.get(id) {
            attempts.push(Attempt::cached(content));
        }
        if let Some(raw) = bundled {
            attempts.push(Attempt::bundled(raw));
        }
        if let Some(list) = self.parse_first(id, attempts) {
            let added = self.state.add_list(id, list);
            debug!("StateBuilder: {} contributed {} tokens", id, added);
        }
    }

    fn merge_native(&mut self) {
        let list = TokenList {
            name: "Native tokens".to_string(),
            source: LOCAL_SOURCE.to_string(),
            tokens: self.config.chains.iter().map(|&c| native_token(c)).collect(),
            ..Default::default()
        };
        self.state.add_list(NATIVE_LIST_ID, list);
    }

    fn merge_main(&mut self) {
        let config = self.config;
        self.merge_list(&config.main_list_id, Some(config.main_list.as_slice()));
    }

    fn merge_initial(&mut self) {
        let config = self.config;
        for (id, raw) in &config.initial_lists {
            if *id == config.main_list_id {
                continue;
            }
            self.merge_list(id, Some(raw.as_slice()));
        }
    }

    fn merge_remote(&mut self) {
        let config = self.config;
        let consumed: HashSet<&str> = [MANIFEST_ID, NATIVE_LIST_ID, CUSTOM_LIST_ID, config.main_list_id.as_str()]
            .into_iter()
            .chain(config.initial_lists.keys().map(String::as_str))
            .collect();
        let remote_ids: Vec<String> = self
            .cache
            .keys()
            .filter(|id| !consumed.contains(id.as_str()))
            .cloned()
            .collect();
        for id in remote_ids {
            self.merge_list(&id, None);
        }
    }

    fn merge_custom(&mut self) {
        let custom = match self.config.custom_token_store.get_all() {
            Ok(custom) => custom,
            Err(e) => {
                warn!("StateBuilder: custom token store unavailable, skipping custom tokens: {}", e);
                return;
            }
        };

        let mut tokens = Vec::with_capacity(custom.len());
        for record in &custom {
            match validate_custom_token(record, &self.config.chains) {
                Ok(token) => tokens.push(token),
                Err(e) => warn!(
                    "StateBuilder: dropping custom token {} on chain {}: {}",
                    record.address, record.chain_id, e
                ),
            }
        }
        if tokens.is_empty() {
            return;
        }

        let list = TokenList {
            name: "Custom tokens".to_string(),
            source: LOCAL_SOURCE.to_string(),
            tokens,
            ..Default::default()
        };
        self.state.add_list(CUSTOM_LIST_ID, list);
    }

    fn build(mut self) -> State {
        self.merge_native();
        self.merge_main();
        self.merge_initial();
        self.merge_remote();
        self.merge_custom();
        self.state
    }
}

/// Builds a fresh snapshot from local data only: cached content, bundled
/// lists and custom tokens. Never touches the network.
pub fn build_state(config: &ValidatedConfig) -> State {
    let start = Instant::now();
    let state = StateBuilder::new(config).build();
    info!(
        "StateBuilder: built {} unique tokens from {} lists in {:?}",
        state.token_count(),
        state.token_lists.len(),
        start.elapsed()
    );
    state
}
