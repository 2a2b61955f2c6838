//! Public facade of the engine.
//!
//! Owns the published [`State`] behind an [`ArcSwap`]: queries are lock-free
//! loads of the current snapshot, while lifecycle calls and rebuilds are
//! serialized by one coarse async mutex.

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeZone, Utc};
use ethers::types::Address;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{TokenListsConfig, ValidatedConfig};
use crate::errors::{ConfigError, TokenListsError};
use crate::refresh_worker::{RefreshWorker, Refreshed};
use crate::state_builder::{build_state, State};
use crate::types::{ChainId, Token, TokenList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unstarted,
    Started,
    Stopped,
}

struct Inner {
    lifecycle: Lifecycle,
    /// Privacy mode as last observed, to detect transitions.
    private: bool,
    notify: Option<mpsc::Sender<()>>,
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

pub struct TokenLists {
    config: Arc<ValidatedConfig>,
    state: Arc<ArcSwap<State>>,
    worker: Arc<RefreshWorker>,
    inner: Arc<Mutex<Inner>>,
}

impl TokenLists {
    pub fn new(config: TokenListsConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_validated(Arc::new(config.validate()?)))
    }

    pub fn from_validated(config: Arc<ValidatedConfig>) -> Self {
        Self {
            worker: Arc::new(RefreshWorker::new(config.clone())),
            config,
            state: Arc::new(ArcSwap::from_pointee(State::default())),
            inner: Arc::new(Mutex::new(Inner {
                lifecycle: Lifecycle::Unstarted,
                private: false,
                notify: None,
                cancel: CancellationToken::new(),
                listener: None,
            })),
        }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Builds the first snapshot synchronously, then starts the refresh
    /// worker unless privacy mode is on. `notify` receives one message per
    /// published rebuild; its capacity bounds how many background refresh
    /// results may be pending, so `mpsc::channel(1)` keeps it to one.
    pub async fn start(
        &self,
        cancel: CancellationToken,
        notify: mpsc::Sender<()>,
    ) -> Result<(), TokenListsError> {
        let mut inner = self.inner.lock().await;
        match inner.lifecycle {
            Lifecycle::Started => return Err(TokenListsError::AlreadyStarted),
            Lifecycle::Stopped => return Err(TokenListsError::AlreadyStopped),
            Lifecycle::Unstarted => {}
        }

        self.rebuild();
        inner.private = self.is_privacy_on();
        inner.notify = Some(notify);
        inner.cancel = cancel;
        inner.lifecycle = Lifecycle::Started;
        self.manage_worker(&mut inner, false).await;
        info!("TokenLists: started");
        Ok(())
    }

    /// Stops the refresh worker and waits until no refresh is in flight.
    pub async fn stop(&self) -> Result<(), TokenListsError> {
        let mut inner = self.inner.lock().await;
        match inner.lifecycle {
            Lifecycle::Unstarted => return Err(TokenListsError::NotStarted),
            Lifecycle::Stopped => return Err(TokenListsError::AlreadyStopped),
            Lifecycle::Started => {}
        }
        self.stop_worker(&mut inner).await;
        inner.lifecycle = Lifecycle::Stopped;
        info!("TokenLists: stopped");
        Ok(())
    }

    /// Forces a refresh. With privacy on nothing touches the network: the
    /// snapshot is rebuilt from local data and one notification is sent.
    pub async fn refresh_now(&self, cancel: CancellationToken) -> Result<(), TokenListsError> {
        let mut inner = self.inner.lock().await;
        Self::ensure_started(&inner)?;
        inner.private = self.is_privacy_on();

        if inner.private {
            self.rebuild();
            let notify = inner.notify.clone();
            drop(inner);
            forward(notify.as_ref()).await;
            return Ok(());
        }

        inner.cancel = cancel;
        self.manage_worker(&mut inner, true).await;
        Ok(())
    }

    /// Re-evaluates the privacy guard. Turning private stops the worker,
    /// rebuilds from local data and notifies once; turning public resumes the
    /// worker with an immediate refresh.
    pub async fn privacy_mode_updated(&self, cancel: CancellationToken) -> Result<(), TokenListsError> {
        let mut inner = self.inner.lock().await;
        Self::ensure_started(&inner)?;
        inner.cancel = cancel;
        let private = self.is_privacy_on();
        let was_private = std::mem::replace(&mut inner.private, private);

        if !private {
            if !self.worker.is_running().await {
                self.manage_worker(&mut inner, true).await;
            }
            return Ok(());
        }

        self.stop_worker(&mut inner).await;
        if was_private {
            return Ok(());
        }
        info!("TokenLists: privacy mode on, serving local data only");
        self.rebuild();
        let notify = inner.notify.clone();
        drop(inner);
        forward(notify.as_ref()).await;
        Ok(())
    }

    pub fn last_refresh_time(&self) -> Result<DateTime<Utc>, TokenListsError> {
        let secs = self.config.last_refresh_time_store.get()?;
        Ok(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    pub fn unique_tokens(&self) -> Vec<Token> {
        self.state.load().unique_tokens()
    }

    pub fn token_by_chain_address(&self, chain_id: ChainId, address: &Address) -> Option<Token> {
        self.state.load().token_by_chain_address(chain_id, address)
    }

    pub fn tokens_by_chain(&self, chain_id: ChainId) -> Vec<Token> {
        self.state.load().tokens_by_chain(chain_id)
    }

    pub fn tokens_by_cross_chain_id(&self, cross_chain_id: &str) -> Vec<Token> {
        self.state.load().tokens_by_cross_chain_id(cross_chain_id)
    }

    pub fn token_list(&self, id: &str) -> Option<TokenList> {
        self.state.load().token_list(id)
    }

    pub fn token_lists(&self) -> Vec<TokenList> {
        self.state.load().token_lists()
    }

    pub fn token_list_ids(&self) -> Vec<String> {
        self.state.load().token_list_ids()
    }

    fn ensure_started(inner: &Inner) -> Result<(), TokenListsError> {
        match inner.lifecycle {
            Lifecycle::Started => Ok(()),
            Lifecycle::Unstarted => Err(TokenListsError::NotStarted),
            Lifecycle::Stopped => Err(TokenListsError::AlreadyStopped),
        }
    }

    /// Callers hold the lifecycle lock.
    fn rebuild(&self) {
        self.state.store(Arc::new(build_state(&self.config)));
    }

    fn is_privacy_on(&self) -> bool {
        match self.config.privacy_guard.is_privacy_on() {
            Ok(on) => on,
            Err(e) => {
                // No way to tell, so stay offline.
                warn!("TokenLists: privacy guard failed, assuming private: {}", e);
                true
            }
        }
    }

    async fn manage_worker(&self, inner: &mut Inner, force_refresh: bool) {
        if self.is_privacy_on() {
            debug!("TokenLists: privacy mode on, refresh worker stays stopped");
            self.stop_worker(inner).await;
            return;
        }

        if force_refresh {
            self.stop_worker(inner).await;
        }

        let Some(rx) = self.worker.start(&inner.cancel, force_refresh).await else {
            return;
        };
        let Some(notify) = inner.notify.clone() else {
            return;
        };
        inner.listener = Some(tokio::spawn(listen(
            rx,
            notify,
            self.config.clone(),
            self.state.clone(),
            self.inner.clone(),
        )));
    }

    async fn stop_worker(&self, inner: &mut Inner) {
        self.worker.stop().await;
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
    }
}

async fn forward(notify: Option<&mpsc::Sender<()>>) {
    let Some(notify) = notify else {
        return;
    };
    if notify.send(()).await.is_err() {
        debug!("TokenLists: notification receiver dropped");
    }
}

/// Rebuilds and republishes the snapshot after each completed refresh, then
/// forwards the notification to the embedding application. The worker is
/// released only after the consumer has made room for the next one.
async fn listen(
    mut refreshed: mpsc::Receiver<Refreshed>,
    notify: mpsc::Sender<()>,
    config: Arc<ValidatedConfig>,
    state: Arc<ArcSwap<State>>,
    inner: Arc<Mutex<Inner>>,
) {
    while let Some(done) = refreshed.recv().await {
        {
            let _guard = inner.lock().await;
            state.store(Arc::new(build_state(&config)));
        }
        // Capacity returns once the consumer took the notification; only
        // then may the worker start the next refresh.
        let delivered = match notify.send(()).await {
            Ok(()) => notify.reserve().await.is_ok(),
            Err(_) => false,
        };
        if !delivered {
            debug!("TokenLists: notification receiver dropped");
        }
        done.ack();
    }
    debug!("TokenLists: refresh listener exiting");
}
