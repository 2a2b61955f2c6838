//! Background refresh of remote token lists.
//!
//! The worker checks on every tick whether a refresh is due (privacy off and
//! the auto refresh interval elapsed since the last attempt), runs the
//! manifest + fan-out fetch, and then hands one [`Refreshed`] to its consumer.
//! The worker does not tick again until the consumer acknowledges it, so at
//! most one refresh result is ever pending.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ValidatedConfig;
use crate::list_fetcher::fetch_token_lists;
use crate::manifest::resolve_manifest;

/// One completed refresh. The worker stays parked until [`Refreshed::ack`]
/// is called or the value is dropped.
#[derive(Debug)]
pub struct Refreshed {
    ack: oneshot::Sender<()>,
}

impl Refreshed {
    pub fn ack(self) {
        let _ = self.ack.send(());
    }
}

struct RunningWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct RefreshWorker {
    config: Arc<ValidatedConfig>,
    running: Mutex<Option<RunningWorker>>,
}

impl RefreshWorker {
    pub fn new(config: Arc<ValidatedConfig>) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.running.lock().await, Some(w) if !w.handle.is_finished())
    }

    /// Spawns the worker under a child of `parent`. Returns `None` when it is
    /// already running. The returned channel closes once the worker exits.
    ///
    /// With `force` the first check ignores the auto refresh interval; the
    /// privacy guard still applies.
    pub async fn start(&self, parent: &CancellationToken, force: bool) -> Option<mpsc::Receiver<Refreshed>> {
        let mut running = self.running.lock().await;
        if matches!(&*running, Some(w) if !w.handle.is_finished()) {
            debug!("RefreshWorker: already running");
            return None;
        }

        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(1);
        let task = WorkerTask {
            config: self.config.clone(),
            cancel: cancel.clone(),
            notify: tx,
        };
        let handle = tokio::spawn(task.run(force));

        *running = Some(RunningWorker { cancel, handle });
        info!(
            "RefreshWorker: started (interval {:?}, check every {:?}, forced {})",
            self.config.auto_refresh_interval, self.config.auto_refresh_check_interval, force
        );
        Some(rx)
    }

    /// Cancels the worker and waits for its task to exit. No refresh is in
    /// flight once this returns. No-op when stopped.
    pub async fn stop(&self) {
        let Some(worker) = self.running.lock().await.take() else {
            return;
        };
        worker.cancel.cancel();
        if let Err(e) = worker.handle.await {
            warn!("RefreshWorker: task ended abnormally: {}", e);
        }
        info!("RefreshWorker: stopped");
    }
}

struct WorkerTask {
    config: Arc<ValidatedConfig>,
    cancel: CancellationToken,
    notify: mpsc::Sender<Refreshed>,
}

impl WorkerTask {
    async fn run(self, force: bool) {
        let period = self.config.auto_refresh_check_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First check happens right away; later ones follow the ticker.
        if !self.check_and_refresh(force).await {
            return;
        }
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.check_and_refresh(false).await {
                        break;
                    }
                }
            }
        }
        debug!("RefreshWorker: task exiting");
    }

    /// Returns `false` once the worker should exit.
    async fn check_and_refresh(&self, force: bool) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }

        match self.config.privacy_guard.is_privacy_on() {
            Ok(false) => {}
            Ok(true) => {
                debug!("RefreshWorker: privacy mode on, skipping refresh");
                return true;
            }
            Err(e) => {
                warn!("RefreshWorker: privacy guard failed, skipping refresh: {}", e);
                return true;
            }
        }

        if !force {
            let last = match self.config.last_refresh_time_store.get() {
                Ok(last) => last,
                Err(e) => {
                    warn!("RefreshWorker: failed to read last refresh time: {}", e);
                    0
                }
            };
            let elapsed = Utc::now().timestamp().saturating_sub(last);
            let interval = self.config.auto_refresh_interval.as_secs() as i64;
            if elapsed < interval {
                debug!("RefreshWorker: last refresh {}s ago, next in {}s", elapsed, interval - elapsed);
                return true;
            }
        }

        info!("RefreshWorker: refreshing token lists");
        let manifest = resolve_manifest(&self.config, &self.cancel).await;
        let stored = fetch_token_lists(self.config.clone(), &manifest, &self.cancel).await;

        // Advanced even on total failure so a broken source is not hammered.
        if let Err(e) = self.config.last_refresh_time_store.set(Utc::now().timestamp()) {
            warn!("RefreshWorker: failed to record refresh time: {}", e);
        }
        info!(
            "RefreshWorker: refresh done, {} of {} lists updated",
            stored,
            manifest.token_lists.len()
        );

        self.notify_and_wait().await
    }

    async fn notify_and_wait(&self) -> bool {
        let (ack, acked) = oneshot::channel();
        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            sent = self.notify.send(Refreshed { ack }) => {
                if sent.is_err() {
                    debug!("RefreshWorker: consumer gone");
                    return false;
                }
            }
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            acked = acked => {
                if acked.is_err() {
                    debug!("RefreshWorker: notification dropped without ack");
                }
                acked.is_ok()
            }
        }
    }
}
