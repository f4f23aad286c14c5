//! Debounced auto-save scheduler.
//!
//! One task owns the state machine and runs every remote pass, so a manual
//! load can never interleave with a debounced save.
//!
//! ```text
//!   Idle ──mutation──▶ PendingSave ──debounce──▶ Saving ──▶ Idle
//!     │                    ▲   │ mutation restarts the timer
//!     │                    └───┘
//!     └──remote ready / load──▶ Loading ──settle──▶ Idle
//! ```
//!
//! Mutations are ignored while `Loading` (which covers the settle window),
//! while the remote is not ready, and when auto-save is off. Change events
//! produced by a pass itself are recognised by revision and dropped.

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::store::{lock_store, SharedStore, StoreChange};
use crate::sync::sync_engine::SyncEngine;
use crate::sync::types::{PassReport, SyncCommand, SyncError, SyncSettings, SyncState, SyncStatus};

const COMMAND_CAPACITY: usize = 32;

/// Client side of a running scheduler.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    pub async fn send(&self, command: SyncCommand) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Stopped)
    }

    /// Report that the remote finished its handshake.
    pub async fn notify_ready(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::RemoteReady).await
    }

    /// Report that the remote signed out.
    pub async fn notify_lost(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::RemoteLost).await
    }

    pub async fn load_now(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::LoadNow).await
    }

    pub async fn save_now(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::SaveNow).await
    }

    /// Stop the task. A pending save is flushed first.
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Shutdown).await
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&SyncStatus) -> bool) -> SyncStatus {
        let mut rx = self.status.clone();
        let reached = rx
            .wait_for(|status| predicate(status))
            .await
            .map(|status| status.clone());
        match reached {
            Ok(status) => status,
            // Task gone: report whatever it published last.
            Err(_) => rx.borrow().clone(),
        }
    }
}

pub struct SyncScheduler {
    store: SharedStore,
    engine: SyncEngine,
    settings: SyncSettings,
    state: SyncState,
    remote_ready: bool,
    deadline: Option<Instant>,
    /// Changes at or below this revision are already reflected remotely.
    synced_revision: u64,
    status: SyncStatus,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncScheduler {
    /// Start the scheduler task on the current runtime.
    pub fn spawn(
        store: SharedStore,
        engine: SyncEngine,
        settings: SyncSettings,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let remote_ready = engine.remote().is_ready();
        let status = SyncStatus {
            remote_ready,
            message: if remote_ready {
                "Connected to Google".into()
            } else {
                "Not connected".into()
            },
            ..SyncStatus::default()
        };
        let (status_tx, status_rx) = watch::channel(status.clone());
        let (changes, synced_revision) = {
            let guard = lock_store(&store);
            (guard.subscribe(), guard.revision())
        };

        let scheduler = Self {
            store,
            engine,
            settings,
            state: SyncState::Idle,
            remote_ready,
            deadline: None,
            synced_revision,
            status,
            status_tx,
        };
        let task = tokio::spawn(scheduler.run(command_rx, changes));
        (
            SyncHandle {
                commands: command_tx,
                status: status_rx,
            },
            task,
        )
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SyncCommand>,
        mut changes: broadcast::Receiver<StoreChange>,
    ) {
        // Ready at spawn counts as the not-ready -> ready transition.
        if self.remote_ready {
            self.run_load().await;
        }
        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(SyncCommand::Shutdown) | None => {
                        if self.state == SyncState::PendingSave {
                            tracing::info!("flushing pending save before shutdown");
                            self.run_save(true).await;
                        }
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                },

                change = changes.recv() => match change {
                    Ok(change) => self.on_change(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change events lagged; treating as one mutation");
                        let revision = lock_store(&self.store).revision();
                        self.on_change(StoreChange {
                            collection: crate::store::Collection::Master,
                            revision,
                        });
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_deadline().await;
                }
            }
        }
        tracing::debug!("sync scheduler stopped");
    }

    fn publish(&mut self, message: &str) {
        self.status.state = self.state;
        self.status.remote_ready = self.remote_ready;
        self.status.message = message.to_string();
        self.status_tx.send_replace(self.status.clone());
    }

    async fn on_command(&mut self, command: SyncCommand) {
        tracing::debug!(?command, state = %self.state, "sync command");
        match command {
            SyncCommand::RemoteReady => {
                if self.remote_ready {
                    return;
                }
                self.remote_ready = true;
                self.publish("Connected to Google");
                self.run_load().await;
            }
            SyncCommand::RemoteLost => {
                self.remote_ready = false;
                if self.state == SyncState::PendingSave {
                    tracing::info!("remote lost; dropping pending save");
                    self.state = SyncState::Idle;
                    self.deadline = None;
                }
                self.publish("Not connected");
            }
            SyncCommand::LoadNow => {
                if self.state == SyncState::PendingSave {
                    tracing::info!("manual load replaces pending save");
                }
                self.run_load().await;
            }
            SyncCommand::SaveNow => self.run_save(false).await,
            SyncCommand::Shutdown => {}
        }
    }

    fn on_change(&mut self, change: StoreChange) {
        if change.revision <= self.synced_revision {
            return;
        }
        if self.state == SyncState::Loading {
            tracing::trace!(collection = %change.collection, "ignoring change while loading");
            return;
        }
        if !self.remote_ready || !self.settings.auto_save {
            return;
        }
        self.state = SyncState::PendingSave;
        self.deadline = Some(Instant::now() + self.settings.debounce);
        if self.status.message != "Waiting for changes to settle..." {
            self.publish("Waiting for changes to settle...");
        } else {
            self.status.state = self.state;
        }
    }

    async fn on_deadline(&mut self) {
        self.deadline = None;
        match self.state {
            SyncState::PendingSave => self.run_save(true).await,
            SyncState::Loading => {
                self.state = SyncState::Idle;
                let message = self.status.message.clone();
                self.publish(&message);
            }
            SyncState::Idle | SyncState::Saving => {}
        }
    }

    async fn run_save(&mut self, automatic: bool) {
        self.state = SyncState::Saving;
        self.deadline = None;
        self.publish(if automatic {
            "Auto-saving changes..."
        } else {
            "Syncing to Sheets..."
        });

        let report = self.engine.save_all(&self.store).await;
        self.synced_revision = self.synced_revision.max(report.revision);
        self.status.save_passes += 1;
        self.status.last_save_at = Some(Utc::now());
        self.record_failures(&report);

        self.state = SyncState::Idle;
        if report.is_clean() {
            tracing::info!(tables = report.succeeded.len(), "All changes saved to Drive");
            self.publish("All changes saved to Drive");
        } else {
            tracing::warn!(failed = report.failed.len(), "save pass finished with failures");
            self.publish("Sync Failed");
        }
    }

    async fn run_load(&mut self) {
        self.state = SyncState::Loading;
        self.deadline = None;
        self.publish("Loading data from Sheets...");

        let report = self.engine.load_all(&self.store).await;
        self.synced_revision = self.synced_revision.max(report.revision);
        self.status.load_passes += 1;
        self.status.last_load_at = Some(Utc::now());
        self.record_failures(&report);

        // Stay in Loading through the settle window.
        self.deadline = Some(Instant::now() + self.settings.settle);
        if report.is_clean() {
            tracing::info!(
                loaded = report.succeeded.len(),
                skipped = report.skipped.len(),
                "Data loaded from Sheets"
            );
            self.publish("Data loaded from Sheets");
        } else {
            tracing::warn!(failed = report.failed.len(), "load pass finished with failures");
            self.publish("Load Failed");
        }
    }

    fn record_failures(&mut self, report: &PassReport) {
        self.status.failed_tables = report
            .failed
            .iter()
            .map(|(collection, error)| (collection.name().to_string(), error.clone()))
            .collect();
    }
}
