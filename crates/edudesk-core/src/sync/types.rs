//! Core types for spreadsheet synchronization.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Collection;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    /// A save is armed and waiting for the debounce window to close.
    PendingSave,
    Saving,
    /// Reading remote tables, or settling after the read.
    Loading,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Idle => "idle",
            SyncState::PendingSave => "pending save",
            SyncState::Saving => "saving",
            SyncState::Loading => "loading",
        };
        f.write_str(s)
    }
}

/// Commands accepted by the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// The remote client finished its handshake.
    RemoteReady,
    /// The remote client signed out or lost its token.
    RemoteLost,
    LoadNow,
    SaveNow,
    Shutdown,
}

/// Snapshot of the scheduler published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Human-readable status line.
    pub message: String,
    pub remote_ready: bool,
    pub last_load_at: Option<DateTime<Utc>>,
    pub last_save_at: Option<DateTime<Utc>>,
    /// Completed load passes.
    pub load_passes: u64,
    /// Completed save passes.
    pub save_passes: u64,
    /// Tables that failed during the most recent pass, with the error text.
    pub failed_tables: BTreeMap<String, String>,
}

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period after the last mutation before a save runs.
    pub debounce: Duration,
    /// Delay after a load during which mutations are ignored.
    pub settle: Duration,
    /// When false, mutations never arm a save; manual saves still work.
    pub auto_save: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            settle: Duration::from_millis(1000),
            auto_save: true,
        }
    }
}

/// Result of one load or save pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Tables read or written successfully.
    pub succeeded: Vec<Collection>,
    /// Tables that failed, with the error text.
    pub failed: Vec<(Collection, String)>,
    /// Tables that were missing or empty on load and left untouched.
    pub skipped: Vec<Collection>,
    /// Store revision the pass left in sync with the remote.
    pub revision: u64,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Remote client is not ready")]
    NotReady,

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote table not found: {0}")]
    MissingTable(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration incomplete: {0}")]
    Config(String),

    #[error("Sync scheduler has stopped")]
    Stopped,
}
