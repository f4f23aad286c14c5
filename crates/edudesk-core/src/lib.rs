//! # EduDesk Core Library
//!
//! Back end for a school administration desk: users, students, timetables,
//! attendance, holidays and master reference data, mirrored to a Google
//! Sheets spreadsheet that acts as the shared database.
//!
//! The `edudesk` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Entity Store**: in-memory collections that publish a change event on
//!   every mutation
//! - **Reconciliation**: master-data add/rename/remove with cascades into
//!   dependent records
//! - **Sheets**: the [`RemoteTable`] seam, the Sheets v4 client and an
//!   in-memory stand-in
//! - **Sync**: row codec, whole-table passes and the debounced scheduler
//! - **Storage**: TOML configuration and the SQLite local snapshot
//!
//! ## Key Components
//!
//! - [`EntityStore`]: shared application state
//! - [`SyncScheduler`]: debounce / load / settle state machine
//! - [`SheetsClient`]: Google Sheets values API
//! - [`Config`]: application configuration management

pub mod app;
pub mod error;
pub mod integrations;
pub mod model;
pub mod reconcile;
pub mod report;
pub mod session;
pub mod sheets;
pub mod storage;
pub mod store;
pub mod sync;

pub use app::App;
pub use error::{ConfigError, CoreError, DatabaseError, OAuthError, ValidationError};
pub use model::{
    AttendanceRecord, AttendanceStatus, ClassId, Holiday, MasterData, MasterKind, Role, Student,
    TimetableEntry, User,
};
pub use reconcile::{CascadeReport, ReconcileError};
pub use session::{mark_attendance, save_user, Session, UserDraft};
pub use sheets::{MemoryTables, RemoteTable, SheetsClient};
pub use storage::{Config, Database};
pub use store::{lock_store, Collection, EntityStore, SharedStore, StoreChange, StoreSnapshot};
pub use sync::{SyncEngine, SyncError, SyncHandle, SyncScheduler, SyncSettings, SyncState, SyncStatus};
