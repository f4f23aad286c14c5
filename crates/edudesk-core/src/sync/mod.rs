//! Google Sheets synchronization layer.
//!
//! Keeps the in-memory store mirrored to one spreadsheet with a tab per
//! collection. Passes move whole tables in both directions; the scheduler
//! debounces saves after local mutations and suppresses them after loads.

pub mod row_codec;
pub mod scheduler;
pub mod sync_engine;
pub mod types;


pub use row_codec::{decode_table, encode_table, layout, Decoded, TableLayout, LAYOUTS};
pub use scheduler::{SyncHandle, SyncScheduler};
pub use sync_engine::SyncEngine;
pub use types::{PassReport, SyncCommand, SyncError, SyncSettings, SyncState, SyncStatus};
