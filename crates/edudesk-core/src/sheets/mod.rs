//! Remote tabular store.
//!
//! A [`RemoteTable`] moves rows of cells in and out of named A1 ranges
//! (`Users!A2:G`). It never interprets the rows; that is the job of
//! [`crate::sync::row_codec`].

mod client;
mod memory;

pub use client::{Handshake, SheetsClient};
pub use memory::MemoryTables;

use async_trait::async_trait;

use crate::sync::SyncError;

/// Rows as returned by the remote, one `Vec` of cells per row.
pub type Rows = Vec<Vec<String>>;

#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Whether calls can currently reach the remote. When false every call
    /// fails with [`SyncError::NotReady`] without touching the network.
    fn is_ready(&self) -> bool;

    async fn read(&self, range: &str) -> Result<Rows, SyncError>;

    async fn clear(&self, range: &str) -> Result<(), SyncError>;

    async fn write(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError>;
}

/// Sheet name of an A1 range (`Users!A2:G` -> `Users`).
pub fn sheet_of(range: &str) -> &str {
    range.split_once('!').map_or(range, |(sheet, _)| sheet)
}

/// 1-based first row of an A1 range. Whole-column ranges start at row 1.
pub fn start_row(range: &str) -> usize {
    let cells = range.split_once('!').map_or("", |(_, cells)| cells);
    let first = cells.split(':').next().unwrap_or_default();
    let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok().filter(|row| *row > 0).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_of() {
        assert_eq!(sheet_of("Users!A2:G"), "Users");
        assert_eq!(sheet_of("Master"), "Master");
    }

    #[test]
    fn test_start_row() {
        assert_eq!(start_row("Users!A2:G"), 2);
        assert_eq!(start_row("Users!A:G"), 1);
        assert_eq!(start_row("Users!A1"), 1);
        assert_eq!(start_row("Attendance!B15:F"), 15);
        assert_eq!(start_row("Users"), 1);
    }
}
