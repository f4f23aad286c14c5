//! In-process spreadsheet.
//!
//! Behaves like the Sheets API for the range shapes the sync engine uses:
//! reads and clears start at the range's first row, writes overwrite from
//! it, and ranges naming an absent sheet fail with `MissingTable`. Test
//! double for the sync engine and scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{sheet_of, start_row, RemoteTable, Rows};
use crate::sync::SyncError;

#[derive(Debug, Default)]
struct Inner {
    sheets: HashMap<String, Rows>,
    failing: HashSet<String>,
    reads: usize,
    writes: usize,
    clears: usize,
}

/// Call counters, for asserting how many passes hit the remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub reads: usize,
    pub writes: usize,
    pub clears: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTables {
    ready: AtomicBool,
    inner: Mutex<Inner>,
}

impl MemoryTables {
    /// A ready spreadsheet with the given empty sheets.
    pub fn with_sheets<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let tables = Self::default();
        tables.set_ready(true);
        {
            let mut inner = tables.lock();
            for name in names {
                inner.sheets.insert(name.to_string(), Vec::new());
            }
        }
        tables
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn add_sheet(&self, name: &str) {
        self.lock().sheets.entry(name.to_string()).or_default();
    }

    pub fn remove_sheet(&self, name: &str) {
        self.lock().sheets.remove(name);
    }

    /// Make every call touching `sheet` fail with `RemoteUnavailable`.
    pub fn fail_sheet(&self, sheet: &str, failing: bool) {
        let mut inner = self.lock();
        if failing {
            inner.failing.insert(sheet.to_string());
        } else {
            inner.failing.remove(sheet);
        }
    }

    /// Replace a sheet's full contents, header row included.
    pub fn put_rows(&self, sheet: &str, rows: Rows) {
        self.lock().sheets.insert(sheet.to_string(), rows);
    }

    /// Full contents of a sheet, header row included.
    pub fn rows(&self, sheet: &str) -> Option<Rows> {
        self.lock().sheets.get(sheet).cloned()
    }

    pub fn counts(&self) -> CallCounts {
        let inner = self.lock();
        CallCounts {
            reads: inner.reads,
            writes: inner.writes,
            clears: inner.clears,
        }
    }

    fn check(&self, inner: &Inner, range: &str) -> Result<(), SyncError> {
        if !self.is_ready() {
            return Err(SyncError::NotReady);
        }
        let sheet = sheet_of(range);
        if inner.failing.contains(sheet) {
            return Err(SyncError::RemoteUnavailable(format!("{sheet} is unreachable")));
        }
        if !inner.sheets.contains_key(sheet) {
            return Err(SyncError::MissingTable(sheet.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTable for MemoryTables {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn read(&self, range: &str) -> Result<Rows, SyncError> {
        let mut inner = self.lock();
        self.check(&inner, range)?;
        inner.reads += 1;
        let skip = start_row(range) - 1;
        let rows = inner
            .sheets
            .get(sheet_of(range))
            .map(|rows| rows.iter().skip(skip).cloned().collect::<Rows>())
            .unwrap_or_default();
        // The API drops trailing empty rows.
        let end = rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map_or(0, |i| i + 1);
        Ok(rows.into_iter().take(end).collect())
    }

    async fn clear(&self, range: &str) -> Result<(), SyncError> {
        let mut inner = self.lock();
        self.check(&inner, range)?;
        inner.clears += 1;
        let keep = start_row(range) - 1;
        if let Some(rows) = inner.sheets.get_mut(sheet_of(range)) {
            rows.truncate(keep);
        }
        Ok(())
    }

    async fn write(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        let mut inner = self.lock();
        self.check(&inner, range)?;
        inner.writes += 1;
        let offset = start_row(range) - 1;
        if let Some(sheet) = inner.sheets.get_mut(sheet_of(range)) {
            if sheet.len() < offset + rows.len() {
                sheet.resize(offset + rows.len(), Vec::new());
            }
            for (i, row) in rows.iter().enumerate() {
                sheet[offset + i] = row.clone();
            }
        }
        Ok(())
    }
}
