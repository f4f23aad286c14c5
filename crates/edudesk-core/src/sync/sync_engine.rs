//! Whole-table load and save passes.
//!
//! A save clears and rewrites each remote table from a snapshot of the
//! store. A load reads each table and replaces the matching local
//! collection. Tables are independent: one failure is logged and recorded
//! in the [`PassReport`] while the rest of the pass continues.

use std::sync::Arc;

use crate::sheets::RemoteTable;
use crate::store::{lock_store, Collection, SharedStore};
use crate::sync::row_codec::{self, TableLayout};
use crate::sync::types::{PassReport, SyncError};

/// Runs passes against one remote.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn RemoteTable>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteTable>) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteTable> {
        &self.remote
    }

    /// Clear and rewrite every table in sync order.
    pub async fn save_all(&self, store: &SharedStore) -> PassReport {
        let (snapshot, revision) = {
            let guard = lock_store(store);
            (guard.snapshot(), guard.revision())
        };

        let mut report = PassReport {
            revision,
            ..PassReport::default()
        };
        for collection in Collection::SYNC_ORDER {
            let layout = row_codec::layout(collection);
            let rows = row_codec::encode_table(collection, &snapshot);
            match self.save_table(layout, &rows).await {
                Ok(()) => {
                    tracing::debug!(table = %collection, rows = rows.len() - 1, "table saved");
                    report.succeeded.push(collection);
                }
                Err(SyncError::MissingTable(_)) if collection == Collection::Master => {
                    tracing::debug!("no Master sheet; skipping master data");
                    report.skipped.push(collection);
                }
                Err(e) => {
                    tracing::warn!(table = %collection, error = %e, "table save failed");
                    report.failed.push((collection, e.to_string()));
                }
            }
        }

        if report.is_clean() {
            let mut guard = lock_store(store);
            if guard.revision() == revision {
                guard.mark_clean();
            }
        }
        report
    }

    async fn save_table(&self, layout: &TableLayout, rows: &[Vec<String>]) -> Result<(), SyncError> {
        self.remote.clear(layout.clear_range).await?;
        self.remote.write(layout.write_range, rows).await
    }

    /// Read every table and replace local collections that came back
    /// non-empty. Missing or empty tables leave local data untouched.
    pub async fn load_all(&self, store: &SharedStore) -> PassReport {
        let mut report = PassReport::default();
        for collection in Collection::SYNC_ORDER {
            let layout = row_codec::layout(collection);
            match self.remote.read(layout.read_range).await {
                Ok(rows) => {
                    let decoded = row_codec::decode_table(collection, &rows);
                    let applied = {
                        let mut guard = lock_store(store);
                        row_codec::apply(&mut guard, decoded)
                    };
                    if applied {
                        tracing::debug!(table = %collection, rows = rows.len(), "table loaded");
                        report.succeeded.push(collection);
                    } else {
                        tracing::debug!(table = %collection, "remote table empty; keeping local data");
                        report.skipped.push(collection);
                    }
                }
                Err(SyncError::MissingTable(name)) => {
                    if collection == Collection::Master {
                        tracing::debug!("no Master sheet; keeping local master data");
                    } else {
                        tracing::info!(sheet = %name, "remote sheet missing; keeping local data");
                    }
                    report.skipped.push(collection);
                }
                Err(e) => {
                    tracing::warn!(table = %collection, error = %e, "table load failed");
                    report.failed.push((collection, e.to_string()));
                }
            }
        }

        let mut guard = lock_store(store);
        if report.is_clean() {
            guard.mark_clean();
        }
        report.revision = guard.revision();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Holiday, MasterKind};
    use crate::sheets::MemoryTables;
    use crate::store::EntityStore;
    use chrono::NaiveDate;

    const ALL_SHEETS: [&str; 6] = ["Users", "Students", "Attendance", "Timetable", "Holidays", "Master"];

    fn holiday(id: &str, name: &str) -> Holiday {
        Holiday {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn test_save_writes_every_table() {
        let tables = Arc::new(MemoryTables::with_sheets(ALL_SHEETS));
        let engine = SyncEngine::new(tables.clone());
        let store = EntityStore::with_defaults().into_shared();
        lock_store(&store).upsert_holiday(holiday("h1", "Independence Day"));

        let report = engine.save_all(&store).await;
        assert!(report.is_clean());
        assert_eq!(report.succeeded, Collection::SYNC_ORDER.to_vec());
        assert_eq!(tables.counts().clears, 6);
        assert_eq!(tables.counts().writes, 6);

        let holidays = tables.rows("Holidays").unwrap();
        assert_eq!(holidays[0], vec!["ID", "Date", "Name"]);
        assert_eq!(holidays[1], vec!["h1", "2024-08-15", "Independence Day"]);
        assert!(!lock_store(&store).is_dirty());
    }

    #[tokio::test]
    async fn test_one_failing_table_does_not_abort_save() {
        let tables = Arc::new(MemoryTables::with_sheets(ALL_SHEETS));
        tables.fail_sheet("Students", true);
        let engine = SyncEngine::new(tables.clone());
        let store = EntityStore::with_defaults().into_shared();

        let report = engine.save_all(&store).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, Collection::Students);
        assert_eq!(report.succeeded.len(), 5);
        assert!(tables.rows("Holidays").unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_missing_master_sheet_is_skipped_quietly() {
        let tables = Arc::new(MemoryTables::with_sheets(["Users", "Students", "Attendance", "Timetable", "Holidays"]));
        let engine = SyncEngine::new(tables);
        let store = EntityStore::with_defaults().into_shared();

        let saved = engine.save_all(&store).await;
        assert!(saved.is_clean());
        assert_eq!(saved.skipped, vec![Collection::Master]);

        let loaded = engine.load_all(&store).await;
        assert!(loaded.is_clean());
        assert!(loaded.skipped.contains(&Collection::Master));
        assert_eq!(lock_store(&store).master_list(MasterKind::Department).len(), 5);
    }

    #[tokio::test]
    async fn test_load_replaces_only_non_empty_tables() {
        let tables = Arc::new(MemoryTables::with_sheets(ALL_SHEETS));
        tables.put_rows(
            "Holidays",
            vec![
                vec!["ID".into(), "Date".into(), "Name".into()],
                vec!["h9".into(), "2024-10-02".into(), "Gandhi Jayanti".into()],
            ],
        );
        tables.put_rows(
            "Master",
            vec![
                vec!["Type".into(), "Value".into()],
                vec!["DEPT".into(), "AI".into()],
            ],
        );
        let engine = SyncEngine::new(tables);
        let store = EntityStore::with_defaults().into_shared();
        lock_store(&store).upsert_holiday(holiday("h1", "Independence Day"));

        let report = engine.load_all(&store).await;
        assert!(report.is_clean());
        assert_eq!(report.succeeded, vec![Collection::Holidays, Collection::Master]);

        let guard = lock_store(&store);
        assert_eq!(guard.holidays().len(), 1);
        assert_eq!(guard.holidays()[0].id, "h9");
        assert_eq!(guard.users().len(), 1, "empty Users sheet keeps local users");
        assert_eq!(guard.master_list(MasterKind::Department), ["AI".to_string()]);
        assert_eq!(guard.master_list(MasterKind::Year).len(), 4);
        assert_eq!(report.revision, guard.revision());
        assert!(!guard.is_dirty());
    }

    #[tokio::test]
    async fn test_not_ready_remote_fails_every_table() {
        let tables = Arc::new(MemoryTables::with_sheets(ALL_SHEETS));
        tables.set_ready(false);
        let engine = SyncEngine::new(tables.clone());
        let store = EntityStore::with_defaults().into_shared();

        let report = engine.save_all(&store).await;
        assert_eq!(report.failed.len(), 6);
        assert_eq!(tables.counts().writes, 0);
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let tables = Arc::new(MemoryTables::with_sheets(ALL_SHEETS));
        let engine = SyncEngine::new(tables);
        let source = EntityStore::with_defaults().into_shared();
        lock_store(&source).upsert_holiday(holiday("h1", "Independence Day"));
        engine.save_all(&source).await;

        let target = EntityStore::new().into_shared();
        engine.load_all(&target).await;
        assert_eq!(lock_store(&target).snapshot(), lock_store(&source).snapshot());
    }
}
