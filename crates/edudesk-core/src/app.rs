//! Entry-point wiring: configuration, local snapshot and the shared store.
//!
//! Binaries build one [`App`], hand its store to whatever needs it, and
//! call [`App::persist`] before exiting.

use std::path::Path;
use std::sync::Arc;

use crate::error::CoreError;
use crate::integrations::GoogleAuth;
use crate::sheets::SheetsClient;
use crate::storage::{Config, Database};
use crate::store::{lock_store, EntityStore, SharedStore};
use crate::sync::{SyncEngine, SyncHandle, SyncScheduler};

pub struct App {
    pub config: Config,
    db: Database,
    store: SharedStore,
    persisted_revision: u64,
}

impl App {
    /// Open the default data directory.
    pub fn open() -> Result<Self, CoreError> {
        let config = Config::load()?;
        let db = Database::open()?;
        Self::from_parts(config, db)
    }

    /// Open a specific config file and database file.
    pub fn open_at(config_path: &Path, db_path: &Path) -> Result<Self, CoreError> {
        let config = Config::load_from(config_path)?;
        let db = Database::open_at(db_path)?;
        Self::from_parts(config, db)
    }

    /// Restore the last snapshot, or seed defaults on first run.
    pub fn from_parts(config: Config, db: Database) -> Result<Self, CoreError> {
        let store = match db.load_snapshot()? {
            Some(snapshot) => {
                tracing::debug!(users = snapshot.users.len(), students = snapshot.students.len(), "snapshot restored");
                EntityStore::from_snapshot(snapshot)
            }
            None => {
                tracing::info!("no local snapshot; starting from defaults");
                EntityStore::with_defaults()
            }
        };
        let persisted_revision = store.revision();
        Ok(Self {
            config,
            db,
            store: store.into_shared(),
            persisted_revision,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Write the snapshot if anything changed since the last write.
    ///
    /// Returns whether a write happened.
    pub fn persist(&mut self) -> Result<bool, CoreError> {
        let (snapshot, revision) = {
            let guard = lock_store(&self.store);
            if guard.revision() == self.persisted_revision {
                return Ok(false);
            }
            (guard.snapshot(), guard.revision())
        };
        self.db.save_snapshot(&snapshot)?;
        self.persisted_revision = revision;
        tracing::debug!(revision, "snapshot persisted");
        Ok(true)
    }

    pub fn google_auth(&self) -> GoogleAuth {
        GoogleAuth::new(&self.config.sheets.client_id, &self.config.sheets.client_secret)
    }

    /// Sheets client for the configured spreadsheet, initialised but not signed in.
    pub fn sheets_client(&self) -> Result<Arc<SheetsClient>, CoreError> {
        let client = SheetsClient::new(self.config.sheets.clone());
        client.init_client()?;
        Ok(Arc::new(client))
    }

    /// Start the auto-save scheduler against `client`.
    pub fn start_scheduler(
        &self,
        client: Arc<SheetsClient>,
    ) -> (SyncHandle, tokio::task::JoinHandle<()>) {
        SyncScheduler::spawn(
            self.store.clone(),
            SyncEngine::new(client),
            self.config.sync.settings(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Holiday;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_seeds_defaults_and_persists() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        let db_path = dir.path().join("edudesk.db");

        let mut app = App::open_at(&config_path, &db_path).unwrap();
        assert_eq!(lock_store(app.store()).users().len(), 1);
        assert!(!app.persist().unwrap(), "nothing changed yet");

        lock_store(app.store()).upsert_holiday(Holiday {
            id: "h1".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 26).unwrap(),
            name: "Republic Day".into(),
        });
        assert!(app.persist().unwrap());
        assert!(!app.persist().unwrap());
        drop(app);

        let reopened = App::open_at(&config_path, &db_path).unwrap();
        let store = lock_store(reopened.store());
        assert_eq!(store.holidays().len(), 1);
        assert_eq!(store.users()[0].email, "admin@edu.com");
    }

    #[test]
    fn test_sheets_client_needs_config() {
        let dir = TempDir::new().unwrap();
        let app = App::open_at(&dir.path().join("config.toml"), &dir.path().join("edudesk.db")).unwrap();
        assert!(matches!(app.sheets_client(), Err(CoreError::Sync(_))));
    }
}
