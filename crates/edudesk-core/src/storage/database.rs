//! SQLite-backed local snapshot.
//!
//! Persists every collection of the [`EntityStore`](crate::store::EntityStore)
//! between CLI invocations, plus a small key-value table for application
//! state (last sync times).

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use super::migrations;
use crate::error::{CoreError, DatabaseError};
use crate::model::{
    AttendanceRecord, AttendanceStatus, Holiday, MasterData, MasterKind, Role, Student,
    TimetableEntry, User,
};
use crate::store::StoreSnapshot;

const DB_FILE: &str = "edudesk.db";
const SAVED_AT_KEY: &str = "snapshot_saved_at";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database holding the local snapshot.
pub struct Database {
    conn: Connection,
}

fn corrupt(table: &str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: table.to_string(),
        message: message.into(),
    }
}

fn parse_date(table: &str, raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| corrupt(table, format!("bad date '{raw}': {e}")))
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open `edudesk.db` in the data directory.
    ///
    /// # Errors
    /// Returns an error if the directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let dir = data_dir()?;
        Ok(Self::open_at(&dir.join(DB_FILE))?)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Persist a snapshot, replacing whatever was stored.
    pub fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM users;
             DELETE FROM students;
             DELETE FROM timetable;
             DELETE FROM attendance;
             DELETE FROM holidays;
             DELETE FROM master_values;",
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO users (id, position, name, email, password, role, department, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (i, u) in snapshot.users.iter().enumerate() {
                stmt.execute(params![
                    u.id,
                    i as i64,
                    u.name,
                    u.email,
                    u.password,
                    u.role.as_str(),
                    u.department,
                    u.phone,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO students (id, position, vano, register_number, name, department, year, batch, section)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (i, s) in snapshot.students.iter().enumerate() {
                stmt.execute(params![
                    s.id,
                    i as i64,
                    s.vano,
                    s.register_number,
                    s.name,
                    s.department,
                    s.year,
                    s.batch,
                    s.section,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO timetable (id, position, day, hour, class_id, subject, staff_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (i, t) in snapshot.timetable.iter().enumerate() {
                stmt.execute(params![
                    t.id, i as i64, t.day, t.hour, t.class_id, t.subject, t.staff_id,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO attendance (id, position, date, hour, student_id, status, marked_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (i, a) in snapshot.attendance.iter().enumerate() {
                stmt.execute(params![
                    a.id,
                    i as i64,
                    a.date.format(DATE_FORMAT).to_string(),
                    a.hour,
                    a.student_id,
                    a.status.as_str(),
                    a.marked_by,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO holidays (id, position, date, name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, h) in snapshot.holidays.iter().enumerate() {
                stmt.execute(params![
                    h.id,
                    i as i64,
                    h.date.format(DATE_FORMAT).to_string(),
                    h.name,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO master_values (kind, position, value) VALUES (?1, ?2, ?3)",
            )?;
            for kind in MasterKind::ALL {
                for (i, value) in snapshot.master.list(kind).iter().enumerate() {
                    stmt.execute(params![kind.code(), i as i64, value])?;
                }
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![SAVED_AT_KEY, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load the stored snapshot. `None` until one has been saved.
    pub fn load_snapshot(&self) -> Result<Option<StoreSnapshot>, DatabaseError> {
        if self.kv_get(SAVED_AT_KEY)?.is_none() {
            return Ok(None);
        }

        let users = self.query_rows(
            "SELECT id, name, email, password, role, department, phone FROM users ORDER BY position",
            |row| {
                let role: String = row.get(4)?;
                Ok((
                    User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        password: row.get(3)?,
                        role: Role::Staff,
                        department: row.get(5)?,
                        phone: row.get(6)?,
                    },
                    role,
                ))
            },
        )?;
        let users = users
            .into_iter()
            .map(|(mut user, role)| {
                user.role = Role::from_str(&role).map_err(|e| corrupt("users", e.to_string()))?;
                Ok(user)
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let students = self.query_rows(
            "SELECT id, vano, register_number, name, department, year, batch, section
             FROM students ORDER BY position",
            |row| {
                Ok(Student {
                    id: row.get(0)?,
                    vano: row.get(1)?,
                    register_number: row.get(2)?,
                    name: row.get(3)?,
                    department: row.get(4)?,
                    year: row.get(5)?,
                    batch: row.get(6)?,
                    section: row.get(7)?,
                })
            },
        )?;

        let timetable = self.query_rows(
            "SELECT id, day, hour, class_id, subject, staff_id FROM timetable ORDER BY position",
            |row| {
                Ok(TimetableEntry {
                    id: row.get(0)?,
                    day: row.get(1)?,
                    hour: row.get(2)?,
                    class_id: row.get(3)?,
                    subject: row.get(4)?,
                    staff_id: row.get(5)?,
                })
            },
        )?;

        let attendance = self
            .query_rows(
                "SELECT id, date, hour, student_id, status, marked_by FROM attendance ORDER BY position",
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u8>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )?
            .into_iter()
            .map(|(id, date, hour, student_id, status, marked_by)| {
                Ok(AttendanceRecord {
                    id,
                    date: parse_date("attendance", &date)?,
                    hour,
                    student_id,
                    status: AttendanceStatus::from_str(&status)
                        .map_err(|e| corrupt("attendance", e.to_string()))?,
                    marked_by,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let holidays = self
            .query_rows(
                "SELECT id, date, name FROM holidays ORDER BY position",
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )?
            .into_iter()
            .map(|(id, date, name)| {
                Ok(Holiday {
                    id,
                    date: parse_date("holidays", &date)?,
                    name,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let mut master = MasterData::empty();
        let values = self.query_rows(
            "SELECT kind, value FROM master_values ORDER BY kind, position",
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        for (code, value) in values {
            match MasterKind::from_code(&code) {
                Some(kind) => master.list_mut(kind).push(value),
                None => tracing::warn!(%code, "ignoring master value of unknown kind"),
            }
        }

        Ok(Some(StoreSnapshot {
            users,
            students,
            timetable,
            attendance,
            holidays,
            master,
        }))
    }

    /// When the snapshot was last written.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        Ok(self
            .kv_get(SAVED_AT_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn query_rows<T, F>(&self, sql: &str, f: F) -> Result<Vec<T>, DatabaseError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], f)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
