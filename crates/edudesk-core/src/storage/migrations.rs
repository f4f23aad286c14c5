//! Database schema migrations for the local snapshot.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: one table per entity, master values, kv.
///
/// `position` keeps collection order across a save/load cycle.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            position    INTEGER NOT NULL,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL,
            password    TEXT,
            role        TEXT NOT NULL,
            department  TEXT,
            phone       TEXT
        );

        CREATE TABLE IF NOT EXISTS students (
            id              TEXT PRIMARY KEY,
            position        INTEGER NOT NULL,
            vano            TEXT NOT NULL DEFAULT '',
            register_number TEXT NOT NULL DEFAULT '',
            name            TEXT NOT NULL,
            department      TEXT NOT NULL DEFAULT '',
            year            TEXT NOT NULL DEFAULT '',
            batch           TEXT NOT NULL DEFAULT '',
            section         TEXT NOT NULL DEFAULT 'A'
        );

        CREATE TABLE IF NOT EXISTS timetable (
            id          TEXT PRIMARY KEY,
            position    INTEGER NOT NULL,
            day         TEXT NOT NULL,
            hour        INTEGER NOT NULL,
            class_id    TEXT NOT NULL,
            subject     TEXT NOT NULL DEFAULT '',
            staff_id    TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS attendance (
            id          TEXT PRIMARY KEY,
            position    INTEGER NOT NULL,
            date        TEXT NOT NULL,
            hour        INTEGER NOT NULL,
            student_id  TEXT NOT NULL,
            status      TEXT NOT NULL,
            marked_by   TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS holidays (
            id          TEXT PRIMARY KEY,
            position    INTEGER NOT NULL,
            date        TEXT NOT NULL,
            name        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS master_values (
            kind        TEXT NOT NULL,
            position    INTEGER NOT NULL,
            value       TEXT NOT NULL,
            PRIMARY KEY (kind, position)
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for the date-driven report queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);
         CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id);
         CREATE INDEX IF NOT EXISTS idx_holidays_date ON holidays(date);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: entity tables keyed by `position`.
///
/// Ids are opaque and sheets may repeat them (or leave them blank), so the
/// snapshot must hold whatever the store holds.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE users_v3 (
            position    INTEGER PRIMARY KEY,
            id          TEXT NOT NULL,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL,
            password    TEXT,
            role        TEXT NOT NULL,
            department  TEXT,
            phone       TEXT
        );
        INSERT INTO users_v3 (position, id, name, email, password, role, department, phone)
            SELECT position, id, name, email, password, role, department, phone FROM users;
        DROP TABLE users;
        ALTER TABLE users_v3 RENAME TO users;

        CREATE TABLE students_v3 (
            position        INTEGER PRIMARY KEY,
            id              TEXT NOT NULL,
            vano            TEXT NOT NULL DEFAULT '',
            register_number TEXT NOT NULL DEFAULT '',
            name            TEXT NOT NULL,
            department      TEXT NOT NULL DEFAULT '',
            year            TEXT NOT NULL DEFAULT '',
            batch           TEXT NOT NULL DEFAULT '',
            section         TEXT NOT NULL DEFAULT 'A'
        );
        INSERT INTO students_v3 (position, id, vano, register_number, name, department, year, batch, section)
            SELECT position, id, vano, register_number, name, department, year, batch, section FROM students;
        DROP TABLE students;
        ALTER TABLE students_v3 RENAME TO students;

        CREATE TABLE timetable_v3 (
            position    INTEGER PRIMARY KEY,
            id          TEXT NOT NULL,
            day         TEXT NOT NULL,
            hour        INTEGER NOT NULL,
            class_id    TEXT NOT NULL,
            subject     TEXT NOT NULL DEFAULT '',
            staff_id    TEXT NOT NULL DEFAULT ''
        );
        INSERT INTO timetable_v3 (position, id, day, hour, class_id, subject, staff_id)
            SELECT position, id, day, hour, class_id, subject, staff_id FROM timetable;
        DROP TABLE timetable;
        ALTER TABLE timetable_v3 RENAME TO timetable;

        CREATE TABLE attendance_v3 (
            position    INTEGER PRIMARY KEY,
            id          TEXT NOT NULL,
            date        TEXT NOT NULL,
            hour        INTEGER NOT NULL,
            student_id  TEXT NOT NULL,
            status      TEXT NOT NULL,
            marked_by   TEXT NOT NULL DEFAULT ''
        );
        INSERT INTO attendance_v3 (position, id, date, hour, student_id, status, marked_by)
            SELECT position, id, date, hour, student_id, status, marked_by FROM attendance;
        DROP TABLE attendance;
        ALTER TABLE attendance_v3 RENAME TO attendance;

        CREATE TABLE holidays_v3 (
            position    INTEGER PRIMARY KEY,
            id          TEXT NOT NULL,
            date        TEXT NOT NULL,
            name        TEXT NOT NULL
        );
        INSERT INTO holidays_v3 (position, id, date, name)
            SELECT position, id, date, name FROM holidays;
        DROP TABLE holidays;
        ALTER TABLE holidays_v3 RENAME TO holidays;

        CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date);
        CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id);
        CREATE INDEX IF NOT EXISTS idx_holidays_date ON holidays(date);",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
