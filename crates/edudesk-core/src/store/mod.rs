//! In-memory entity store.
//!
//! The store owns every collection. Each mutating call bumps a revision
//! counter, marks the store dirty and publishes a [`StoreChange`] on a
//! broadcast channel. The sync scheduler subscribes to that channel; nothing
//! in the store knows about the remote side.
//!
//! Upserts never fail. Users and holidays are keyed by id, timetable entries
//! by (day, hour, class_id) and attendance by (date, student_id, hour); the
//! newest write wins in every case.

mod import;

#[cfg(test)]
mod store_tests;

pub use import::parse_student_csv;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{
    AttendanceRecord, Holiday, MasterData, MasterKind, Role, Student, TimetableEntry, User,
};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Logical table affected by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Users,
    Students,
    Attendance,
    Timetable,
    Holidays,
    Master,
}

impl Collection {
    /// Order in which a save pass writes the remote tables.
    pub const SYNC_ORDER: [Collection; 6] = [
        Collection::Users,
        Collection::Students,
        Collection::Attendance,
        Collection::Timetable,
        Collection::Holidays,
        Collection::Master,
    ];

    /// Remote sheet name.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "Users",
            Collection::Students => "Students",
            Collection::Attendance => "Attendance",
            Collection::Timetable => "Timetable",
            Collection::Holidays => "Holidays",
            Collection::Master => "Master",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Published after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    pub revision: u64,
}

/// Plain copy of every collection, detached from the change channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub users: Vec<User>,
    pub students: Vec<Student>,
    pub timetable: Vec<TimetableEntry>,
    pub attendance: Vec<AttendanceRecord>,
    pub holidays: Vec<Holiday>,
    pub master: MasterData,
}

/// Store shared between the entry point, the CLI shell and the scheduler.
pub type SharedStore = Arc<Mutex<EntityStore>>;

/// Lock a shared store. A poisoned lock still yields the data; the store
/// holds no invariants that a panicking writer could leave half-applied
/// across collections.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, EntityStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct EntityStore {
    pub(crate) users: Vec<User>,
    pub(crate) students: Vec<Student>,
    pub(crate) timetable: Vec<TimetableEntry>,
    pub(crate) attendance: Vec<AttendanceRecord>,
    pub(crate) holidays: Vec<Holiday>,
    pub(crate) master: MasterData,
    revision: u64,
    dirty: bool,
    changes: broadcast::Sender<StoreChange>,
}

impl EntityStore {
    /// Empty store with empty master lists.
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot {
            users: Vec::new(),
            students: Vec::new(),
            timetable: Vec::new(),
            attendance: Vec::new(),
            holidays: Vec::new(),
            master: MasterData::empty(),
        })
    }

    /// Store seeded with the default master lists and one administrator.
    pub fn with_defaults() -> Self {
        Self::from_snapshot(StoreSnapshot {
            users: vec![User {
                id: "1".into(),
                name: "Admin User".into(),
                email: "admin@edu.com".into(),
                password: Some("admin".into()),
                role: Role::Admin,
                department: None,
                phone: None,
            }],
            students: Vec::new(),
            timetable: Vec::new(),
            attendance: Vec::new(),
            holidays: Vec::new(),
            master: MasterData::default(),
        })
    }

    /// Build a clean store (revision 0, not dirty) from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            users: snapshot.users,
            students: snapshot.students,
            timetable: snapshot.timetable,
            attendance: snapshot.attendance,
            holidays: snapshot.holidays,
            master: snapshot.master,
            revision: 0,
            dirty: false,
            changes,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // ── Change tracking ──────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn touch(&mut self, collection: Collection) {
        self.revision += 1;
        self.dirty = true;
        // No subscribers is fine: the store works without a scheduler.
        let _ = self.changes.send(StoreChange {
            collection,
            revision: self.revision,
        });
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            users: self.users.clone(),
            students: self.students.clone(),
            timetable: self.timetable.clone(),
            attendance: self.attendance.clone(),
            holidays: self.holidays.clone(),
            master: self.master.clone(),
        }
    }

    /// Replace every collection, publishing one change per collection.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.replace_users(snapshot.users);
        self.replace_students(snapshot.students);
        self.replace_attendance(snapshot.attendance);
        self.replace_timetable(snapshot.timetable);
        self.replace_holidays(snapshot.holidays);
        self.master = snapshot.master;
        self.touch(Collection::Master);
    }

    // ── Users ────────────────────────────────────────────────────────

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users.iter().find(|u| u.email == email)
    }

    /// Replace the user with the same id, or append.
    pub fn upsert_user(&mut self, user: User) {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
        self.touch(Collection::Users);
    }

    /// Edit an existing user in place. An absent or empty password keeps
    /// the stored one. Returns `false` when the id is unknown.
    pub fn update_user(&mut self, mut user: User) -> bool {
        let Some(existing) = self.users.iter_mut().find(|u| u.id == user.id) else {
            return false;
        };
        if user.password.as_deref().map_or(true, str::is_empty) {
            user.password = existing.password.take();
        }
        *existing = user;
        self.touch(Collection::Users);
        true
    }

    pub fn remove_user(&mut self, id: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.id != id);
        let removed = self.users.len() != before;
        if removed {
            self.touch(Collection::Users);
        }
        removed
    }

    pub fn replace_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.touch(Collection::Users);
    }

    // ── Students ─────────────────────────────────────────────────────

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn find_student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Append a student whose id is unseen. Existing students are never
    /// overwritten; returns `false` in that case.
    pub fn upsert_student(&mut self, student: Student) -> bool {
        if self.students.iter().any(|s| s.id == student.id) {
            return false;
        }
        self.students.push(student);
        self.touch(Collection::Students);
        true
    }

    /// Bulk append. Returns how many students were new.
    pub fn add_students(&mut self, students: Vec<Student>) -> usize {
        let mut added = 0;
        for student in students {
            if self.students.iter().any(|s| s.id == student.id) {
                continue;
            }
            self.students.push(student);
            added += 1;
        }
        if added > 0 {
            self.touch(Collection::Students);
        }
        added
    }

    pub fn remove_student(&mut self, id: &str) -> bool {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        let removed = self.students.len() != before;
        if removed {
            self.touch(Collection::Students);
        }
        removed
    }

    pub fn replace_students(&mut self, students: Vec<Student>) {
        self.students = students;
        self.touch(Collection::Students);
    }

    // ── Timetable ────────────────────────────────────────────────────

    pub fn timetable(&self) -> &[TimetableEntry] {
        &self.timetable
    }

    pub fn slot(&self, day: &str, hour: u8, class_id: &str) -> Option<&TimetableEntry> {
        self.timetable
            .iter()
            .find(|t| t.day == day && t.hour == hour && t.class_id == class_id)
    }

    /// Drop whatever occupies the same (day, hour, class_id) and append.
    pub fn upsert_timetable(&mut self, entry: TimetableEntry) {
        self.timetable.retain(|t| !t.slot_matches(&entry));
        self.timetable.push(entry);
        self.touch(Collection::Timetable);
    }

    pub fn remove_timetable(&mut self, id: &str) -> bool {
        let before = self.timetable.len();
        self.timetable.retain(|t| t.id != id);
        let removed = self.timetable.len() != before;
        if removed {
            self.touch(Collection::Timetable);
        }
        removed
    }

    pub fn replace_timetable(&mut self, entries: Vec<TimetableEntry>) {
        self.timetable = entries;
        self.touch(Collection::Timetable);
    }

    // ── Attendance ───────────────────────────────────────────────────

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn attendance_for(
        &self,
        student_id: &str,
        date: NaiveDate,
        hour: u8,
    ) -> Option<&AttendanceRecord> {
        self.attendance
            .iter()
            .find(|a| a.student_id == student_id && a.date == date && a.hour == hour)
    }

    /// Drop whatever exists for the same (date, student_id, hour) and append.
    pub fn upsert_attendance(&mut self, record: AttendanceRecord) {
        self.attendance.retain(|a| !a.key_matches(&record));
        self.attendance.push(record);
        self.touch(Collection::Attendance);
    }

    pub fn remove_attendance(&mut self, id: &str) -> bool {
        let before = self.attendance.len();
        self.attendance.retain(|a| a.id != id);
        let removed = self.attendance.len() != before;
        if removed {
            self.touch(Collection::Attendance);
        }
        removed
    }

    pub fn replace_attendance(&mut self, records: Vec<AttendanceRecord>) {
        self.attendance = records;
        self.touch(Collection::Attendance);
    }

    // ── Holidays ─────────────────────────────────────────────────────

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    pub fn holiday_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.date == date)
    }

    pub fn upsert_holiday(&mut self, holiday: Holiday) {
        match self.holidays.iter_mut().find(|h| h.id == holiday.id) {
            Some(existing) => *existing = holiday,
            None => self.holidays.push(holiday),
        }
        self.touch(Collection::Holidays);
    }

    pub fn remove_holiday(&mut self, id: &str) -> bool {
        let before = self.holidays.len();
        self.holidays.retain(|h| h.id != id);
        let removed = self.holidays.len() != before;
        if removed {
            self.touch(Collection::Holidays);
        }
        removed
    }

    pub fn replace_holidays(&mut self, holidays: Vec<Holiday>) {
        self.holidays = holidays;
        self.touch(Collection::Holidays);
    }

    // ── Master data ──────────────────────────────────────────────────
    //
    // Add/rename/remove with cascades live in `crate::reconcile`.

    pub fn master(&self) -> &MasterData {
        &self.master
    }

    pub fn master_list(&self, kind: MasterKind) -> &[String] {
        self.master.list(kind)
    }

    /// Overwrite one list wholesale (used when loading from the remote).
    pub fn replace_master_list(&mut self, kind: MasterKind, values: Vec<String>) {
        *self.master.list_mut(kind) = values;
        self.touch(Collection::Master);
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
