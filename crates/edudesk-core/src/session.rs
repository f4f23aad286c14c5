//! Signed-in user and the guarded write paths that depend on it.
//!
//! The store accepts any mutation. Rules that belong to the desk rather
//! than to the data live here: holiday closure, hour range, admin-only
//! timetable edits and user form defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{
    new_id, AttendanceRecord, AttendanceStatus, MasterKind, Role, Student, TimetableEntry, User,
    HOURS_PER_DAY,
};
use crate::store::EntityStore;

/// `marked_by` value when nobody is signed in.
pub const UNKNOWN_MARKER: &str = "Unknown";

fn check_hour(hour: u8) -> Result<(), ValidationError> {
    if (1..=HOURS_PER_DAY).contains(&hour) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "hour".into(),
            value: i64::from(hour),
            min: 1,
            max: i64::from(HOURS_PER_DAY),
        })
    }
}

/// Record one attendance mark.
///
/// Rejects holidays and hours outside the teaching day, then replaces any
/// earlier mark for the same (date, student, hour).
pub fn mark_attendance(store: &mut EntityStore, record: AttendanceRecord) -> Result<(), ValidationError> {
    if let Some(holiday) = store.holiday_on(record.date) {
        return Err(ValidationError::Holiday {
            date: record.date,
            name: holiday.name.clone(),
        });
    }
    check_hour(record.hour)?;
    tracing::debug!(
        student = %record.student_id,
        date = %record.date,
        hour = record.hour,
        status = %record.status,
        "attendance marked"
    );
    store.upsert_attendance(record);
    Ok(())
}

/// Students listed on the register for one class.
///
/// Students without a section appear under every section.
pub fn class_roster<'a>(store: &'a EntityStore, department: &str, year: &str, section: &str) -> Vec<&'a Student> {
    store
        .students()
        .iter()
        .filter(|s| {
            s.department == department
                && s.year == year
                && (s.section.is_empty() || s.section == section)
        })
        .collect()
}

/// Form input for creating or editing a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    /// `None` creates a new user.
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    /// Empty or `None` keeps the stored password on edit.
    pub password: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

/// Create or update a user from a draft and return the stored record.
pub fn save_user(store: &mut EntityStore, draft: UserDraft) -> Result<User, ValidationError> {
    let name = draft.name.trim();
    let email = draft.email.trim();
    if name.is_empty() {
        return Err(ValidationError::Required("name".into()));
    }
    if email.is_empty() {
        return Err(ValidationError::Required("email".into()));
    }

    let role = draft.role.unwrap_or(Role::Staff);
    let department = match role {
        Role::Admin => None,
        Role::Staff => draft
            .department
            .filter(|d| !d.trim().is_empty())
            .or_else(|| store.master_list(MasterKind::Department).first().cloned()),
    };
    let password = draft.password.filter(|p| !p.is_empty());
    let phone = draft.phone.filter(|p| !p.trim().is_empty());

    let user = match draft.id {
        Some(id) => {
            let existing = store.find_user(&id).ok_or_else(|| ValidationError::NotFound {
                entity: "user".into(),
                id: id.clone(),
            })?;
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password: password.or_else(|| existing.password.clone()),
                role,
                department,
                phone: phone.or_else(|| existing.phone.clone()),
            }
        }
        None => {
            let password = password.ok_or_else(|| ValidationError::Required("password".into()))?;
            User {
                id: new_id(),
                name: name.to_string(),
                email: email.to_string(),
                password: Some(password),
                role,
                department,
                phone,
            }
        }
    };

    store.upsert_user(user.clone());
    tracing::info!(user = %user.id, role = %user.role, "user saved");
    Ok(user)
}

/// The signed-in user, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign in by email and plaintext password.
    pub fn login(&mut self, store: &EntityStore, email: &str, password: &str) -> Option<&User> {
        let user = store
            .users()
            .iter()
            .find(|u| u.email == email.trim() && u.password_matches(password));
        match user {
            Some(user) => {
                tracing::info!(user = %user.id, "signed in");
                self.current = Some(user.clone());
                self.current.as_ref()
            }
            None => {
                tracing::warn!(email = %email.trim(), "sign-in rejected");
                None
            }
        }
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            tracing::info!(user = %user.id, "signed out");
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(User::is_admin)
    }

    fn marker(&self) -> String {
        self.current
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_else(|| UNKNOWN_MARKER.to_string())
    }

    /// Mark one student for one hour, attributed to the signed-in user.
    pub fn mark(
        &self,
        store: &mut EntityStore,
        student_id: &str,
        date: NaiveDate,
        hour: u8,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord, ValidationError> {
        let record = AttendanceRecord {
            id: new_id(),
            date,
            hour,
            student_id: student_id.to_string(),
            status,
            marked_by: self.marker(),
        };
        mark_attendance(store, record.clone())?;
        Ok(record)
    }

    /// Assign a subject and staff member to one slot. Admins only.
    pub fn set_timetable_slot(
        &self,
        store: &mut EntityStore,
        day: &str,
        hour: u8,
        class_id: &str,
        subject: &str,
        staff_id: &str,
    ) -> Result<TimetableEntry, ValidationError> {
        if !self.is_admin() {
            return Err(ValidationError::Forbidden {
                action: "editing the timetable".into(),
            });
        }
        check_hour(hour)?;
        let entry = TimetableEntry {
            id: new_id(),
            day: day.to_string(),
            hour,
            class_id: class_id.to_string(),
            subject: subject.to_string(),
            staff_id: staff_id.to_string(),
        };
        store.upsert_timetable(entry.clone());
        Ok(entry)
    }
}
