//! Entity types held by the [`EntityStore`](crate::store::EntityStore).
//!
//! Identifiers are opaque strings. Uniqueness rules (by id or by natural
//! key) are enforced by the store, not by these types.

mod attendance;
mod holiday;
mod master;
mod student;
mod timetable;
mod user;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use holiday::Holiday;
pub use master::{
    MasterData, MasterKind, DEFAULT_BATCHES, DEFAULT_DEPARTMENTS, DEFAULT_SECTIONS, DEFAULT_YEARS,
};
pub use student::{Student, DEFAULT_SECTION};
pub use timetable::{ClassId, TimetableEntry, DAYS_OF_WEEK, HOURS_PER_DAY};
pub use user::{Role, User};

/// Generate a fresh opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
