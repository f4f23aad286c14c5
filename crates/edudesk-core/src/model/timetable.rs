use std::fmt;

use serde::{Deserialize, Serialize};

/// Day-order labels of the rotating timetable.
pub const DAYS_OF_WEEK: [&str; 6] = ["I", "II", "III", "IV", "V", "VI"];

/// Teaching hours per day, 1-based.
pub const HOURS_PER_DAY: u8 = 6;

/// Composite class key: `department-year-section`.
///
/// Only strings that split into exactly three hyphen-separated segments
/// parse; anything else is treated as an opaque label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId {
    pub department: String,
    pub year: String,
    pub section: String,
}

impl ClassId {
    pub fn new(department: &str, year: &str, section: &str) -> Self {
        Self {
            department: department.to_string(),
            year: year.to_string(),
            section: section.to_string(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('-');
        let (department, year, section) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(department, year, section))
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.department, self.year, self.section)
    }
}

/// One timetable slot. At most one entry exists per (day, hour, class_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: String,
    pub day: String,
    pub hour: u8,
    pub class_id: String,
    pub subject: String,
    pub staff_id: String,
}

impl TimetableEntry {
    /// Natural key used for upserts.
    pub fn slot_matches(&self, other: &TimetableEntry) -> bool {
        self.day == other.day && self.hour == other.hour && self.class_id == other.class_id
    }
}
