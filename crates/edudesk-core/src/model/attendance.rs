use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
        }
    }

    /// Single-letter code used in the monthly register.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "A",
            AttendanceStatus::Late => "L",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" | "P" => Ok(AttendanceStatus::Present),
            "ABSENT" | "A" => Ok(AttendanceStatus::Absent),
            "LATE" | "L" => Ok(AttendanceStatus::Late),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown attendance status '{other}'"),
            }),
        }
    }
}

/// One mark for one student in one hour of one day.
///
/// At most one record exists per (date, student_id, hour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub date: NaiveDate,
    pub hour: u8,
    pub student_id: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
}

impl AttendanceRecord {
    /// Natural key used for upserts.
    pub fn key_matches(&self, other: &AttendanceRecord) -> bool {
        self.date == other.date && self.student_id == other.student_id && self.hour == other.hour
    }
}
