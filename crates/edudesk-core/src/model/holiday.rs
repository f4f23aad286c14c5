use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed day. Attendance cannot be marked on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
}
