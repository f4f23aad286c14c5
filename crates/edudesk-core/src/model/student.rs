use serde::{Deserialize, Serialize};

use super::timetable::ClassId;

/// Section assigned when a record carries none.
pub const DEFAULT_SECTION: &str = "A";

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

/// An enrolled student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub vano: String,
    pub register_number: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub batch: String,
    #[serde(default = "default_section")]
    pub section: String,
}

impl Student {
    /// The class this student belongs to.
    pub fn class_id(&self) -> ClassId {
        ClassId::new(&self.department, &self.year, &self.section)
    }

    pub fn in_class(&self, department: &str, year: &str, section: &str) -> bool {
        self.department == department && self.year == year && self.section == section
    }
}
