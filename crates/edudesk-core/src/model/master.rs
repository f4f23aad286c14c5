use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_DEPARTMENTS: [&str; 5] = ["CSE", "ECE", "MECH", "CIVIL", "EEE"];
pub const DEFAULT_YEARS: [&str; 4] = ["I", "II", "III", "IV"];
pub const DEFAULT_SECTIONS: [&str; 3] = ["A", "B", "C"];
pub const DEFAULT_BATCHES: [&str; 4] = ["2022-2026", "2023-2027", "2024-2028", "2025-2029"];

/// Which master list a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MasterKind {
    Department,
    Year,
    Section,
    Batch,
}

impl MasterKind {
    pub const ALL: [MasterKind; 4] = [
        MasterKind::Department,
        MasterKind::Year,
        MasterKind::Section,
        MasterKind::Batch,
    ];

    /// Type tag used in the `Master` sheet.
    pub fn code(&self) -> &'static str {
        match self {
            MasterKind::Department => "DEPT",
            MasterKind::Year => "YEAR",
            MasterKind::Section => "SEC",
            MasterKind::Batch => "BATCH",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "DEPT" => Some(MasterKind::Department),
            "YEAR" => Some(MasterKind::Year),
            "SEC" => Some(MasterKind::Section),
            "BATCH" => Some(MasterKind::Batch),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MasterKind::Department => "department",
            MasterKind::Year => "year",
            MasterKind::Section => "section",
            MasterKind::Batch => "batch",
        }
    }
}

impl fmt::Display for MasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MasterKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dept" | "department" => Ok(MasterKind::Department),
            "year" => Ok(MasterKind::Year),
            "sec" | "section" => Ok(MasterKind::Section),
            "batch" => Ok(MasterKind::Batch),
            other => Err(ValidationError::InvalidValue {
                field: "kind".into(),
                message: format!("unknown master list '{other}'"),
            }),
        }
    }
}

/// The four reference lists. Each is ordered and unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterData {
    pub departments: Vec<String>,
    pub years: Vec<String>,
    pub sections: Vec<String>,
    pub batches: Vec<String>,
}

impl MasterData {
    pub fn empty() -> Self {
        Self {
            departments: Vec::new(),
            years: Vec::new(),
            sections: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub fn list(&self, kind: MasterKind) -> &[String] {
        match kind {
            MasterKind::Department => &self.departments,
            MasterKind::Year => &self.years,
            MasterKind::Section => &self.sections,
            MasterKind::Batch => &self.batches,
        }
    }

    pub(crate) fn list_mut(&mut self, kind: MasterKind) -> &mut Vec<String> {
        match kind {
            MasterKind::Department => &mut self.departments,
            MasterKind::Year => &mut self.years,
            MasterKind::Section => &mut self.sections,
            MasterKind::Batch => &mut self.batches,
        }
    }

    /// Case-insensitive membership test.
    pub fn contains_ignore_case(&self, kind: MasterKind, value: &str) -> bool {
        let needle = value.to_lowercase();
        self.list(kind).iter().any(|v| v.to_lowercase() == needle)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for MasterData {
    fn default() -> Self {
        Self {
            departments: owned(&DEFAULT_DEPARTMENTS),
            years: owned(&DEFAULT_YEARS),
            sections: owned(&DEFAULT_SECTIONS),
            batches: owned(&DEFAULT_BATCHES),
        }
    }
}
