//! Master-data maintenance with cascades.
//!
//! Renaming a label rewrites every dependent record that stores it:
//!
//! | list       | students   | users      | class_id segment |
//! |------------|------------|------------|------------------|
//! | department | department | department | 0                |
//! | year       | year       |            | 1                |
//! | section    | section    |            | 2                |
//! | batch      | batch      |            |                  |
//!
//! Removing a label never cascades; dependents keep the old value.

use thiserror::Error;

use crate::model::{ClassId, MasterKind};
use crate::store::{Collection, EntityStore};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("\"{value}\" already exists in the {kind} list")]
    DuplicateValue { kind: MasterKind, value: String },

    #[error("\"{value}\" is not in the {kind} list")]
    UnknownValue { kind: MasterKind, value: String },

    #[error("{kind} value must not be empty")]
    Empty { kind: MasterKind },
}

/// What a rename touched, for logging and CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub students: usize,
    pub users: usize,
    pub timetable: usize,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.students + self.users + self.timetable
    }
}

fn normalized(kind: MasterKind, value: &str) -> Result<String, ReconcileError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReconcileError::Empty { kind });
    }
    Ok(value.to_string())
}

fn same_label(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Rewrite one segment of a `department-year-section` key. Keys of any
/// other shape come back as `None`.
fn rewrite_class_id(raw: &str, kind: MasterKind, old: &str, new: &str) -> Option<String> {
    let mut id = ClassId::parse(raw)?;
    let segment = match kind {
        MasterKind::Department => &mut id.department,
        MasterKind::Year => &mut id.year,
        MasterKind::Section => &mut id.section,
        MasterKind::Batch => return None,
    };
    if *segment != old {
        return None;
    }
    *segment = new.to_string();
    Some(id.to_string())
}

impl EntityStore {
    /// Append a label. Rejects case-insensitive duplicates.
    pub fn add_master_value(&mut self, kind: MasterKind, value: &str) -> Result<(), ReconcileError> {
        let value = normalized(kind, value)?;
        if self.master.contains_ignore_case(kind, &value) {
            return Err(ReconcileError::DuplicateValue { kind, value });
        }
        tracing::debug!(%kind, %value, "adding master value");
        self.master.list_mut(kind).push(value);
        self.touch(Collection::Master);
        Ok(())
    }

    /// Rename a label in place and cascade it into dependents.
    ///
    /// `new` may differ from `old` only by case; any other entry matching
    /// `new` case-insensitively is a duplicate. Renaming to the identical
    /// string changes nothing.
    pub fn rename_master_value(
        &mut self,
        kind: MasterKind,
        old: &str,
        new: &str,
    ) -> Result<CascadeReport, ReconcileError> {
        let old = normalized(kind, old)?;
        let new = normalized(kind, new)?;

        let list = self.master.list(kind);
        let Some(position) = list.iter().position(|v| *v == old) else {
            return Err(ReconcileError::UnknownValue { kind, value: old });
        };
        if list
            .iter()
            .enumerate()
            .any(|(i, v)| i != position && same_label(v, &new))
        {
            return Err(ReconcileError::DuplicateValue { kind, value: new });
        }
        if old == new {
            return Ok(CascadeReport::default());
        }

        self.master.list_mut(kind)[position] = new.clone();
        self.touch(Collection::Master);

        let report = self.cascade_rename(kind, &old, &new);
        tracing::info!(
            %kind,
            %old,
            %new,
            students = report.students,
            users = report.users,
            timetable = report.timetable,
            "renamed master value"
        );
        Ok(report)
    }

    /// Drop a label. Students, users and timetable entries that reference it
    /// are left as they are.
    pub fn remove_master_value(&mut self, kind: MasterKind, value: &str) -> Result<(), ReconcileError> {
        let value = normalized(kind, value)?;
        let list = self.master.list_mut(kind);
        let before = list.len();
        list.retain(|v| *v != value);
        if list.len() == before {
            return Err(ReconcileError::UnknownValue { kind, value });
        }
        tracing::debug!(%kind, %value, "removed master value");
        self.touch(Collection::Master);
        Ok(())
    }

    fn cascade_rename(&mut self, kind: MasterKind, old: &str, new: &str) -> CascadeReport {
        let mut report = CascadeReport::default();

        for student in &mut self.students {
            let field = match kind {
                MasterKind::Department => &mut student.department,
                MasterKind::Year => &mut student.year,
                MasterKind::Section => &mut student.section,
                MasterKind::Batch => &mut student.batch,
            };
            if *field == old {
                *field = new.to_string();
                report.students += 1;
            }
        }

        if kind == MasterKind::Department {
            for user in &mut self.users {
                if user.department.as_deref() == Some(old) {
                    user.department = Some(new.to_string());
                    report.users += 1;
                }
            }
        }

        for entry in &mut self.timetable {
            if let Some(rewritten) = rewrite_class_id(&entry.class_id, kind, old, new) {
                entry.class_id = rewritten;
                report.timetable += 1;
            }
        }

        if report.students > 0 {
            self.touch(Collection::Students);
        }
        if report.users > 0 {
            self.touch(Collection::Users);
        }
        if report.timetable > 0 {
            self.touch(Collection::Timetable);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Student, TimetableEntry, User};

    fn seeded() -> EntityStore {
        let mut store = EntityStore::with_defaults();
        store.upsert_student(Student {
            id: "s1".into(),
            vano: "V1".into(),
            register_number: "R1".into(),
            name: "Asha".into(),
            department: "CSE".into(),
            year: "III".into(),
            batch: "2022-2026".into(),
            section: "A".into(),
        });
        store.upsert_user(User {
            id: "u2".into(),
            name: "Staff".into(),
            email: "staff@edu.com".into(),
            password: Some("pw".into()),
            role: Role::Staff,
            department: Some("CSE".into()),
            phone: None,
        });
        for (id, class_id) in [("t1", "CSE-III-A"), ("t2", "ECE-III-A"), ("t3", "CSE-III")] {
            store.upsert_timetable(TimetableEntry {
                id: id.into(),
                day: "I".into(),
                hour: 1,
                class_id: class_id.into(),
                subject: "Maths".into(),
                staff_id: "u2".into(),
            });
        }
        store
    }

    #[test]
    fn add_rejects_case_insensitive_duplicate() {
        let mut store = EntityStore::with_defaults();
        let err = store.add_master_value(MasterKind::Department, "cse").unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateValue {
                kind: MasterKind::Department,
                value: "cse".into()
            }
        );
        store.add_master_value(MasterKind::Department, " IT ").unwrap();
        assert_eq!(store.master_list(MasterKind::Department).last().unwrap(), "IT");
    }

    #[test]
    fn add_rejects_blank() {
        let mut store = EntityStore::new();
        assert_eq!(
            store.add_master_value(MasterKind::Year, "   "),
            Err(ReconcileError::Empty { kind: MasterKind::Year })
        );
    }

    #[test]
    fn department_rename_cascades() {
        let mut store = seeded();
        let report = store
            .rename_master_value(MasterKind::Department, "CSE", "CS")
            .unwrap();

        assert_eq!(report, CascadeReport { students: 1, users: 1, timetable: 1 });
        assert_eq!(store.find_student("s1").unwrap().department, "CS");
        assert_eq!(store.find_user("u2").unwrap().department.as_deref(), Some("CS"));
        let ids: Vec<_> = store.timetable().iter().map(|t| t.class_id.as_str()).collect();
        assert_eq!(ids, ["CS-III-A", "ECE-III-A", "CSE-III"]);
        assert_eq!(store.master_list(MasterKind::Department)[0], "CS");
    }

    #[test]
    fn section_rename_touches_third_segment_only() {
        let mut store = seeded();
        store.rename_master_value(MasterKind::Section, "A", "Alpha").unwrap();
        assert_eq!(store.find_student("s1").unwrap().section, "Alpha");
        assert!(store.slot("I", 1, "CSE-III-Alpha").is_some());
        assert!(store.slot("I", 1, "ECE-III-Alpha").is_some());
        assert!(store.slot("I", 1, "CSE-III").is_some());
    }

    #[test]
    fn batch_rename_only_touches_students() {
        let mut store = seeded();
        let report = store
            .rename_master_value(MasterKind::Batch, "2022-2026", "2022-26")
            .unwrap();
        assert_eq!(report, CascadeReport { students: 1, users: 0, timetable: 0 });
        assert_eq!(store.find_student("s1").unwrap().batch, "2022-26");
    }

    #[test]
    fn rename_onto_existing_label_fails_without_mutation() {
        let mut store = seeded();
        let revision = store.revision();
        let err = store
            .rename_master_value(MasterKind::Department, "CSE", "ece")
            .unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateValue { .. }));
        assert_eq!(store.revision(), revision);
        assert_eq!(store.find_student("s1").unwrap().department, "CSE");
    }

    #[test]
    fn rename_case_only_change_is_allowed() {
        let mut store = seeded();
        store.rename_master_value(MasterKind::Department, "CSE", "Cse").unwrap();
        assert_eq!(store.find_student("s1").unwrap().department, "Cse");
    }

    #[test]
    fn rename_to_same_value_is_noop() {
        let mut store = seeded();
        let revision = store.revision();
        let report = store.rename_master_value(MasterKind::Year, "III", "III").unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn rename_unknown_value_fails() {
        let mut store = seeded();
        assert!(matches!(
            store.rename_master_value(MasterKind::Year, "IX", "X"),
            Err(ReconcileError::UnknownValue { .. })
        ));
    }

    #[test]
    fn remove_leaves_dependents_dangling() {
        let mut store = seeded();
        store.remove_master_value(MasterKind::Department, "CSE").unwrap();
        assert!(!store.master().contains_ignore_case(MasterKind::Department, "CSE"));
        assert_eq!(store.find_student("s1").unwrap().department, "CSE");
        assert!(store.slot("I", 1, "CSE-III-A").is_some());
    }

    #[test]
    fn remove_unknown_value_fails() {
        let mut store = seeded();
        assert!(store.remove_master_value(MasterKind::Batch, "1999-2003").is_err());
    }
}
