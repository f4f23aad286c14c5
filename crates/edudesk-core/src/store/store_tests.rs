//! Tests for the entity store.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::model::{AttendanceStatus, Role};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn staff(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: format!("Staff {id}"),
            email: email.into(),
            password: Some("pw".into()),
            role: Role::Staff,
            department: Some("CSE".into()),
            phone: None,
        }
    }

    fn student(id: &str) -> Student {
        Student {
            id: id.into(),
            vano: "V1".into(),
            register_number: format!("REG{id}"),
            name: format!("Student {id}"),
            department: "CSE".into(),
            year: "III".into(),
            batch: "2022-2026".into(),
            section: "A".into(),
        }
    }

    fn mark(id: &str, student_id: &str, hour: u8, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: id.into(),
            date: date(2024, 3, 4),
            hour,
            student_id: student_id.into(),
            status,
            marked_by: "Staff".into(),
        }
    }

    fn slot(id: &str, subject: &str) -> TimetableEntry {
        TimetableEntry {
            id: id.into(),
            day: "I".into(),
            hour: 1,
            class_id: "CSE-III-A".into(),
            subject: subject.into(),
            staff_id: "2".into(),
        }
    }

    #[test]
    fn test_defaults_seed_admin_and_master_lists() {
        let store = EntityStore::with_defaults();
        assert_eq!(store.users().len(), 1);
        assert!(store.users()[0].is_admin());
        assert_eq!(store.master_list(MasterKind::Department).len(), 5);
        assert_eq!(store.revision(), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_upsert_user_replaces_by_id() {
        let mut store = EntityStore::new();
        store.upsert_user(staff("2", "a@edu.com"));
        store.upsert_user(staff("2", "b@edu.com"));
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.users()[0].email, "b@edu.com");
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_update_user_keeps_password_when_blank() {
        let mut store = EntityStore::new();
        store.upsert_user(staff("2", "a@edu.com"));

        let mut edit = staff("2", "a@edu.com");
        edit.name = "Renamed".into();
        edit.password = Some(String::new());
        assert!(store.update_user(edit));

        let user = store.find_user("2").unwrap();
        assert_eq!(user.name, "Renamed");
        assert_eq!(user.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_update_unknown_user_is_noop() {
        let mut store = EntityStore::new();
        assert!(!store.update_user(staff("9", "x@edu.com")));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_find_user_by_email_trims() {
        let mut store = EntityStore::new();
        store.upsert_user(staff("2", "a@edu.com"));
        assert_eq!(store.find_user_by_email(" a@edu.com ").unwrap().id, "2");
        assert!(store.find_user_by_email("nobody@edu.com").is_none());
    }

    #[test]
    fn test_students_are_append_only() {
        let mut store = EntityStore::new();
        assert!(store.upsert_student(student("1")));

        let mut again = student("1");
        again.name = "Changed".into();
        assert!(!store.upsert_student(again));
        assert_eq!(store.find_student("1").unwrap().name, "Student 1");

        let added = store.add_students(vec![student("1"), student("2"), student("3")]);
        assert_eq!(added, 2);
        assert_eq!(store.students().len(), 3);
    }

    #[test]
    fn test_timetable_one_entry_per_slot() {
        let mut store = EntityStore::new();
        store.upsert_timetable(slot("t1", "Maths"));
        store.upsert_timetable(slot("t2", "Physics"));

        assert_eq!(store.timetable().len(), 1);
        let entry = store.slot("I", 1, "CSE-III-A").unwrap();
        assert_eq!(entry.id, "t2");
        assert_eq!(entry.subject, "Physics");
    }

    #[test]
    fn test_attendance_one_record_per_key() {
        let mut store = EntityStore::new();
        store.upsert_attendance(mark("a1", "s1", 1, AttendanceStatus::Present));
        store.upsert_attendance(mark("a2", "s1", 2, AttendanceStatus::Present));
        store.upsert_attendance(mark("a3", "s1", 1, AttendanceStatus::Absent));

        assert_eq!(store.attendance().len(), 2);
        let record = store.attendance_for("s1", date(2024, 3, 4), 1).unwrap();
        assert_eq!(record.status, AttendanceStatus::Absent);
        assert_eq!(record.id, "a3");
    }

    #[test]
    fn test_holiday_lookup() {
        let mut store = EntityStore::new();
        store.upsert_holiday(Holiday {
            id: "h1".into(),
            date: date(2024, 1, 26),
            name: "Republic Day".into(),
        });
        assert_eq!(store.holiday_on(date(2024, 1, 26)).unwrap().name, "Republic Day");
        assert!(store.holiday_on(date(2024, 1, 27)).is_none());
        assert!(store.remove_holiday("h1"));
        assert!(store.holiday_on(date(2024, 1, 26)).is_none());
    }

    #[test]
    fn test_remove_missing_does_not_touch() {
        let mut store = EntityStore::new();
        assert!(!store.remove_user("nope"));
        assert!(!store.remove_student("nope"));
        assert!(!store.remove_timetable("nope"));
        assert!(!store.remove_attendance("nope"));
        assert_eq!(store.revision(), 0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_mutations_publish_changes() {
        let mut store = EntityStore::new();
        let mut rx = store.subscribe();

        store.upsert_user(staff("2", "a@edu.com"));
        store.upsert_timetable(slot("t1", "Maths"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.collection, Collection::Users);
        assert_eq!(first.revision, 1);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.collection, Collection::Timetable);
        assert_eq!(second.revision, 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_mark_clean_resets_dirty_only() {
        let mut store = EntityStore::new();
        store.upsert_user(staff("2", "a@edu.com"));
        assert!(store.is_dirty());
        store.mark_clean();
        assert!(!store.is_dirty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut source = EntityStore::with_defaults();
        source.upsert_student(student("1"));
        source.upsert_attendance(mark("a1", "1", 1, AttendanceStatus::Late));
        let snapshot = source.snapshot();

        let mut target = EntityStore::new();
        target.restore(snapshot.clone());
        assert_eq!(target.snapshot(), snapshot);
        assert!(target.is_dirty());

        let rebuilt = EntityStore::from_snapshot(snapshot.clone());
        assert_eq!(rebuilt.snapshot(), snapshot);
        assert!(!rebuilt.is_dirty());
    }

    #[test]
    fn test_shared_store_lock() {
        let shared = EntityStore::new().into_shared();
        lock_store(&shared).upsert_student(student("1"));
        assert_eq!(lock_store(&shared).students().len(), 1);
    }
}
