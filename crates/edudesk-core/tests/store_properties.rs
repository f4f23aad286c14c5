//! Property tests for natural-key upserts in the entity store.
//!
//! Whatever order marks arrive in, the store keeps exactly one record per
//! key and that record is the last one written.

use std::collections::HashMap;

use chrono::NaiveDate;
use edudesk_core::{AttendanceRecord, AttendanceStatus, EntityStore, TimetableEntry};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = AttendanceStatus> {
    prop_oneof![
        Just(AttendanceStatus::Present),
        Just(AttendanceStatus::Absent),
        Just(AttendanceStatus::Late),
    ]
}

/// (day, hour, student) drawn from a small domain so keys collide often.
fn arb_mark() -> impl Strategy<Value = (u32, u8, u8, AttendanceStatus)> {
    (1u32..=3, 1u8..=6, 0u8..4, arb_status())
}

fn arb_slot() -> impl Strategy<Value = (u8, u8, u8, u16)> {
    // (day index, hour, class index, subject tag)
    (0u8..2, 1u8..=6, 0u8..2, any::<u16>())
}

proptest! {
    #[test]
    fn prop_attendance_last_write_wins(marks in prop::collection::vec(arb_mark(), 0..60)) {
        let mut store = EntityStore::new();
        let mut expected: HashMap<(u32, u8, u8), AttendanceStatus> = HashMap::new();

        for (i, (day, hour, student, status)) in marks.iter().copied().enumerate() {
            store.upsert_attendance(AttendanceRecord {
                id: format!("a{i}"),
                date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                hour,
                student_id: format!("s{student}"),
                status,
                marked_by: "1".into(),
            });
            expected.insert((day, hour, student), status);
        }

        prop_assert_eq!(store.attendance().len(), expected.len());
        for ((day, hour, student), status) in &expected {
            let date = NaiveDate::from_ymd_opt(2024, 6, *day).unwrap();
            let found = store.attendance_for(&format!("s{student}"), date, *hour);
            prop_assert_eq!(found.map(|r| r.status), Some(*status));
        }
    }

    #[test]
    fn prop_timetable_one_entry_per_slot(slots in prop::collection::vec(arb_slot(), 0..40)) {
        const DAYS: [&str; 2] = ["I", "II"];
        const CLASSES: [&str; 2] = ["CSE-III-A", "ECE-II-B"];

        let mut store = EntityStore::new();
        let mut expected: HashMap<(u8, u8, u8), u16> = HashMap::new();
        for (i, (day, hour, class, tag)) in slots.iter().copied().enumerate() {
            store.upsert_timetable(TimetableEntry {
                id: format!("t{i}"),
                day: DAYS[day as usize].into(),
                hour,
                class_id: CLASSES[class as usize].into(),
                subject: format!("subject-{tag}"),
                staff_id: "u1".into(),
            });
            expected.insert((day, hour, class), tag);
        }

        prop_assert_eq!(store.timetable().len(), expected.len());
        for ((day, hour, class), tag) in &expected {
            let entry = store.slot(DAYS[*day as usize], *hour, CLASSES[*class as usize]);
            let subject = format!("subject-{tag}");
            prop_assert_eq!(entry.map(|e| e.subject.as_str()), Some(subject.as_str()));
        }
    }

    #[test]
    fn prop_every_mutation_bumps_revision(marks in prop::collection::vec(arb_mark(), 1..30)) {
        let mut store = EntityStore::new();
        let mut last = store.revision();
        for (i, (day, hour, student, status)) in marks.into_iter().enumerate() {
            store.upsert_attendance(AttendanceRecord {
                id: format!("a{i}"),
                date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                hour,
                student_id: format!("s{student}"),
                status,
                marked_by: "1".into(),
            });
            prop_assert!(store.revision() > last);
            last = store.revision();
        }
        prop_assert!(store.is_dirty());
    }
}
