//! Monthly attendance register export.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::model::{AttendanceStatus, ClassId, Student};
use crate::store::EntityStore;

/// Selection for one register: a class, a teaching hour and a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRegister {
    /// `YYYY-MM`
    pub month: String,
    pub department: String,
    pub year: String,
    /// Students with no section are included for any section.
    pub section: String,
    pub hour: u8,
}

impl MonthRegister {
    fn first_day(&self) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(&format!("{}-01", self.month.trim()), "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidValue {
                field: "month".into(),
                message: format!("expected YYYY-MM, got '{}'", self.month),
            }
        })
    }

    fn includes(&self, student: &Student) -> bool {
        student.department == self.department
            && student.year == self.year
            && (student.section.is_empty() || student.section == self.section)
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Suggested file name for a register.
pub fn export_file_name(register: &MonthRegister) -> String {
    format!(
        "Attendance_{}_{}_{}_Hour{}_{}.csv",
        register.department, register.year, register.section, register.hour, register.month
    )
}

/// Render the register as CSV.
///
/// Header is `Register No,Name,Hour,1..N,Total Present,Total Absent,Total Late`.
/// One row per matching student sorted by register number; each day cell
/// is `P`, `A`, `L` or `-` when nothing was recorded.
pub fn export_month_csv(store: &EntityStore, register: &MonthRegister) -> Result<String, CoreError> {
    let first = register.first_day()?;
    let days = days_in_month(first);

    let mut students: Vec<&Student> = store.students().iter().filter(|s| register.includes(s)).collect();
    students.sort_by(|a, b| a.register_number.cmp(&b.register_number));

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["Register No".to_string(), "Name".to_string(), "Hour".to_string()];
    header.extend((1..=days).map(|d| d.to_string()));
    header.extend(["Total Present", "Total Absent", "Total Late"].map(String::from));
    writer.write_record(&header)?;

    for student in &students {
        let (mut present, mut absent, mut late) = (0u32, 0u32, 0u32);
        let mut row = vec![
            student.register_number.clone(),
            student.name.clone(),
            register.hour.to_string(),
        ];
        for day in 0..days {
            let date = first + chrono::Duration::days(i64::from(day));
            let code = match store.attendance_for(&student.id, date, register.hour) {
                Some(record) => {
                    match record.status {
                        AttendanceStatus::Present => present += 1,
                        AttendanceStatus::Absent => absent += 1,
                        AttendanceStatus::Late => late += 1,
                    }
                    record.status.code()
                }
                None => "-",
            };
            row.push(code.to_string());
        }
        row.extend([present, absent, late].map(|n| n.to_string()));
        writer.write_record(&row)?;
    }

    tracing::debug!(
        students = students.len(),
        month = %register.month,
        hour = register.hour,
        "exported attendance register"
    );
    into_string(writer)
}

/// Render one class's timetable as CSV: `Day Order,Hour,Class,Section,Subject,Staff`.
///
/// Staff ids with no matching user are written as `Unknown`.
pub fn export_timetable_csv(store: &EntityStore, class_id: &str) -> Result<String, CoreError> {
    let section = ClassId::parse(class_id).map(|c| c.section).unwrap_or_default();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Day Order", "Hour", "Class", "Section", "Subject", "Staff"])?;
    for entry in store.timetable().iter().filter(|t| t.class_id == class_id) {
        let staff = store
            .find_user(&entry.staff_id)
            .map(|u| u.name.as_str())
            .unwrap_or("Unknown");
        let hour = entry.hour.to_string();
        writer.write_record([
            entry.day.as_str(),
            hour.as_str(),
            entry.class_id.as_str(),
            section.as_str(),
            entry.subject.as_str(),
            staff,
        ])?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, CoreError> {
    let bytes = writer.into_inner().map_err(|e| CoreError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        CoreError::Validation(ValidationError::InvalidValue {
            field: "csv".into(),
            message: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttendanceRecord;

    fn student(id: &str, reg: &str, name: &str, section: &str) -> Student {
        Student {
            id: id.into(),
            vano: id.into(),
            register_number: reg.into(),
            name: name.into(),
            department: "CSE".into(),
            year: "III".into(),
            batch: "2022-2026".into(),
            section: section.into(),
        }
    }

    fn register(month: &str) -> MonthRegister {
        MonthRegister {
            month: month.into(),
            department: "CSE".into(),
            year: "III".into(),
            section: "A".into(),
            hour: 2,
        }
    }

    #[test]
    fn test_days_in_month() {
        let d = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        assert_eq!(days_in_month(d(2024, 2)), 29);
        assert_eq!(days_in_month(d(2023, 2)), 28);
        assert_eq!(days_in_month(d(2024, 12)), 31);
        assert_eq!(days_in_month(d(2024, 4)), 30);
    }

    #[test]
    fn test_register_rows_and_totals() {
        let mut store = EntityStore::new();
        store.add_students(vec![
            student("s2", "22CS002", "Bala", "A"),
            student("s1", "22CS001", "Asha, K", "A"),
            student("s3", "22CS003", "Other", "B"),
        ]);
        for (day, status) in [(1, AttendanceStatus::Present), (2, AttendanceStatus::Absent), (3, AttendanceStatus::Late)] {
            store.upsert_attendance(AttendanceRecord {
                id: format!("a{day}"),
                date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                hour: 2,
                student_id: "s1".into(),
                status,
                marked_by: "1".into(),
            });
        }
        // a different hour is not part of this register
        store.upsert_attendance(AttendanceRecord {
            id: "x".into(),
            date: NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
            hour: 1,
            student_id: "s1".into(),
            status: AttendanceStatus::Present,
            marked_by: "1".into(),
        });

        let csv = export_month_csv(&store, &register("2024-02")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Register No,Name,Hour,1,2,"));
        assert!(lines[0].ends_with(",29,Total Present,Total Absent,Total Late"));
        assert!(lines[1].starts_with("22CS001,\"Asha, K\",2,P,A,L,-,"));
        assert!(lines[1].ends_with(",1,1,1"));
        assert!(lines[2].starts_with("22CS002,Bala,2,-"));
        assert!(lines[2].ends_with(",0,0,0"));
    }

    #[test]
    fn test_empty_month_is_all_dashes() {
        let mut store = EntityStore::new();
        store.add_students(vec![student("s1", "22CS001", "Asha", "A")]);

        let csv = export_month_csv(&store, &register("2024-04")).unwrap();
        let row = csv.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 3 + 30 + 3);
        assert!(cells[3..33].iter().all(|c| *c == "-"));
        assert_eq!(&cells[33..], ["0", "0", "0"]);
    }

    #[test]
    fn test_bad_month_is_rejected() {
        let store = EntityStore::new();
        let err = export_month_csv(&store, &register("April")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn test_timetable_export_names_staff() {
        use crate::model::TimetableEntry;

        let mut store = EntityStore::with_defaults();
        for (id, hour, staff) in [("t1", 1, "1"), ("t2", 2, "gone")] {
            store.upsert_timetable(TimetableEntry {
                id: id.into(),
                day: "I".into(),
                hour,
                class_id: "CSE-III-A".into(),
                subject: "Maths".into(),
                staff_id: staff.into(),
            });
        }
        let csv = export_timetable_csv(&store, "CSE-III-A").unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Day Order,Hour,Class,Section,Subject,Staff");
        assert_eq!(lines[1], "I,1,CSE-III-A,A,Maths,Admin User");
        assert_eq!(lines[2], "I,2,CSE-III-A,A,Maths,Unknown");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(export_file_name(&register("2024-02")), "Attendance_CSE_III_A_Hour2_2024-02.csv");
    }
}
