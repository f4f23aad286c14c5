//! Attendance analytics over the entity store.
//!
//! Every figure is computed for one date and one teaching hour. Percentages
//! are present/marked, rounded to the nearest integer, and 0 when nothing
//! was marked.

mod export;

pub use export::{export_file_name, export_month_csv, export_timetable_csv, MonthRegister};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{AttendanceRecord, AttendanceStatus, MasterKind, Student, DEFAULT_SECTION};
use crate::store::EntityStore;

/// Faculty bucket for pending classes with nobody on the timetable.
pub const UNASSIGNED_FACULTY: &str = "Unassigned / No Timetable";

/// Students sharing one department-year-section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub department: String,
    pub year: String,
    pub section: String,
    pub student_ids: Vec<String>,
}

impl ClassGroup {
    pub fn class_id(&self) -> String {
        format!("{}-{}-{}", self.department, self.year, self.section)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassStatus {
    Updated,
    Pending,
}

/// Submission state of one class for the selected hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStatusItem {
    pub class_id: String,
    pub department: String,
    pub year: String,
    pub section: String,
    pub student_count: usize,
    pub status: ClassStatus,
    pub percentage: u32,
    /// Names of staff timetabled for this class in the selected hour.
    pub faculty: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub hour: u8,
    pub total_students: usize,
    pub total_marked: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_percentage: u32,
    pub classes_total: usize,
    pub classes_updated: usize,
    pub class_status: Vec<ClassStatusItem>,
}

impl DailyStats {
    pub fn pending_classes(&self) -> impl Iterator<Item = &ClassStatusItem> {
        self.class_status
            .iter()
            .filter(|c| c.status == ClassStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyPending {
    pub staff_name: String,
    pub department: String,
    pub pending_classes: Vec<String>,
}

/// Headcount and attendance rate of one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStat {
    pub department: String,
    pub total_students: usize,
    pub attendance_pct: u32,
}

/// Full per-department breakdown for the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentMetric {
    pub name: String,
    pub total_students: usize,
    pub marked: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    /// `year-section` of each class that has not submitted.
    pub pending_classes: Vec<String>,
}

impl DepartmentMetric {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            total_students: 0,
            marked: 0,
            present: 0,
            absent: 0,
            late: 0,
            pending_classes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// `MM-DD`
    pub label: String,
    pub percentage: u32,
}

pub(crate) fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 * 100.0) / whole as f64).round() as u32
}

fn records_for(store: &EntityStore, date: NaiveDate, hour: u8) -> Vec<&AttendanceRecord> {
    store
        .attendance()
        .iter()
        .filter(|a| a.date == date && a.hour == hour)
        .collect()
}

fn section_or_default(student: &Student) -> &str {
    if student.section.is_empty() {
        DEFAULT_SECTION
    } else {
        &student.section
    }
}

/// Group students into classes, ordered by department then year.
///
/// Classes that tie on both keep first-seen order.
pub fn class_groups(students: &[Student]) -> Vec<ClassGroup> {
    let mut groups: Vec<ClassGroup> = Vec::new();
    for student in students {
        let section = section_or_default(student);
        match groups.iter_mut().find(|g| {
            g.department == student.department && g.year == student.year && g.section == section
        }) {
            Some(group) => group.student_ids.push(student.id.clone()),
            None => groups.push(ClassGroup {
                department: student.department.clone(),
                year: student.year.clone(),
                section: section.to_string(),
                student_ids: vec![student.id.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| a.department.cmp(&b.department).then_with(|| a.year.cmp(&b.year)));
    groups
}

/// Totals and per-class submission state for one date and hour.
pub fn daily_stats(store: &EntityStore, date: NaiveDate, hour: u8) -> DailyStats {
    let records = records_for(store, date, hour);
    let count = |status: AttendanceStatus| records.iter().filter(|r| r.status == status).count();
    let present = count(AttendanceStatus::Present);

    let groups = class_groups(store.students());
    let mut classes_updated = 0;
    let class_status = groups
        .iter()
        .map(|group| {
            let marked: Vec<&AttendanceRecord> = group
                .student_ids
                .iter()
                .filter_map(|sid| records.iter().copied().find(|r| &r.student_id == sid))
                .collect();
            let status = if marked.is_empty() {
                ClassStatus::Pending
            } else {
                classes_updated += 1;
                ClassStatus::Updated
            };
            let class_present = marked
                .iter()
                .filter(|r| r.status == AttendanceStatus::Present)
                .count();

            let class_id = group.class_id();
            let mut staff_ids: Vec<&str> = Vec::new();
            for entry in store.timetable() {
                if entry.class_id == class_id && entry.hour == hour && !staff_ids.contains(&entry.staff_id.as_str()) {
                    staff_ids.push(&entry.staff_id);
                }
            }
            let faculty = staff_ids
                .iter()
                .filter_map(|sid| store.find_user(sid).map(|u| u.name.clone()))
                .collect();

            ClassStatusItem {
                class_id,
                department: group.department.clone(),
                year: group.year.clone(),
                section: group.section.clone(),
                student_count: group.student_ids.len(),
                status,
                percentage: percentage(class_present, marked.len()),
                faculty,
            }
        })
        .collect();

    DailyStats {
        date,
        hour,
        total_students: store.students().len(),
        total_marked: records.len(),
        present,
        absent: count(AttendanceStatus::Absent),
        late: count(AttendanceStatus::Late),
        attendance_percentage: percentage(present, records.len()),
        classes_total: groups.len(),
        classes_updated,
        class_status,
    }
}

/// Pending classes grouped by the staff expected to mark them, busiest first.
pub fn faculty_pending(store: &EntityStore, stats: &DailyStats) -> Vec<FacultyPending> {
    let mut buckets: Vec<FacultyPending> = Vec::new();
    let mut push = |staff_name: &str, department: String, class_id: &str| {
        match buckets.iter_mut().find(|b| b.staff_name == staff_name) {
            Some(bucket) => bucket.pending_classes.push(class_id.to_string()),
            None => buckets.push(FacultyPending {
                staff_name: staff_name.to_string(),
                department,
                pending_classes: vec![class_id.to_string()],
            }),
        }
    };

    for class in stats.pending_classes() {
        if class.faculty.is_empty() {
            push(UNASSIGNED_FACULTY, "-".to_string(), &class.class_id);
            continue;
        }
        for staff_name in &class.faculty {
            let department = store
                .users()
                .iter()
                .find(|u| &u.name == staff_name)
                .and_then(|u| u.department.clone())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| class.department.clone());
            push(staff_name.as_str(), department, &class.class_id);
        }
    }

    buckets.sort_by(|a, b| b.pending_classes.len().cmp(&a.pending_classes.len()));
    buckets
}

/// Headcount and attendance rate per department, largest first.
pub fn department_stats(store: &EntityStore, date: NaiveDate, hour: u8) -> Vec<DepartmentStat> {
    // (department, total, marked, present)
    let mut tally: Vec<(String, usize, usize, usize)> = Vec::new();
    for student in store.students() {
        match tally.iter_mut().find(|t| t.0 == student.department) {
            Some(t) => t.1 += 1,
            None => tally.push((student.department.clone(), 1, 0, 0)),
        }
    }
    for record in records_for(store, date, hour) {
        let Some(student) = store.find_student(&record.student_id) else {
            continue;
        };
        if let Some(t) = tally.iter_mut().find(|t| t.0 == student.department) {
            t.2 += 1;
            if record.status == AttendanceStatus::Present {
                t.3 += 1;
            }
        }
    }

    let mut stats: Vec<DepartmentStat> = tally
        .into_iter()
        .map(|(department, total, marked, present)| DepartmentStat {
            department,
            total_students: total,
            attendance_pct: percentage(present, marked),
        })
        .collect();
    stats.sort_by(|a, b| b.total_students.cmp(&a.total_students));
    stats
}

/// Per-department breakdown for the day in `stats`.
///
/// Every department in the master list appears, even with no students.
pub fn department_metrics(store: &EntityStore, stats: &DailyStats) -> Vec<DepartmentMetric> {
    let mut metrics: Vec<DepartmentMetric> = store
        .master_list(MasterKind::Department)
        .iter()
        .map(|d| DepartmentMetric::new(d))
        .collect();

    for student in store.students() {
        match metrics.iter_mut().find(|m| m.name == student.department) {
            Some(m) => m.total_students += 1,
            None => {
                let mut m = DepartmentMetric::new(&student.department);
                m.total_students = 1;
                metrics.push(m);
            }
        }
    }

    for record in records_for(store, stats.date, stats.hour) {
        let Some(student) = store.find_student(&record.student_id) else {
            continue;
        };
        if let Some(m) = metrics.iter_mut().find(|m| m.name == student.department) {
            m.marked += 1;
            match record.status {
                AttendanceStatus::Present => m.present += 1,
                AttendanceStatus::Absent => m.absent += 1,
                AttendanceStatus::Late => m.late += 1,
            }
        }
    }

    for class in stats.pending_classes() {
        if let Some(m) = metrics.iter_mut().find(|m| m.name == class.department) {
            m.pending_classes.push(format!("{}-{}", class.year, class.section));
        }
    }

    metrics.sort_by(|a, b| b.total_students.cmp(&a.total_students));
    metrics
}

/// Attendance percentage for `hour` on each of the seven days ending on `date`.
pub fn weekly_trend(store: &EntityStore, date: NaiveDate, hour: u8) -> Vec<TrendPoint> {
    (0..7)
        .rev()
        .map(|back| {
            let day = date - Duration::days(back);
            let records = records_for(store, day, hour);
            let present = records
                .iter()
                .filter(|r| r.status == AttendanceStatus::Present)
                .count();
            TrendPoint {
                date: day,
                label: day.format("%m-%d").to_string(),
                percentage: percentage(present, records.len()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, TimetableEntry, User};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn student(id: &str, dept: &str, year: &str, section: &str) -> Student {
        Student {
            id: id.into(),
            vano: format!("V{id}"),
            register_number: format!("R{id}"),
            name: format!("Student {id}"),
            department: dept.into(),
            year: year.into(),
            batch: "2022-2026".into(),
            section: section.into(),
        }
    }

    fn mark(store: &mut EntityStore, student_id: &str, day: u32, hour: u8, status: AttendanceStatus) {
        store.upsert_attendance(AttendanceRecord {
            id: format!("{student_id}-{day}-{hour}"),
            date: date(day),
            hour,
            student_id: student_id.into(),
            status,
            marked_by: "1".into(),
        });
    }

    fn staff(id: &str, name: &str, dept: Option<&str>) -> User {
        User {
            id: id.into(),
            name: name.into(),
            email: format!("{id}@edu.com"),
            password: Some("pw".into()),
            role: Role::Staff,
            department: dept.map(String::from),
            phone: None,
        }
    }

    /// CSE-III-A (s1, s2), CSE-II-A (s3), ECE-III-B (s4).
    fn school() -> EntityStore {
        let mut store = EntityStore::with_defaults();
        store.add_students(vec![
            student("s1", "CSE", "III", "A"),
            student("s2", "CSE", "III", "A"),
            student("s3", "CSE", "II", "A"),
            student("s4", "ECE", "III", "B"),
        ]);
        store.upsert_user(staff("u1", "Meena", Some("CSE")));
        store.upsert_user(staff("u2", "Arun", None));
        store.upsert_timetable(TimetableEntry {
            id: "t1".into(),
            day: "I".into(),
            hour: 1,
            class_id: "CSE-II-A".into(),
            subject: "Maths".into(),
            staff_id: "u1".into(),
        });
        store.upsert_timetable(TimetableEntry {
            id: "t2".into(),
            day: "I".into(),
            hour: 1,
            class_id: "ECE-III-B".into(),
            subject: "Circuits".into(),
            staff_id: "u2".into(),
        });
        store
    }

    #[test]
    fn test_class_groups_sorted_and_defaulted() {
        let groups = class_groups(&[
            student("a", "ECE", "I", "A"),
            student("b", "CSE", "III", ""),
            student("c", "CSE", "II", "A"),
            student("d", "CSE", "III", "A"),
        ]);
        let ids: Vec<String> = groups.iter().map(|g| g.class_id()).collect();
        assert_eq!(ids, vec!["CSE-II-A", "CSE-III-A", "ECE-I-A"]);
        assert_eq!(groups[1].student_ids, vec!["b", "d"]);
    }

    #[test]
    fn test_daily_stats_counts_and_rounding() {
        let mut store = school();
        mark(&mut store, "s1", 4, 1, AttendanceStatus::Present);
        mark(&mut store, "s2", 4, 1, AttendanceStatus::Absent);
        mark(&mut store, "s4", 4, 1, AttendanceStatus::Present);
        // other hour and other day are ignored
        mark(&mut store, "s3", 4, 2, AttendanceStatus::Present);
        mark(&mut store, "s3", 5, 1, AttendanceStatus::Present);

        let stats = daily_stats(&store, date(4), 1);
        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.total_marked, 3);
        assert_eq!((stats.present, stats.absent, stats.late), (2, 1, 0));
        assert_eq!(stats.attendance_percentage, 67);
        assert_eq!(stats.classes_total, 3);
        assert_eq!(stats.classes_updated, 2);

        let pending: Vec<&str> = stats.pending_classes().map(|c| c.class_id.as_str()).collect();
        assert_eq!(pending, vec!["CSE-II-A"]);
        let cse3 = &stats.class_status[1];
        assert_eq!(cse3.class_id, "CSE-III-A");
        assert_eq!(cse3.percentage, 50);
        assert_eq!(stats.class_status[0].faculty, vec!["Meena"]);
    }

    #[test]
    fn test_nothing_marked_is_zero_percent() {
        let store = school();
        let stats = daily_stats(&store, date(4), 1);
        assert_eq!(stats.attendance_percentage, 0);
        assert_eq!(stats.classes_updated, 0);
        assert!(stats.class_status.iter().all(|c| c.percentage == 0));
    }

    #[test]
    fn test_faculty_pending_buckets() {
        let store = school();
        let stats = daily_stats(&store, date(4), 1);
        let pending = faculty_pending(&store, &stats);

        assert_eq!(pending.len(), 3);
        let unassigned = pending.iter().find(|p| p.staff_name == UNASSIGNED_FACULTY).unwrap();
        assert_eq!(unassigned.department, "-");
        assert_eq!(unassigned.pending_classes, vec!["CSE-III-A"]);

        let arun = pending.iter().find(|p| p.staff_name == "Arun").unwrap();
        assert_eq!(arun.department, "ECE", "falls back to the class department");
        let meena = pending.iter().find(|p| p.staff_name == "Meena").unwrap();
        assert_eq!(meena.department, "CSE");
    }

    #[test]
    fn test_department_stats_largest_first() {
        let mut store = school();
        mark(&mut store, "s1", 4, 1, AttendanceStatus::Present);
        mark(&mut store, "s2", 4, 1, AttendanceStatus::Late);
        mark(&mut store, "s3", 4, 1, AttendanceStatus::Present);

        let stats = department_stats(&store, date(4), 1);
        assert_eq!(stats[0].department, "CSE");
        assert_eq!(stats[0].total_students, 3);
        assert_eq!(stats[0].attendance_pct, 67);
        assert_eq!(stats[1].department, "ECE");
        assert_eq!(stats[1].attendance_pct, 0);
    }

    #[test]
    fn test_department_metrics_include_master_departments() {
        let mut store = school();
        mark(&mut store, "s1", 4, 1, AttendanceStatus::Present);
        mark(&mut store, "s2", 4, 1, AttendanceStatus::Late);
        let stats = daily_stats(&store, date(4), 1);

        let metrics = department_metrics(&store, &stats);
        assert_eq!(metrics.len(), 5);
        let cse = &metrics[0];
        assert_eq!(cse.name, "CSE");
        assert_eq!((cse.marked, cse.present, cse.late), (2, 1, 1));
        assert_eq!(cse.pending_classes, vec!["II-A"]);
        let ece = metrics.iter().find(|m| m.name == "ECE").unwrap();
        assert_eq!(ece.pending_classes, vec!["III-B"]);
        let civil = metrics.iter().find(|m| m.name == "CIVIL").unwrap();
        assert_eq!(civil.total_students, 0);
    }

    #[test]
    fn test_weekly_trend_covers_seven_days() {
        let mut store = school();
        mark(&mut store, "s1", 1, 1, AttendanceStatus::Present);
        mark(&mut store, "s2", 1, 1, AttendanceStatus::Absent);
        mark(&mut store, "s1", 7, 1, AttendanceStatus::Present);

        let trend = weekly_trend(&store, date(7), 1);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, date(1));
        assert_eq!(trend[0].label, "03-01");
        assert_eq!(trend[0].percentage, 50);
        assert_eq!(trend[3].percentage, 0);
        assert_eq!(trend[6].percentage, 100);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 3), 67);
    }
}
