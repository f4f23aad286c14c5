//! Encoding/decoding between store collections and sheet rows.
//!
//! Every table is written as a header row followed by one row per record.
//! Reads start at row 2, so decoders never see the header. Short rows are
//! padded with empty cells before decoding.

use chrono::NaiveDate;

use crate::model::{
    AttendanceRecord, AttendanceStatus, Holiday, MasterKind, Role, Student, TimetableEntry, User,
    DEFAULT_SECTION,
};
use crate::sheets::Rows;
use crate::store::{Collection, EntityStore, StoreSnapshot};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Layouts
// ============================================================================

/// Column layout and A1 ranges of one remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub collection: Collection,
    pub header: &'static [&'static str],
    /// Range cleared before a write (every row, header included).
    pub clear_range: &'static str,
    /// Range read on load (data rows only).
    pub read_range: &'static str,
    /// Anchor of the header-plus-rows write.
    pub write_range: &'static str,
}

pub const LAYOUTS: [TableLayout; 6] = [
    TableLayout {
        collection: Collection::Users,
        header: &["ID", "Name", "Email", "Password", "Role", "Dept", "Phone"],
        clear_range: "Users!A:G",
        read_range: "Users!A2:G",
        write_range: "Users!A1",
    },
    TableLayout {
        collection: Collection::Students,
        header: &["ID", "Vano", "RegNo", "Name", "Dept", "Year", "Batch", "Section"],
        clear_range: "Students!A:H",
        read_range: "Students!A2:H",
        write_range: "Students!A1",
    },
    TableLayout {
        collection: Collection::Attendance,
        header: &["ID", "Date", "Hour", "StudentID", "Status", "MarkedBy"],
        clear_range: "Attendance!A:F",
        read_range: "Attendance!A2:F",
        write_range: "Attendance!A1",
    },
    TableLayout {
        collection: Collection::Timetable,
        header: &["ID", "Day", "Hour", "ClassID", "Subject", "StaffID"],
        clear_range: "Timetable!A:F",
        read_range: "Timetable!A2:F",
        write_range: "Timetable!A1",
    },
    TableLayout {
        collection: Collection::Holidays,
        header: &["ID", "Date", "Name"],
        clear_range: "Holidays!A:C",
        read_range: "Holidays!A2:C",
        write_range: "Holidays!A1",
    },
    TableLayout {
        collection: Collection::Master,
        header: &["Type", "Value"],
        clear_range: "Master!A:B",
        read_range: "Master!A2:B",
        write_range: "Master!A1",
    },
];

pub fn layout(collection: Collection) -> &'static TableLayout {
    // LAYOUTS covers every Collection variant in SYNC_ORDER order.
    let index = Collection::SYNC_ORDER
        .iter()
        .position(|c| *c == collection)
        .unwrap_or_default();
    &LAYOUTS[index]
}

fn header_row(layout: &TableLayout) -> Vec<String> {
    layout.header.iter().map(|h| h.to_string()).collect()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or_default()
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

// ============================================================================
// Encoding
// ============================================================================

/// Header plus one row per record, in collection order.
pub fn encode_table(collection: Collection, snapshot: &StoreSnapshot) -> Rows {
    let mut rows = vec![header_row(layout(collection))];
    match collection {
        Collection::Users => rows.extend(snapshot.users.iter().map(|u| {
            vec![
                u.id.clone(),
                u.name.clone(),
                u.email.clone(),
                u.password.clone().unwrap_or_default(),
                u.role.as_str().to_string(),
                u.department.clone().unwrap_or_default(),
                u.phone.clone().unwrap_or_default(),
            ]
        })),
        Collection::Students => rows.extend(snapshot.students.iter().map(|s| {
            vec![
                s.id.clone(),
                s.vano.clone(),
                s.register_number.clone(),
                s.name.clone(),
                s.department.clone(),
                s.year.clone(),
                s.batch.clone(),
                s.section.clone(),
            ]
        })),
        Collection::Attendance => rows.extend(snapshot.attendance.iter().map(|a| {
            vec![
                a.id.clone(),
                a.date.format(DATE_FORMAT).to_string(),
                a.hour.to_string(),
                a.student_id.clone(),
                a.status.as_str().to_string(),
                a.marked_by.clone(),
            ]
        })),
        Collection::Timetable => rows.extend(snapshot.timetable.iter().map(|t| {
            vec![
                t.id.clone(),
                t.day.clone(),
                t.hour.to_string(),
                t.class_id.clone(),
                t.subject.clone(),
                t.staff_id.clone(),
            ]
        })),
        Collection::Holidays => rows.extend(snapshot.holidays.iter().map(|h| {
            vec![h.id.clone(), h.date.format(DATE_FORMAT).to_string(), h.name.clone()]
        })),
        Collection::Master => {
            for kind in MasterKind::ALL {
                rows.extend(
                    snapshot
                        .master
                        .list(kind)
                        .iter()
                        .map(|value| vec![kind.code().to_string(), value.clone()]),
                );
            }
        }
    }
    rows
}

// ============================================================================
// Decoding
// ============================================================================

/// Records decoded from one table's data rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Users(Vec<User>),
    Students(Vec<Student>),
    Attendance(Vec<AttendanceRecord>),
    Timetable(Vec<TimetableEntry>),
    Holidays(Vec<Holiday>),
    /// Only kinds that had at least one value, in `MasterKind::ALL` order.
    Master(Vec<(MasterKind, Vec<String>)>),
}

impl Decoded {
    pub fn is_empty(&self) -> bool {
        match self {
            Decoded::Users(v) => v.is_empty(),
            Decoded::Students(v) => v.is_empty(),
            Decoded::Attendance(v) => v.is_empty(),
            Decoded::Timetable(v) => v.is_empty(),
            Decoded::Holidays(v) => v.is_empty(),
            Decoded::Master(v) => v.is_empty(),
        }
    }
}

/// Fully blank rows are dropped; row numbers are kept for log output.
fn data_rows(rows: &Rows) -> impl Iterator<Item = (usize, &Vec<String>)> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
}

pub fn decode_users(rows: &Rows) -> Vec<User> {
    data_rows(rows)
        .filter_map(|(i, row)| {
            let role = match cell(row, 4).parse::<Role>() {
                Ok(role) => role,
                Err(e) => {
                    tracing::warn!(table = "Users", row = i + 2, error = %e, "skipping row");
                    return None;
                }
            };
            Some(User {
                id: cell(row, 0).to_string(),
                name: cell(row, 1).to_string(),
                email: cell(row, 2).to_string(),
                password: optional(cell(row, 3)),
                role,
                department: optional(cell(row, 5)),
                phone: optional(cell(row, 6)),
            })
        })
        .collect()
}

pub fn decode_students(rows: &Rows) -> Vec<Student> {
    data_rows(rows)
        .map(|(_, row)| {
            let section = cell(row, 7);
            Student {
                id: cell(row, 0).to_string(),
                vano: cell(row, 1).to_string(),
                register_number: cell(row, 2).to_string(),
                name: cell(row, 3).to_string(),
                department: cell(row, 4).to_string(),
                year: cell(row, 5).to_string(),
                batch: cell(row, 6).to_string(),
                section: if section.is_empty() {
                    DEFAULT_SECTION.to_string()
                } else {
                    section.to_string()
                },
            }
        })
        .collect()
}

pub fn decode_attendance(rows: &Rows) -> Vec<AttendanceRecord> {
    data_rows(rows)
        .filter_map(|(i, row)| {
            let Some(date) = parse_date(cell(row, 1)) else {
                tracing::warn!(table = "Attendance", row = i + 2, date = cell(row, 1), "skipping row with bad date");
                return None;
            };
            let status = match cell(row, 4).parse::<AttendanceStatus>() {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(table = "Attendance", row = i + 2, error = %e, "skipping row");
                    return None;
                }
            };
            Some(AttendanceRecord {
                id: cell(row, 0).to_string(),
                date,
                hour: cell(row, 2).parse().unwrap_or(1),
                student_id: cell(row, 3).to_string(),
                status,
                marked_by: cell(row, 5).to_string(),
            })
        })
        .collect()
}

pub fn decode_timetable(rows: &Rows) -> Vec<TimetableEntry> {
    data_rows(rows)
        .filter_map(|(i, row)| {
            let Ok(hour) = cell(row, 2).parse::<u8>() else {
                tracing::warn!(table = "Timetable", row = i + 2, hour = cell(row, 2), "skipping row with bad hour");
                return None;
            };
            Some(TimetableEntry {
                id: cell(row, 0).to_string(),
                day: cell(row, 1).to_string(),
                hour,
                class_id: cell(row, 3).to_string(),
                subject: cell(row, 4).to_string(),
                staff_id: cell(row, 5).to_string(),
            })
        })
        .collect()
}

pub fn decode_holidays(rows: &Rows) -> Vec<Holiday> {
    data_rows(rows)
        .filter_map(|(i, row)| {
            let Some(date) = parse_date(cell(row, 1)) else {
                tracing::warn!(table = "Holidays", row = i + 2, date = cell(row, 1), "skipping row with bad date");
                return None;
            };
            Some(Holiday {
                id: cell(row, 0).to_string(),
                date,
                name: cell(row, 2).to_string(),
            })
        })
        .collect()
}

pub fn decode_master(rows: &Rows) -> Vec<(MasterKind, Vec<String>)> {
    let mut lists: Vec<(MasterKind, Vec<String>)> =
        MasterKind::ALL.iter().map(|k| (*k, Vec::new())).collect();
    for (_, row) in data_rows(rows) {
        let value = cell(row, 1);
        let Some(kind) = MasterKind::from_code(cell(row, 0)) else {
            tracing::debug!(code = cell(row, 0), "ignoring master row of unknown type");
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if let Some((_, list)) = lists.iter_mut().find(|(k, _)| *k == kind) {
            list.push(value.to_string());
        }
    }
    lists.retain(|(_, values)| !values.is_empty());
    lists
}

pub fn decode_table(collection: Collection, rows: &Rows) -> Decoded {
    match collection {
        Collection::Users => Decoded::Users(decode_users(rows)),
        Collection::Students => Decoded::Students(decode_students(rows)),
        Collection::Attendance => Decoded::Attendance(decode_attendance(rows)),
        Collection::Timetable => Decoded::Timetable(decode_timetable(rows)),
        Collection::Holidays => Decoded::Holidays(decode_holidays(rows)),
        Collection::Master => Decoded::Master(decode_master(rows)),
    }
}

/// Replace the matching local collection. Empty results leave the store
/// untouched; master lists are replaced one kind at a time.
pub fn apply(store: &mut EntityStore, decoded: Decoded) -> bool {
    if decoded.is_empty() {
        return false;
    }
    match decoded {
        Decoded::Users(users) => store.replace_users(users),
        Decoded::Students(students) => store.replace_students(students),
        Decoded::Attendance(records) => store.replace_attendance(records),
        Decoded::Timetable(entries) => store.replace_timetable(entries),
        Decoded::Holidays(holidays) => store.replace_holidays(holidays),
        Decoded::Master(lists) => {
            for (kind, values) in lists {
                store.replace_master_list(kind, values);
            }
        }
    }
    true
}
