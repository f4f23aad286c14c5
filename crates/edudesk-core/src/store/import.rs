//! Bulk student import.

use crate::model::{new_id, Student, DEFAULT_SECTION};

const IMPORT_COLUMNS: usize = 6;

/// Parse a student roster.
///
/// The first line is a header and is skipped. Columns are Vano, Register
/// Number, Name, Department, Year, Batch; extra columns are ignored and rows
/// with fewer than six cells are dropped. Section is always the default.
pub fn parse_student_csv(text: &str) -> Vec<Student> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut students = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = line + 2, error = %e, "skipping unreadable roster row");
                continue;
            }
        };
        if record.len() < IMPORT_COLUMNS {
            tracing::debug!(line = line + 2, cells = record.len(), "skipping short roster row");
            continue;
        }
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        students.push(Student {
            id: new_id(),
            vano: cell(0),
            register_number: cell(1),
            name: cell(2),
            department: cell(3),
            year: cell(4),
            batch: cell(5),
            section: DEFAULT_SECTION.to_string(),
        });
    }
    students
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_header_and_short_rows() {
        let text = "Vano,RegNo,Name,Dept,Year,Batch\n\
                    V1, 22CS001 ,Asha,CSE,III,2022-2026\n\
                    V2,22CS002,Short\n\
                    V3,22CS003,Bala,CSE,III,2022-2026,extra\n";
        let students = parse_student_csv(text);
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].register_number, "22CS001");
        assert_eq!(students[0].section, "A");
        assert_eq!(students[1].name, "Bala");
        assert_ne!(students[0].id, students[1].id);
    }

    #[test]
    fn header_only_yields_nothing() {
        assert!(parse_student_csv("Vano,RegNo,Name,Dept,Year,Batch\n").is_empty());
        assert!(parse_student_csv("").is_empty());
    }
}
