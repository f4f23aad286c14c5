//! Student roster commands for CLI.

use std::path::PathBuf;

use clap::Subcommand;
use edudesk_core::model::{new_id, DEFAULT_SECTION};
use edudesk_core::store::parse_student_csv;
use edudesk_core::Student;

use super::{print_json, with_store, CmdResult};

#[derive(Subcommand)]
pub enum StudentAction {
    /// List students, optionally for one class
    List {
        #[arg(long)]
        dept: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        section: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enrol one student
    Add {
        #[arg(long)]
        vano: String,
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        dept: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        batch: String,
        #[arg(long, default_value = DEFAULT_SECTION)]
        section: String,
    },
    /// Bulk import from CSV (Vano, Register Number, Name, Department, Year, Batch)
    Import { file: PathBuf },
    /// Remove a student
    Remove { id: String },
}

pub fn run(action: StudentAction) -> CmdResult {
    match action {
        StudentAction::List {
            dept,
            year,
            section,
            json,
        } => with_store(|store| {
            let matches = |value: &str, filter: &Option<String>| filter.as_deref().map_or(true, |f| f == value);
            let students: Vec<&Student> = store
                .students()
                .iter()
                .filter(|s| matches(&s.department, &dept) && matches(&s.year, &year) && matches(&s.section, &section))
                .collect();
            if json {
                return print_json(&students);
            }
            for s in &students {
                println!(
                    "{}  {:<12} {:<24} {}-{}-{}  {}",
                    s.id, s.register_number, s.name, s.department, s.year, s.section, s.batch
                );
            }
            println!("{} student(s)", students.len());
            Ok(())
        }),
        StudentAction::Add {
            vano,
            reg_no,
            name,
            dept,
            year,
            batch,
            section,
        } => with_store(|store| {
            let student = Student {
                id: new_id(),
                vano,
                register_number: reg_no,
                name,
                department: dept,
                year,
                batch,
                section,
            };
            let id = student.id.clone();
            store.upsert_student(student);
            println!("Student added: {id}");
            Ok(())
        }),
        StudentAction::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            let students = parse_student_csv(&text);
            with_store(|store| {
                let added = store.add_students(students);
                println!("Imported {added} student(s) from {}", file.display());
                Ok(())
            })
        }
        StudentAction::Remove { id } => with_store(|store| {
            if !store.remove_student(&id) {
                return Err(format!("no student with id {id}").into());
            }
            println!("Student removed: {id}");
            Ok(())
        }),
    }
}
