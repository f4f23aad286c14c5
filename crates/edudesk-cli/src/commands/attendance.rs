//! Attendance marking commands for CLI.

use clap::Subcommand;
use edudesk_core::session::class_roster;
use edudesk_core::AttendanceStatus;

use super::{parse_date, print_json, session_for, today, with_store, CmdResult};

#[derive(Subcommand)]
pub enum AttendanceAction {
    /// Mark one student
    Mark {
        student_id: String,
        /// present, absent or late (P/A/L also accepted)
        status: AttendanceStatus,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Teaching hour 1-6
        #[arg(long, default_value = "1")]
        hour: u8,
        /// Email of the marking user
        #[arg(long = "as")]
        as_email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the register of one class for one date and hour
    Class {
        #[arg(long)]
        dept: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        section: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "1")]
        hour: u8,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one record
    Remove { id: String },
}

pub fn run(action: AttendanceAction) -> CmdResult {
    match action {
        AttendanceAction::Mark {
            student_id,
            status,
            date,
            hour,
            as_email,
            password,
        } => with_store(|store| {
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
            if store.find_student(&student_id).is_none() {
                return Err(format!("no student with id {student_id}").into());
            }
            let session = session_for(store, as_email.as_deref(), password.as_deref())?;
            let record = session.mark(store, &student_id, date, hour, status)?;
            println!("Marked {} {} for {} hour {}", record.student_id, record.status, record.date, record.hour);
            Ok(())
        }),
        AttendanceAction::Class {
            dept,
            year,
            section,
            date,
            hour,
            json,
        } => with_store(|store| {
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
            if let Some(holiday) = store.holiday_on(date) {
                println!("Holiday: {} ({date})", holiday.name);
                return Ok(());
            }
            let roster = class_roster(store, &dept, &year, &section);
            let rows: Vec<serde_json::Value> = roster
                .iter()
                .map(|s| {
                    let status = store.attendance_for(&s.id, date, hour).map(|r| r.status);
                    serde_json::json!({
                        "student_id": s.id,
                        "register_number": s.register_number,
                        "name": s.name,
                        "status": status,
                    })
                })
                .collect();
            if json {
                return print_json(&rows);
            }
            println!("{dept}-{year}-{section}  {date}  hour {hour}");
            for (s, row) in roster.iter().zip(&rows) {
                let status = row["status"].as_str().unwrap_or("-");
                println!("  {:<12} {:<24} {status}", s.register_number, s.name);
            }
            Ok(())
        }),
        AttendanceAction::Remove { id } => with_store(|store| {
            if !store.remove_attendance(&id) {
                return Err(format!("no attendance record with id {id}").into());
            }
            println!("Record removed: {id}");
            Ok(())
        }),
    }
}
