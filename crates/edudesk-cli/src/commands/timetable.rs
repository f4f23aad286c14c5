use std::path::PathBuf;

use clap::Subcommand;
use edudesk_core::model::{DAYS_OF_WEEK, HOURS_PER_DAY};
use edudesk_core::report::export_timetable_csv;

use super::{print_json, session_for, with_store, CmdResult};

#[derive(Subcommand)]
pub enum TimetableAction {
    /// Show a class timetable as a day-order grid
    Show {
        /// Class key, e.g. CSE-III-A
        class_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assign a subject and staff member to a slot (admin only)
    Set {
        class_id: String,
        /// Day order (I..VI)
        #[arg(long)]
        day: String,
        #[arg(long)]
        hour: u8,
        #[arg(long)]
        subject: String,
        /// Staff user id
        #[arg(long)]
        staff: String,
        /// Admin email
        #[arg(long = "as")]
        as_email: String,
        #[arg(long)]
        password: String,
    },
    /// Remove a slot entry
    Remove { id: String },
    /// Export a class timetable as CSV
    Export {
        class_id: String,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub fn run(action: TimetableAction) -> CmdResult {
    match action {
        TimetableAction::Show { class_id, json } => with_store(|store| {
            if json {
                let entries: Vec<_> = store.timetable().iter().filter(|t| t.class_id == class_id).collect();
                return print_json(&entries);
            }
            println!("Timetable for {class_id}");
            for day in DAYS_OF_WEEK {
                let cells: Vec<String> = (1..=HOURS_PER_DAY)
                    .map(|hour| match store.slot(day, hour, &class_id) {
                        Some(entry) => {
                            let staff = store
                                .find_user(&entry.staff_id)
                                .map(|u| u.name.as_str())
                                .unwrap_or("?");
                            format!("{} ({staff})", entry.subject)
                        }
                        None => "-".to_string(),
                    })
                    .collect();
                println!("{day:>4}: {}", cells.join(" | "));
            }
            Ok(())
        }),
        TimetableAction::Set {
            class_id,
            day,
            hour,
            subject,
            staff,
            as_email,
            password,
        } => with_store(|store| {
            if !DAYS_OF_WEEK.contains(&day.as_str()) {
                return Err(format!("unknown day order '{day}' (expected one of {})", DAYS_OF_WEEK.join(", ")).into());
            }
            let session = session_for(store, Some(&as_email), Some(&password))?;
            let entry = session.set_timetable_slot(store, &day, hour, &class_id, &subject, &staff)?;
            println!("Slot set: {} hour {} -> {}", entry.day, entry.hour, entry.subject);
            Ok(())
        }),
        TimetableAction::Remove { id } => with_store(|store| {
            if !store.remove_timetable(&id) {
                return Err(format!("no timetable entry with id {id}").into());
            }
            println!("Slot removed: {id}");
            Ok(())
        }),
        TimetableAction::Export { class_id, out } => with_store(|store| {
            let csv = export_timetable_csv(store, &class_id)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{csv}"),
            }
            Ok(())
        }),
    }
}
