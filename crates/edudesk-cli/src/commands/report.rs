//! Attendance analytics commands for CLI.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use edudesk_core::report::{self, ClassStatus, MonthRegister};

use super::{parse_date, print_json, today, with_store, CmdResult};

#[derive(Args)]
pub struct DayArgs {
    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
    /// Teaching hour 1-6
    #[arg(long, default_value = "1")]
    hour: u8,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Totals and per-class submission status
    Daily(DayArgs),
    /// Per-department breakdown
    Departments(DayArgs),
    /// Pending classes grouped by staff
    Faculty(DayArgs),
    /// Attendance percentage over the seven days ending on the date
    Trend(DayArgs),
    /// Monthly register for one class and hour as CSV
    Export {
        /// YYYY-MM
        #[arg(long)]
        month: String,
        #[arg(long)]
        dept: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        section: String,
        #[arg(long, default_value = "1")]
        hour: u8,
        /// Output file (default: Attendance_<dept>_<year>_<section>_Hour<h>_<month>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },
}

fn day(args: &DayArgs) -> Result<chrono::NaiveDate, Box<dyn std::error::Error>> {
    Ok(args.date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today))
}

pub fn run(action: ReportAction) -> CmdResult {
    match action {
        ReportAction::Daily(args) => with_store(|store| {
            let stats = report::daily_stats(store, day(&args)?, args.hour);
            if args.json {
                return print_json(&stats);
            }
            println!("{}  hour {}", stats.date, stats.hour);
            println!(
                "Students: {}  Marked: {}  Present: {}  Absent: {}  Late: {}  ({}%)",
                stats.total_students, stats.total_marked, stats.present, stats.absent, stats.late, stats.attendance_percentage
            );
            println!("Classes updated: {}/{}", stats.classes_updated, stats.classes_total);
            for class in &stats.class_status {
                let state = match class.status {
                    ClassStatus::Updated => format!("{:>3}%", class.percentage),
                    ClassStatus::Pending => "PENDING".to_string(),
                };
                let faculty = if class.faculty.is_empty() {
                    "-".to_string()
                } else {
                    class.faculty.join(", ")
                };
                println!("  {:<16} {:>8}  {faculty}", class.class_id, state);
            }
            Ok(())
        }),
        ReportAction::Departments(args) => with_store(|store| {
            let stats = report::daily_stats(store, day(&args)?, args.hour);
            let metrics = report::department_metrics(store, &stats);
            if args.json {
                return print_json(&metrics);
            }
            for m in &metrics {
                println!(
                    "{:<8} students {:>4}  marked {:>4}  P {:>4}  A {:>4}  L {:>4}  pending: {}",
                    m.name,
                    m.total_students,
                    m.marked,
                    m.present,
                    m.absent,
                    m.late,
                    if m.pending_classes.is_empty() { "-".to_string() } else { m.pending_classes.join(", ") }
                );
            }
            Ok(())
        }),
        ReportAction::Faculty(args) => with_store(|store| {
            let stats = report::daily_stats(store, day(&args)?, args.hour);
            let pending = report::faculty_pending(store, &stats);
            if args.json {
                return print_json(&pending);
            }
            if pending.is_empty() {
                println!("All classes updated");
            }
            for p in &pending {
                println!("{} ({}): {}", p.staff_name, p.department, p.pending_classes.join(", "));
            }
            Ok(())
        }),
        ReportAction::Trend(args) => with_store(|store| {
            let trend = report::weekly_trend(store, day(&args)?, args.hour);
            if args.json {
                return print_json(&trend);
            }
            for point in &trend {
                println!("{}  {:>3}%", point.label, point.percentage);
            }
            Ok(())
        }),
        ReportAction::Export {
            month,
            dept,
            year,
            section,
            hour,
            out,
            stdout,
        } => with_store(|store| {
            let register = MonthRegister {
                month,
                department: dept,
                year,
                section,
                hour,
            };
            let csv = report::export_month_csv(store, &register)?;
            if stdout {
                print!("{csv}");
                return Ok(());
            }
            let path = out.unwrap_or_else(|| PathBuf::from(report::export_file_name(&register)));
            std::fs::write(&path, csv)?;
            println!("Wrote {}", path.display());
            Ok(())
        }),
    }
}
