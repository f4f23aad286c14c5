use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "edudesk", version, about = "EduDesk school administration CLI")]
struct Cli {
    /// Log filter (overrides the configured level; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Google sign-in for Sheets sync
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Staff and admin accounts
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Student roster
    Student {
        #[command(subcommand)]
        action: commands::student::StudentAction,
    },
    /// Class timetables
    Timetable {
        #[command(subcommand)]
        action: commands::timetable::TimetableAction,
    },
    /// Attendance marking
    Attendance {
        #[command(subcommand)]
        action: commands::attendance::AttendanceAction,
    },
    /// Holiday calendar
    Holiday {
        #[command(subcommand)]
        action: commands::holiday::HolidayAction,
    },
    /// Departments, years, sections and batches
    Master {
        #[command(subcommand)]
        action: commands::master::MasterAction,
    },
    /// Attendance analytics and exports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Google Sheets synchronization
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Interactive desk with debounced auto-save
    Shell,
}

fn init_logging(cli_level: Option<&str>) {
    let configured = edudesk_core::Config::load_or_default().logging.level;
    let level = cli_level.unwrap_or(&configured).to_string();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::User { action } => commands::user::run(action),
        Commands::Student { action } => commands::student::run(action),
        Commands::Timetable { action } => commands::timetable::run(action),
        Commands::Attendance { action } => commands::attendance::run(action),
        Commands::Holiday { action } => commands::holiday::run(action),
        Commands::Master { action } => commands::master::run(action),
        Commands::Report { action } => commands::report::run(action),
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Shell => commands::shell::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
