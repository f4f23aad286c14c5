pub mod attendance;
pub mod auth;
pub mod config;
pub mod holiday;
pub mod master;
pub mod report;
pub mod shell;
pub mod student;
pub mod sync;
pub mod timetable;
pub mod user;

use chrono::NaiveDate;
use edudesk_core::{lock_store, App, EntityStore, Session};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the app, run `f` against the store, and persist the snapshot.
pub fn with_store<T>(
    f: impl FnOnce(&mut EntityStore) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let mut app = App::open()?;
    let out = {
        let mut guard = lock_store(app.store());
        f(&mut *guard)?
    };
    app.persist()?;
    Ok(out)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{raw}' (expected YYYY-MM-DD)").into())
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Sign in with `--as`/`--password` when given; anonymous otherwise.
pub fn session_for(
    store: &EntityStore,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = Session::new();
    if let Some(email) = email {
        let password = password.ok_or("--password is required with --as")?;
        if session.login(store, email, password).is_none() {
            return Err("invalid email or password".into());
        }
    }
    Ok(session)
}
