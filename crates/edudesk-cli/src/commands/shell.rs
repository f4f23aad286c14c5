//! Interactive desk.
//!
//! Keeps one store in memory for the whole session and runs the sync
//! scheduler beside it, so edits are auto-saved to the spreadsheet after
//! the debounce window. Without a complete `[sheets]` config the shell
//! still works, local-only.

use std::sync::Arc;

use edudesk_core::sheets::SheetsClient;
use edudesk_core::{lock_store, App, AttendanceStatus, MasterKind, Session, SyncHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use super::{parse_date, today, CmdResult};

const HELP: &str = "\
commands:
  login <email> <password>        sign in
  logout                          sign out
  whoami                          show the signed-in user
  mark <student-id> <P|A|L> [hour] [YYYY-MM-DD]
  holiday <YYYY-MM-DD> <name...>  declare a holiday
  rename <kind> <old> <new>       rename a master value (dept/year/section/batch)
  status                          show sync status
  load                            reload from Sheets (drops a pending save)
  save                            save to Sheets now
  quit                            flush pending save and exit";

pub fn run() -> CmdResult {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(shell())
}

struct Link {
    handle: SyncHandle,
    task: JoinHandle<()>,
    printer: JoinHandle<()>,
}

async fn connect(app: &App) -> Option<Link> {
    let client: Arc<SheetsClient> = match app.sheets_client() {
        Ok(client) => client,
        Err(e) => {
            println!("Sheets sync disabled: {e}");
            return None;
        }
    };
    let (handle, task) = app.start_scheduler(client.clone());

    // Echo every status line change to the terminal.
    let mut status = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while status.changed().await.is_ok() {
            let message = status.borrow_and_update().message.clone();
            if message != last {
                println!("[sync] {message}");
                last = message;
            }
        }
    });

    match client.sign_in_silent(&app.google_auth()).await {
        Ok(()) => {
            if let Err(e) = handle.notify_ready().await {
                tracing::warn!(error = %e, "scheduler unavailable");
            }
        }
        Err(e) => println!("Not signed in to Google ({e}); run `edudesk auth login`"),
    }
    Some(Link {
        handle,
        task,
        printer,
    })
}

async fn shell() -> CmdResult {
    let mut app = App::open()?;
    let link = connect(&app).await;
    let mut session = Session::new();

    println!("EduDesk shell. Type `help` for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        let outcome: CmdResult = match command {
            "help" => {
                println!("{HELP}");
                Ok(())
            }
            "quit" | "exit" => break,
            "login" => login(&app, &mut session, args),
            "logout" => {
                session.logout();
                Ok(())
            }
            "whoami" => {
                match session.current_user() {
                    Some(user) => println!("{} <{}> {}", user.name, user.email, user.role),
                    None => println!("not signed in"),
                }
                Ok(())
            }
            "mark" => mark(&app, &session, args),
            "holiday" => holiday(&app, args),
            "rename" => rename(&app, args),
            "status" => {
                match &link {
                    Some(link) => {
                        let status = link.handle.status();
                        println!("{} ({})", status.message, status.state);
                        for (table, error) in &status.failed_tables {
                            println!("  {table}: {error}");
                        }
                    }
                    None => println!("sync disabled"),
                }
                Ok(())
            }
            "load" | "save" => match &link {
                Some(link) if command == "load" => link.handle.load_now().await.map_err(Into::into),
                Some(link) => link.handle.save_now().await.map_err(Into::into),
                None => Err("sync disabled".into()),
            },
            other => Err(format!("unknown command '{other}' (try `help`)").into()),
        };
        if let Err(e) = outcome {
            println!("error: {e}");
        }
        if let Err(e) = app.persist() {
            tracing::error!(error = %e, "failed to write local snapshot");
            println!("error: local snapshot not saved: {e}");
        }
    }

    if let Some(link) = link {
        // The scheduler may already be gone if the runtime is shutting down.
        let _ = link.handle.shutdown().await;
        let _ = link.task.await;
        link.printer.abort();
    }
    app.persist()?;
    Ok(())
}

fn login(app: &App, session: &mut Session, args: &[&str]) -> CmdResult {
    let [email, password] = args else {
        return Err("usage: login <email> <password>".into());
    };
    let store = lock_store(app.store());
    match session.login(&store, email, password) {
        Some(user) => {
            println!("Signed in as {}", user.name);
            Ok(())
        }
        None => Err("invalid email or password".into()),
    }
}

fn mark(app: &App, session: &Session, args: &[&str]) -> CmdResult {
    let (student_id, status, rest) = match args {
        [student_id, status, rest @ ..] => (*student_id, status.parse::<AttendanceStatus>()?, rest),
        _ => return Err("usage: mark <student-id> <P|A|L> [hour] [YYYY-MM-DD]".into()),
    };
    let hour = match rest.first() {
        Some(hour) => hour.parse::<u8>()?,
        None => 1,
    };
    let date = match rest.get(1) {
        Some(date) => parse_date(date)?,
        None => today(),
    };
    let mut store = lock_store(app.store());
    if store.find_student(student_id).is_none() {
        return Err(format!("no student with id {student_id}").into());
    }
    let record = session.mark(&mut store, student_id, date, hour, status)?;
    println!("Marked {} {} ({} hour {})", record.student_id, record.status, record.date, record.hour);
    Ok(())
}

fn holiday(app: &App, args: &[&str]) -> CmdResult {
    let Some((date, name)) = args.split_first() else {
        return Err("usage: holiday <YYYY-MM-DD> <name...>".into());
    };
    if name.is_empty() {
        return Err("usage: holiday <YYYY-MM-DD> <name...>".into());
    }
    let date = parse_date(date)?;
    let mut store = lock_store(app.store());
    if let Some(existing) = store.holiday_on(date) {
        return Err(format!("{date} is already a holiday ({})", existing.name).into());
    }
    store.upsert_holiday(edudesk_core::Holiday {
        id: edudesk_core::model::new_id(),
        date,
        name: name.join(" "),
    });
    println!("Holiday added for {date}");
    Ok(())
}

fn rename(app: &App, args: &[&str]) -> CmdResult {
    let [kind, old, new] = args else {
        return Err("usage: rename <kind> <old> <new>".into());
    };
    let kind: MasterKind = kind.parse()?;
    let report = lock_store(app.store()).rename_master_value(kind, old, new)?;
    println!("Renamed {kind} {old} -> {new} ({} records updated)", report.total());
    Ok(())
}
