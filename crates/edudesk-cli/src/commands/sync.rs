//! Sync subcommand for the Google Sheets mirror.
//!
//! One-shot passes: sign in silently, run a whole load or save, print the
//! per-table outcome, then persist the local snapshot.

use clap::Subcommand;
use edudesk_core::sync::PassReport;
use edudesk_core::{App, SyncEngine};

use super::CmdResult;

/// Sync actions for the spreadsheet.
#[derive(Subcommand)]
pub enum SyncAction {
    /// Replace local collections with the spreadsheet contents
    Load,
    /// Overwrite the spreadsheet with local data
    Save,
    /// Show configuration, sign-in and snapshot status
    Status,
}

/// Run the sync command.
pub fn run(action: SyncAction) -> CmdResult {
    match action {
        SyncAction::Load => run_pass(Pass::Load),
        SyncAction::Save => run_pass(Pass::Save),
        SyncAction::Status => show_status(),
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Load,
    Save,
}

fn run_pass(pass: Pass) -> CmdResult {
    let mut app = App::open()?;
    let client = app.sheets_client()?;
    let auth = app.google_auth();
    let engine = SyncEngine::new(client.clone());
    let store = app.store().clone();

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        client.sign_in_silent(&auth).await?;
        let report = match pass {
            Pass::Load => engine.load_all(&store).await,
            Pass::Save => engine.save_all(&store).await,
        };
        Ok::<_, edudesk_core::CoreError>(report)
    })?;

    print_report(pass, &report);
    app.persist()?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(format!("{} table(s) failed", report.failed.len()).into())
    }
}

fn print_report(pass: Pass, report: &PassReport) {
    let verb = match pass {
        Pass::Load => "Loaded",
        Pass::Save => "Saved",
    };
    for table in &report.succeeded {
        println!("{verb}: {table}");
    }
    for table in &report.skipped {
        println!("Skipped: {table}");
    }
    for (table, error) in &report.failed {
        eprintln!("Failed: {table} - {error}");
    }
    match (pass, report.is_clean()) {
        (Pass::Load, true) => println!("Data loaded from Sheets"),
        (Pass::Load, false) => println!("Load Failed"),
        (Pass::Save, true) => println!("All changes saved to Drive"),
        (Pass::Save, false) => println!("Sync Failed"),
    }
}

/// Show sync status.
fn show_status() -> CmdResult {
    let app = App::open()?;
    println!("Sync Status:");
    println!();

    let missing = app.config.sheets.missing_fields();
    if missing.is_empty() {
        println!("  Spreadsheet: {}", app.config.sheets.spreadsheet_id);
    } else {
        println!("  Spreadsheet: not configured (missing {})", missing.join(", "));
    }

    let signed_in = app.google_auth().stored_tokens().is_some();
    println!("  Google: {}", if signed_in { "signed in" } else { "not signed in" });
    println!(
        "  Auto-save: {} (debounce {} ms, settle {} ms)",
        if app.config.sync.auto_save { "on" } else { "off" },
        app.config.sync.debounce_ms,
        app.config.sync.settle_ms
    );
    match app.db().saved_at()? {
        Some(at) => println!("  Local snapshot: {}", at.to_rfc3339()),
        None => println!("  Local snapshot: none"),
    }
    Ok(())
}
