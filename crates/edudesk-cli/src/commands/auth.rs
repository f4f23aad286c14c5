use clap::Subcommand;
use edudesk_core::{App, Config};

use super::CmdResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in to Google (browser consent when no stored token works)
    Login {
        /// OAuth client ID; saved to config when given
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret; saved to config when given
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Revoke and forget the stored token
    Logout,
    /// Check authentication status
    Status,
}

pub fn run(action: AuthAction) -> CmdResult {
    let runtime = tokio::runtime::Runtime::new()?;
    match action {
        AuthAction::Login {
            client_id,
            client_secret,
        } => {
            if client_id.is_some() || client_secret.is_some() {
                let mut config = Config::load()?;
                if let Some(id) = client_id {
                    config.sheets.client_id = id;
                }
                if let Some(secret) = client_secret {
                    config.sheets.client_secret = secret;
                }
                config.save()?;
            }
            let app = App::open()?;
            let client = app.sheets_client()?;
            runtime.block_on(client.sign_in(&app.google_auth()))?;
            println!("Google authenticated");
        }
        AuthAction::Logout => {
            let app = App::open()?;
            runtime.block_on(app.google_auth().sign_out())?;
            println!("Google disconnected");
        }
        AuthAction::Status => {
            let app = App::open()?;
            let auth = app.google_auth();
            let status = match auth.stored_tokens() {
                None => "not authenticated",
                Some(tokens) if edudesk_core::integrations::oauth::is_expired(&tokens) => {
                    "token expired (refreshes on next sync)"
                }
                Some(_) => "authenticated",
            };
            println!("{status}");
            if !auth.is_configured() {
                println!("client credentials not configured");
            }
            let missing = app.config.sheets.missing_fields();
            if !missing.is_empty() {
                println!("missing config: {}", missing.join(", "));
            }
        }
    }
    Ok(())
}
