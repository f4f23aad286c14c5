//! Google sign-in for the Sheets API.
//!
//! Silent refresh from keyring tokens is always tried first; the browser
//! consent flow runs only when no usable refresh token exists.

use super::oauth::{self, OAuthConfig, OAuthTokens};
use crate::error::OAuthError;

const SERVICE_NAME: &str = "google_sheets";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const REDIRECT_PORT: u16 = 19831;

/// OAuth client credentials for the Sheets scope.
#[derive(Debug, Clone)]
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
}

impl GoogleAuth {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            service_name: SERVICE_NAME.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            scopes: vec![SHEETS_SCOPE.to_string()],
            redirect_port: REDIRECT_PORT,
        }
    }

    /// Tokens currently held in the keyring, if any.
    pub fn stored_tokens(&self) -> Option<OAuthTokens> {
        oauth::load_tokens(SERVICE_NAME)
    }

    /// Return valid tokens without user interaction.
    ///
    /// Fresh stored tokens are returned as-is; expired ones are refreshed.
    /// `TokenExpired` means interaction is required.
    pub async fn silent_tokens(&self) -> Result<OAuthTokens, OAuthError> {
        let tokens = self.stored_tokens().ok_or(OAuthError::TokenExpired)?;
        if !oauth::is_expired(&tokens) {
            return Ok(tokens);
        }
        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::TokenExpired)?;
        tracing::debug!("refreshing Google access token");
        oauth::refresh_token(&self.oauth_config(), refresh).await
    }

    /// Browser consent with loopback redirect.
    pub async fn interactive_tokens(&self) -> Result<OAuthTokens, OAuthError> {
        oauth::authorize(&self.oauth_config()).await
    }

    /// Silent first, interactive as fallback.
    pub async fn sign_in(&self) -> Result<OAuthTokens, OAuthError> {
        match self.silent_tokens().await {
            Ok(tokens) => Ok(tokens),
            Err(e) => {
                tracing::info!(reason = %e, "silent sign-in unavailable, asking for consent");
                self.interactive_tokens().await
            }
        }
    }

    /// Revoke at Google (best effort) and drop the stored tokens.
    pub async fn sign_out(&self) -> Result<(), OAuthError> {
        if let Some(tokens) = self.stored_tokens() {
            let token = tokens.refresh_token.as_deref().unwrap_or(&tokens.access_token);
            if let Err(e) = oauth::revoke(REVOKE_URL, token).await {
                tracing::warn!(error = %e, "token revocation failed; forgetting locally");
            }
        }
        oauth::forget_tokens(SERVICE_NAME)
    }
}
