//! OAuth2 Authorization Code flow for a desktop client.
//!
//! 1. Opens the browser at the consent URL
//! 2. Waits on a loopback listener for the redirect
//! 3. Exchanges the code for an access token (+ refresh token)
//! 4. Stores tokens in the OS keyring

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::keyring_store;
use crate::error::OAuthError;

/// How long the loopback listener waits for the browser.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Tokens are treated as expired this many seconds early.
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub service_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
}

impl OAuthConfig {
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }

    pub fn auth_url_full(&self) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&scopes),
        )
    }

    fn ensure_credentials(&self) -> Result<(), OAuthError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(OAuthError::CredentialsNotConfigured {
                service: self.service_name.clone(),
            });
        }
        Ok(())
    }
}

/// Run the interactive flow: open browser, wait for callback, exchange code.
pub async fn authorize(config: &OAuthConfig) -> Result<OAuthTokens, OAuthError> {
    config.ensure_credentials()?;

    let listener = TcpListener::bind(("127.0.0.1", config.redirect_port)).await?;
    let auth_url = config.auth_url_full();
    tracing::info!(service = %config.service_name, "opening browser for consent");
    if let Err(e) = open::that(&auth_url) {
        // Headless machines can still paste the URL by hand.
        tracing::warn!(error = %e, url = %auth_url, "could not open browser");
    }

    let code = tokio::time::timeout(CALLBACK_TIMEOUT, accept_callback(&listener)).await??;
    drop(listener);

    let tokens = exchange_code(config, &code).await?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

async fn accept_callback(listener: &TcpListener) -> Result<String, OAuthError> {
    let (mut stream, _) = listener.accept().await?;
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let code = match extract_param(&request, "code") {
        Some(code) => code,
        None => {
            let reason = extract_param(&request, "error").unwrap_or_else(|| "no code in callback".into());
            let _ = stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\n\r\nAuthorization failed.")
                .await;
            return Err(OAuthError::InvalidCallback(reason));
        }
    };

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body><h2>Signed in to EduDesk.</h2><p>You can close this tab.</p><script>window.close()</script></body></html>";
    stream.write_all(response.as_bytes()).await?;
    Ok(code)
}

async fn exchange_code(config: &OAuthConfig, code: &str) -> Result<OAuthTokens, OAuthError> {
    let redirect_uri = config.redirect_uri();
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let body: serde_json::Value = Client::new()
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = body.get("error") {
        return Err(OAuthError::TokenExchangeFailed(error.to_string()));
    }
    parse_token_response(&body, None).ok_or_else(|| {
        OAuthError::TokenExchangeFailed("response carried no access_token".into())
    })
}

/// Refresh an access token and store the result.
pub async fn refresh_token(config: &OAuthConfig, refresh: &str) -> Result<OAuthTokens, OAuthError> {
    config.ensure_credentials()?;
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let body: serde_json::Value = Client::new()
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = body.get("error") {
        return Err(OAuthError::TokenRefreshFailed(error.to_string()));
    }
    let tokens = parse_token_response(&body, Some(refresh)).ok_or_else(|| {
        OAuthError::TokenRefreshFailed("response carried no access_token".into())
    })?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

/// Best-effort revocation at the provider.
pub async fn revoke(revoke_url: &str, token: &str) -> Result<(), OAuthError> {
    let resp = Client::new()
        .post(revoke_url)
        .form(&[("token", token)])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(OAuthError::AuthorizationFailed(format!(
            "revocation returned {}",
            resp.status()
        )));
    }
    Ok(())
}

/// Token endpoint JSON -> tokens. A refresh response usually omits the
/// refresh token; `previous_refresh` carries it forward.
fn parse_token_response(body: &serde_json::Value, previous_refresh: Option<&str>) -> Option<OAuthTokens> {
    let access_token = body.get("access_token")?.as_str()?.to_string();
    let expires_at = body
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .map(|ei| chrono::Utc::now().timestamp() + ei);

    Some(OAuthTokens {
        access_token,
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| previous_refresh.map(String::from)),
        expires_at,
        token_type: body
            .get("token_type")
            .and_then(|v| v.as_str())
            .unwrap_or("Bearer")
            .to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    })
}

pub fn store_tokens(service_name: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
    let json = serde_json::to_string(tokens)
        .map_err(|e| OAuthError::Keyring(format!("could not encode tokens: {e}")))?;
    keyring_store::set(service_name, &json)
}

/// Load stored tokens from the keyring.
pub fn load_tokens(service_name: &str) -> Option<OAuthTokens> {
    keyring_store::get(service_name)
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str(&json).ok())
}

pub fn forget_tokens(service_name: &str) -> Result<(), OAuthError> {
    keyring_store::delete(service_name)
}

/// Whether tokens are expired (with a 60 s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    is_expired_at(tokens, chrono::Utc::now().timestamp())
}

fn is_expired_at(tokens: &OAuthTokens, now: i64) -> bool {
    match tokens.expires_at {
        Some(exp) => now > exp - EXPIRY_BUFFER_SECS,
        None => false,
    }
}

fn extract_param(request: &str, name: &str) -> Option<String> {
    let first_line = request.lines().next()?;
    let path = first_line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.to_string())
}
