//! Google Sheets v4 values client.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;

use super::{sheet_of, RemoteTable, Rows};
use crate::error::CoreError;
use crate::integrations::oauth::{self, OAuthTokens};
use crate::integrations::GoogleAuth;
use crate::storage::SheetsConfig;
use crate::sync::SyncError;

/// Two-stage readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    Uninitialized,
    /// Configuration checked; no token yet.
    ClientReady,
    Authorized(OAuthTokens),
}

/// Sheets API client bound to one spreadsheet.
pub struct SheetsClient {
    config: SheetsConfig,
    http: Client,
    state: RwLock<Handshake>,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            http: Client::new(),
            state: RwLock::new(Handshake::Uninitialized),
        }
    }

    pub fn handshake(&self) -> Handshake {
        self.read_state().clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, Handshake> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: Handshake) {
        *self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    /// Stage one: check that the configuration names a key and a spreadsheet.
    pub fn init_client(&self) -> Result<(), SyncError> {
        let missing = self.config.missing_fields();
        if !missing.is_empty() {
            return Err(SyncError::Config(format!("missing {}", missing.join(", "))));
        }
        if matches!(*self.read_state(), Handshake::Uninitialized) {
            self.set_state(Handshake::ClientReady);
        }
        tracing::debug!(spreadsheet = %self.config.spreadsheet_id, "sheets client initialised");
        Ok(())
    }

    /// Stage two with tokens obtained elsewhere.
    pub fn authorize_with(&self, tokens: OAuthTokens) -> Result<(), SyncError> {
        if matches!(*self.read_state(), Handshake::Uninitialized) {
            return Err(SyncError::NotReady);
        }
        self.set_state(Handshake::Authorized(tokens));
        Ok(())
    }

    /// Full handshake: silent token first, browser consent as fallback.
    pub async fn sign_in(&self, auth: &GoogleAuth) -> Result<(), CoreError> {
        self.init_client()?;
        let tokens = auth.sign_in().await?;
        self.authorize_with(tokens)?;
        tracing::info!("Connected to Google");
        Ok(())
    }

    /// Handshake without any user interaction.
    pub async fn sign_in_silent(&self, auth: &GoogleAuth) -> Result<(), CoreError> {
        self.init_client()?;
        let tokens = auth.silent_tokens().await?;
        self.authorize_with(tokens)?;
        Ok(())
    }

    /// Revoke and forget the token; the client stays initialised but not ready.
    pub async fn sign_out(&self, auth: &GoogleAuth) -> Result<(), CoreError> {
        let initialised = !matches!(*self.read_state(), Handshake::Uninitialized);
        self.set_state(if initialised {
            Handshake::ClientReady
        } else {
            Handshake::Uninitialized
        });
        auth.sign_out().await?;
        Ok(())
    }

    fn token(&self) -> Result<String, SyncError> {
        match &*self.read_state() {
            Handshake::Authorized(tokens) if oauth::is_expired(tokens) => Err(
                SyncError::RemoteUnavailable("session token expired".into()),
            ),
            Handshake::Authorized(tokens) => Ok(tokens.access_token.clone()),
            _ => Err(SyncError::NotReady),
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.spreadsheet_id,
            urlencoding::encode(range),
            suffix
        )
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .query(&[("key", self.config.api_key.as_str())])
    }

    async fn send(&self, range: &str, request: RequestBuilder) -> Result<Response, SyncError> {
        let resp = request
            .send()
            .await
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
            .to_string();
        tracing::debug!(%range, status = status.as_u16(), %message, "sheets request rejected");

        Err(match status {
            StatusCode::BAD_REQUEST if message.contains("Unable to parse range") => {
                SyncError::MissingTable(sheet_of(range).to_string())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SyncError::RemoteUnavailable(message)
            }
            _ => SyncError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RemoteTable for SheetsClient {
    fn is_ready(&self) -> bool {
        matches!(*self.read_state(), Handshake::Authorized(_))
    }

    async fn read(&self, range: &str) -> Result<Rows, SyncError> {
        let token = self.token()?;
        let request = self.authed(self.http.get(self.values_url(range, "")), &token);
        let body: serde_json::Value = self.send(range, request).await?.json().await?;

        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn clear(&self, range: &str) -> Result<(), SyncError> {
        let token = self.token()?;
        let request = self
            .authed(self.http.post(self.values_url(range, ":clear")), &token)
            .json(&json!({}));
        self.send(range, request).await?;
        Ok(())
    }

    async fn write(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        let token = self.token()?;
        let request = self
            .authed(self.http.put(self.values_url(range, "")), &token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }));
        self.send(range, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> SheetsConfig {
        SheetsConfig {
            api_key: "test-key".into(),
            client_id: String::new(),
            client_secret: String::new(),
            spreadsheet_id: "sheet-1".into(),
            base_url: base_url.into(),
        }
    }

    fn tokens(expires_at: Option<i64>) -> OAuthTokens {
        OAuthTokens {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at,
            token_type: "Bearer".into(),
            scope: None,
        }
    }

    fn ready_client(base_url: &str) -> SheetsClient {
        let client = SheetsClient::new(config(base_url));
        client.init_client().unwrap();
        client.authorize_with(tokens(None)).unwrap();
        client
    }

    #[test]
    fn test_init_requires_config() {
        let client = SheetsClient::new(SheetsConfig::default());
        assert!(matches!(client.init_client(), Err(SyncError::Config(_))));
        assert_eq!(client.handshake(), Handshake::Uninitialized);
        assert!(matches!(
            client.authorize_with(tokens(None)),
            Err(SyncError::NotReady)
        ));
    }

    #[test]
    fn test_handshake_stages() {
        let client = SheetsClient::new(config("http://localhost"));
        assert!(!client.is_ready());
        client.init_client().unwrap();
        assert_eq!(client.handshake(), Handshake::ClientReady);
        assert!(!client.is_ready());
        client.authorize_with(tokens(None)).unwrap();
        assert!(client.is_ready());
    }

    #[tokio::test]
    async fn test_not_ready_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = SheetsClient::new(config(&server.url()));
        client.init_client().unwrap();
        assert!(matches!(client.read("Users!A2:G").await, Err(SyncError::NotReady)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_unavailable() {
        let client = SheetsClient::new(config("http://localhost"));
        client.init_client().unwrap();
        client.authorize_with(tokens(Some(0))).unwrap();
        assert!(matches!(
            client.clear("Users!A:G").await,
            Err(SyncError::RemoteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_read_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/v4/spreadsheets/sheet-1/values/Users".into()))
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"range":"Users!A2:G","values":[["1","Admin","admin@edu.com"],["2",3]]}"#)
            .create_async()
            .await;

        let client = ready_client(&server.url());
        let rows = client.read("Users!A2:G").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], "admin@edu.com");
        assert_eq!(rows[1], vec!["2".to_string(), "3".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_empty_range() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/v4/spreadsheets/sheet-1/values/".into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"range":"Holidays!A2:C","majorDimension":"ROWS"}"#)
            .create_async()
            .await;

        let client = ready_client(&server.url());
        assert!(client.read("Holidays!A2:C").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_uses_raw_input() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Regex(r"^/v4/spreadsheets/sheet-1/values/Holidays".into()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("valueInputOption".into(), "RAW".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .match_body(Matcher::PartialJson(json!({
                "majorDimension": "ROWS",
                "values": [["ID", "Date", "Name"], ["h1", "2024-01-26", "Republic Day"]],
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ready_client(&server.url());
        let rows = vec![
            vec!["ID".to_string(), "Date".to_string(), "Name".to_string()],
            vec!["h1".to_string(), "2024-01-26".to_string(), "Republic Day".to_string()],
        ];
        client.write("Holidays!A1", &rows).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_clear_posts_to_clear_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(r":clear$".into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ready_client(&server.url());
        client.clear("Users!A:G").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_sheet_maps_to_missing_table() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"Unable to parse range: Master!A2:B","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let client = ready_client(&server.url());
        assert!(matches!(
            client.read("Master!A2:B").await,
            Err(SyncError::MissingTable(name)) if name == "Master"
        ));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error":{"code":500,"message":"Internal error"}}"#)
            .create_async()
            .await;

        let client = ready_client(&server.url());
        let err = client.write("Users!A1", &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let client = ready_client("http://127.0.0.1:9");
        assert!(matches!(
            client.read("Users!A2:G").await,
            Err(SyncError::RemoteUnavailable(_))
        ));
    }
}
