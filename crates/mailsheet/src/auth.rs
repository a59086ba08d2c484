//! Google OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow for installed apps. Uses a
//! local HTTP server to receive the OAuth callback and synchronous HTTP (ureq).
//!
//! A single [`GoogleAuth`] owns the token cache and is shared (via `Arc`) by
//! the Gmail and Sheets clients, so one consent covers both APIs.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

use crate::config::GoogleCredentials;

/// Read access to Gmail
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
/// Read + label changes in Gmail
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";
/// Read/write access to spreadsheets
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Every scope the sync needs; requested together so one token serves both clients
pub const SYNC_SCOPES: &[&str] = &[GMAIL_READONLY_SCOPE, GMAIL_MODIFY_SCOPE, SPREADSHEETS_SCOPE];

/// Seconds before expiry at which a cached token is treated as expired
const EXPIRY_MARGIN_SECS: i64 = 300;

/// OAuth2 configuration and token management for Google APIs
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    token_path: PathBuf,
}

/// Token cache file contents
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl StoredToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now + EXPIRY_MARGIN_SECS)
    }

    fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|s| self.scopes.contains(s))
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    /// Space-separated granted scopes
    scope: Option<String>,
    #[allow(dead_code)]
    token_type: String,
}

impl GoogleAuth {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a new GoogleAuth
    ///
    /// # Arguments
    /// * `credentials` - OAuth client from Google Cloud Console
    /// * `token_path` - Where the token cache is read and written
    /// * `scopes` - Scopes the cached token must carry
    pub fn new(credentials: GoogleCredentials, token_path: PathBuf, scopes: &[&str]) -> Self {
        Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            token_path,
        }
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn get_access_token(&self) -> Result<String> {
        match self.load_token() {
            Ok(token) if token.covers(&self.scopes) => {
                if token.is_fresh(chrono::Utc::now().timestamp()) {
                    return Ok(token.access_token);
                }

                if let Some(refresh_token) = token.refresh_token {
                    match self.refresh_access_token(&refresh_token) {
                        Ok(new_token) => {
                            debug!("Refreshed access token");
                            return self.save_token_response(&new_token, &token.scopes);
                        }
                        Err(e) => warn!("Token refresh failed, re-authenticating: {:#}", e),
                    }
                }
            }
            Ok(_) => info!("Cached token lacks required scopes, re-authenticating"),
            Err(e) => debug!("No usable cached token: {:#}", e),
        }

        // Need to authenticate from scratch
        let token = self.authorization_code_auth()?;
        self.save_token_response(&token, &self.scopes)
    }

    /// Perform authorization code flow authentication
    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        // Step 1: Start local server to receive callback
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        // Step 2: Build authorization URL
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&self.scopes.join(" ")),
        );

        println!("\n=== Google Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        // Step 3: Wait for callback with authorization code
        println!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        // Step 4: Exchange code for tokens
        info!("Exchanging authorization code for tokens");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        info!("Authentication successful");
        Ok(token)
    }

    /// Start a local TCP server on an available port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for OAuth callback and extract authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        let code = query_param(&request_line, "code");
        let error = query_param(&request_line, "error");

        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            anyhow::bail!("OAuth error: {}", err);
        }

        code.context("No authorization code received")
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Preserve the refresh token if not returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    /// Load the token cache; a corrupt file is reported as an error
    fn load_token(&self) -> Result<StoredToken> {
        let content = fs::read_to_string(&self.token_path)?;
        let token: StoredToken = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt token cache: {}", self.token_path.display()))?;
        Ok(token)
    }

    /// Save a token response to the cache and return its access token
    ///
    /// `fallback_scopes` is recorded when the response doesn't list granted scopes.
    fn save_token_response(&self, token: &TokenResponse, fallback_scopes: &[String]) -> Result<String> {
        let scopes = token
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| fallback_scopes.to_vec());

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
            scopes,
        };

        config::save_json_file(&self.token_path, &stored)?;
        Ok(stored.access_token)
    }

    /// Clear the token cache, forcing interactive consent on the next call
    pub fn logout(&self) -> Result<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path).with_context(|| {
                format!("Failed to remove token cache: {}", self.token_path.display())
            })?;
        }
        Ok(())
    }
}

/// Extract a query parameter from an HTTP request line
///
/// Format: `GET /?code=AUTH_CODE&scope=... HTTP/1.1`
fn query_param(request_line: &str, name: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;
    query.split('&').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        (key == name).then(|| {
            urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_auth(token_path: PathBuf) -> GoogleAuth {
        GoogleAuth::new(
            GoogleCredentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
            token_path,
            SYNC_SCOPES,
        )
    }

    fn all_scopes() -> Vec<String> {
        SYNC_SCOPES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_param() {
        let line = "GET /?code=4%2F0Abc&scope=https%3A%2F%2Fmail HTTP/1.1\r\n";
        assert_eq!(query_param(line, "code"), Some("4/0Abc".to_string()));
        assert_eq!(query_param(line, "error"), None);

        let denied = "GET /?error=access_denied HTTP/1.1\r\n";
        assert_eq!(query_param(denied, "error"), Some("access_denied".to_string()));
        assert_eq!(query_param(denied, "code"), None);
    }

    #[test]
    fn test_stored_token_freshness() {
        let now = 1_700_000_000;
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(now + 3600),
            scopes: all_scopes(),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + 3400));

        let no_expiry = StoredToken {
            expires_at: None,
            ..token
        };
        assert!(!no_expiry.is_fresh(now));
    }

    #[test]
    fn test_stored_token_scope_coverage() {
        let token = StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: None,
            scopes: vec![GMAIL_READONLY_SCOPE.to_string(), GMAIL_MODIFY_SCOPE.to_string()],
        };
        assert!(!token.covers(&all_scopes()));
        assert!(token.covers(&[GMAIL_MODIFY_SCOPE.to_string()]));
    }

    #[test]
    fn test_fresh_cached_token_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let stored = StoredToken {
            access_token: "cached-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
            scopes: all_scopes(),
        };
        config::save_json_file(&path, &stored).unwrap();

        let auth = make_auth(path);
        assert_eq!(auth.get_access_token().unwrap(), "cached-token");
    }

    #[test]
    fn test_corrupt_token_cache_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, b"\x80\x04pickle").unwrap();

        let auth = make_auth(path);
        assert!(auth.load_token().is_err());
    }

    #[test]
    fn test_save_token_response_records_granted_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let auth = make_auth(path);

        let response = TokenResponse {
            access_token: "fresh".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3599),
            scope: Some(format!("{} {}", SPREADSHEETS_SCOPE, GMAIL_MODIFY_SCOPE)),
            token_type: "Bearer".to_string(),
        };

        assert_eq!(auth.save_token_response(&response, &[]).unwrap(), "fresh");
        let stored = auth.load_token().unwrap();
        assert_eq!(stored.scopes, vec![SPREADSHEETS_SCOPE, GMAIL_MODIFY_SCOPE]);
        assert!(stored.is_fresh(chrono::Utc::now().timestamp()));
    }

    #[test]
    fn test_logout_removes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{}").unwrap();

        let auth = make_auth(path.clone());
        auth.logout().unwrap();
        assert!(!path.exists());
        // Second logout is a no-op
        auth.logout().unwrap();
    }
}
