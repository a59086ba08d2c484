//! Configuration loading
//!
//! Two files live in the mailsheet config directory (~/.config/mailsheet/):
//! - `credentials.json`: the OAuth client secret downloaded from Google Cloud Console
//! - `config.json`: optional app settings (spreadsheet, paths, batch size)
//!
//! `MAILSHEET_SPREADSHEET_ID` overrides the configured spreadsheet.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Client secret filename in the config directory
pub const CREDENTIALS_FILE: &str = "credentials.json";
/// Token cache filename in the config directory
pub const TOKEN_FILE: &str = "google-token.json";
/// App settings filename in the config directory
pub const CONFIG_FILE: &str = "config.json";
/// Log filename in the config directory
pub const LOG_FILE: &str = "sync.log";

/// Environment variable overriding the spreadsheet
pub const SPREADSHEET_ENV: &str = "MAILSHEET_SPREADSHEET_ID";

/// Unread messages fetched per run unless configured otherwise
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Fatal configuration problems, raised before any network activity
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Credentials file not found: {0}\nDownload an OAuth client secret (Desktop app) from Google Cloud Console and save it there"
    )]
    ClientSecretNotFound(PathBuf),
    #[error("Credentials file {0} is missing an 'installed' or 'web' section")]
    MalformedClientSecret(PathBuf),
    #[error(
        "No spreadsheet configured: set \"spreadsheet_id\" in config.json, MAILSHEET_SPREADSHEET_ID, or --spreadsheet-id"
    )]
    MissingSpreadsheetId,
    #[error("Invalid spreadsheet identifier: {0}")]
    InvalidSpreadsheetId(String),
}

/// OAuth client credentials for Google APIs
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GoogleCredentials {
    /// Load credentials from a client secret JSON file
    ///
    /// A missing file is a [`ConfigError::ClientSecretNotFound`].
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::ClientSecretNotFound(path.to_path_buf()).into());
        }

        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
            .ok_or_else(|| ConfigError::MalformedClientSecret(path.to_path_buf()).into())
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
            .context("Credentials JSON missing 'installed' or 'web' section")
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Option<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds.installed.or(creds.web)?;

        Some(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }
}

/// Settings read from `config.json`; every field is optional
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub spreadsheet_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub max_messages: Option<usize>,
}

impl ConfigFile {
    /// Load `config.json` from the config directory, or defaults if it doesn't exist
    pub fn load_default() -> Result<Self> {
        if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }
}

/// Fully resolved settings for one sync run
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bare spreadsheet ID (never a URL)
    pub spreadsheet_id: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub log_file: PathBuf,
    pub max_messages: usize,
}

impl AppConfig {
    /// Resolve settings from the config file, falling back to the config directory defaults
    ///
    /// `spreadsheet_override` wins over the environment, which wins over the file.
    pub fn resolve(file: ConfigFile, spreadsheet_override: Option<String>) -> Result<Self> {
        let dir = config::config_dir().context("Could not determine config directory")?;

        let spreadsheet = spreadsheet_override
            .or_else(|| std::env::var(SPREADSHEET_ENV).ok())
            .or(file.spreadsheet_id)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSpreadsheetId)?;

        Ok(Self {
            spreadsheet_id: parse_spreadsheet_id(&spreadsheet)?,
            credentials_path: file
                .credentials_path
                .unwrap_or_else(|| dir.join(CREDENTIALS_FILE)),
            token_path: file.token_path.unwrap_or_else(|| dir.join(TOKEN_FILE)),
            log_file: file.log_file.unwrap_or_else(|| dir.join(LOG_FILE)),
            max_messages: file.max_messages.unwrap_or(DEFAULT_MAX_MESSAGES),
        })
    }
}

/// Reduce a spreadsheet reference to its bare ID
///
/// Accepts either the ID itself or a full Sheets URL such as
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`.
pub fn parse_spreadsheet_id(value: &str) -> Result<String, ConfigError> {
    let value = value.trim();

    let Ok(url) = Url::parse(value) else {
        return if is_valid_id(value) {
            Ok(value.to_string())
        } else {
            Err(ConfigError::InvalidSpreadsheetId(value.to_string()))
        };
    };

    let mut segments = url.path_segments().into_iter().flatten();
    segments
        .by_ref()
        .find(|segment| *segment == "d")
        .and_then(|_| segments.next())
        .filter(|id| is_valid_id(id))
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidSpreadsheetId(value.to_string()))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
