//! sheet-sync - copy unread Gmail messages into a Google Sheet
//!
//! One run fetches the unread inbox, appends new messages as rows, and marks
//! them read. Exits non-zero if any step fails.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

use mailsheet::config::{CONFIG_FILE, LOG_FILE};
use mailsheet::{
    AppConfig, ConfigFile, GmailClient, GoogleAuth, GoogleCredentials, SYNC_SCOPES, SheetsClient,
    sync_inbox,
};

mod logging;

#[derive(Parser)]
#[command(name = "sheet-sync")]
#[command(about = "Copy unread Gmail messages into a Google Sheet", long_about = None)]
struct Cli {
    /// Settings file (default: ~/.config/mailsheet/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Spreadsheet ID or URL; overrides the config file and MAILSHEET_SPREADSHEET_ID
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// OAuth client secret JSON from Google Cloud Console
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Token cache file
    #[arg(long)]
    token: Option<PathBuf>,

    /// Log file (appended)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Maximum unread messages fetched in one run
    #[arg(long)]
    max_messages: Option<usize>,

    /// Discard the cached token and sign in again
    #[arg(long)]
    reauth: bool,
}

impl Cli {
    /// Fold command-line overrides into the config file settings
    fn apply(&self, mut file: ConfigFile) -> ConfigFile {
        if let Some(path) = &self.credentials {
            file.credentials_path = Some(path.clone());
        }
        if let Some(path) = &self.token {
            file.token_path = Some(path.clone());
        }
        if let Some(path) = &self.log_file {
            file.log_file = Some(path.clone());
        }
        if let Some(max) = self.max_messages {
            file.max_messages = Some(max);
        }
        file
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Bootstrap config directory
    config::init()?;

    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };
    let file = cli.apply(file);

    let log_file = match &file.log_file {
        Some(path) => path.clone(),
        None => config::config_path(LOG_FILE).unwrap_or_else(|| PathBuf::from(LOG_FILE)),
    };
    logging::init(&log_file)?;

    let (gmail, sheets) =
        build_clients(&cli, file).inspect_err(|e| error!("Error in setup: {:?}", e))?;

    // The sync logs its own failures
    let stats = sync_inbox(&gmail, &sheets)?;
    info!(
        "Fetched {}, skipped {} duplicate(s), dropped {}, appended {}",
        stats.messages_fetched,
        stats.duplicates_skipped,
        stats.messages_dropped,
        stats.rows_appended
    );
    Ok(())
}

/// Resolve settings and construct both clients around one shared auth
fn build_clients(cli: &Cli, file: ConfigFile) -> Result<(GmailClient, SheetsClient)> {
    let app = AppConfig::resolve(file, cli.spreadsheet_id.clone()).map_err(|e| {
        e.context(format!(
            "Invalid configuration (see {})",
            config::config_path(CONFIG_FILE)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| CONFIG_FILE.to_string())
        ))
    })?;

    // Fatal before any network activity if the client secret is missing
    let credentials = GoogleCredentials::from_file(&app.credentials_path)?;

    let auth = Arc::new(GoogleAuth::new(
        credentials,
        app.token_path.clone(),
        SYNC_SCOPES,
    ));
    if cli.reauth {
        info!("Discarding cached token at {}", app.token_path.display());
        auth.logout()?;
    }

    let gmail = GmailClient::new(Arc::clone(&auth)).with_max_messages(app.max_messages);
    let sheets = SheetsClient::new(auth, app.spreadsheet_id.as_str());

    Ok((gmail, sheets))
}
