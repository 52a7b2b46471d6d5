//! Configuration file handling.
//!
//! The configuration file is stored at `$EXPENSE_BOT_HOME/config.json` and contains the settings
//! that rarely change: the sheet name, the chat that replies go to, the store table, timeouts and
//! the locations of the OAuth files. The two secrets that identify the deployment, the spreadsheet
//! ID and the bot token, come from the environment (`SPREADSHEET_ID` and `BOT_TOKEN`) and are set
//! on the `Config` after it is loaded.

use crate::error::Res;
use crate::model::Stores;
use crate::utils;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "expense-bot";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
const DEFAULT_SHEET_NAME: &str = "工作表1";
const DEFAULT_CHAT_ID: &str = "188909374";
const DEFAULT_WEBHOOK_PATH: &str = "/telegramBot";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$EXPENSE_BOT_HOME` and from there it loads `config.json`. It provides paths to other
/// items that are either configurable or are expected in a certain location within the home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    stores: Stores,
    spreadsheet_id: String,
    bot_token: String,
}

impl Config {
    /// Creates the home directory, its subdirectories and:
    /// - Creates an initial `config.json` file with default settings
    /// - Moves `secret_file` into its default location in the home directory.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g.
    ///   `$HOME/.expense-bot`
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
    ///   OAuth workflow. This will be moved from the `secret_file` path to its default location.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, secret_file: &Path) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() {
            bail!(
                "A config file already exists at '{}', refusing to overwrite it",
                config_path.display()
            );
        }

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;
        utils::rename(secret_file, secrets_dir.join(CLIENT_SECRET_JSON)).await?;

        let config_file = ConfigFile {
            stores: Some(Stores::default()),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            stores: Stores::default(),
            spreadsheet_id: String::new(),
            bot_token: String::new(),
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load and validate the config file, including the store table
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Res<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing, run 'expense-bot init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let stores = config_file.stores.clone().unwrap_or_default();

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            stores,
            spreadsheet_id: String::new(),
            bot_token: String::new(),
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    /// Sets the ledger spreadsheet ID. Accepts either a bare ID or a Google Sheets URL.
    pub fn set_spreadsheet_id(&mut self, id_or_url: &str) -> Res<()> {
        self.spreadsheet_id = extract_spreadsheet_id(id_or_url)?.to_string();
        Ok(())
    }

    pub fn set_bot_token(&mut self, bot_token: impl Into<String>) {
        self.bot_token = bot_token.into();
    }

    pub fn set_telegram_api_url(&mut self, url: impl Into<String>) {
        self.config_file.telegram_api_url = url.into();
    }

    /// Checks that everything the webhook server needs is present.
    pub fn validate_for_serve(&self) -> Res<()> {
        ensure!(
            !self.spreadsheet_id.is_empty(),
            "The spreadsheet ID is missing, set SPREADSHEET_ID or pass --spreadsheet-id"
        );
        ensure!(
            !self.bot_token.is_empty(),
            "The bot token is missing, set BOT_TOKEN or pass --bot-token"
        );
        ensure!(
            self.config_file.webhook_path.starts_with('/'),
            "The webhook_path '{}' must start with '/'",
            self.config_file.webhook_path
        );
        ensure!(
            !self.config_file.chat_id.is_empty(),
            "The chat_id in the config file is empty"
        );
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn sheet_name(&self) -> &str {
        &self.config_file.sheet_name
    }

    pub fn chat_id(&self) -> &str {
        &self.config_file.chat_id
    }

    pub fn webhook_path(&self) -> &str {
        &self.config_file.webhook_path
    }

    pub fn telegram_api_url(&self) -> &str {
        &self.config_file.telegram_api_url
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.ledger_timeout_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.reply_timeout_secs)
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.token_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve_secrets_file_path(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "expense-bot",
///   "config_version": 1,
///   "sheet_name": "工作表1",
///   "chat_id": "188909374",
///   "webhook_path": "/telegramBot",
///   "telegram_api_url": "https://api.telegram.org",
///   "ledger_timeout_secs": 10,
///   "reply_timeout_secs": 10,
///   "stores": [
///     {"shortcut": "SF", "location": "North Vancouver", "name": "Save on Foods", "category": "food"}
///   ],
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
struct ConfigFile {
    /// Application name, should always be "expense-bot"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The tab of the spreadsheet that holds the ledger
    sheet_name: String,

    /// The Telegram chat that all replies are sent to
    chat_id: String,

    /// The path that Telegram posts webhook updates to
    webhook_path: String,

    /// Base URL of the Telegram Bot API
    telegram_api_url: String,

    /// Upper bound for each call to the Google Sheets API
    ledger_timeout_secs: u64,

    /// Upper bound for each call to the Telegram API
    reply_timeout_secs: u64,

    /// The store table, in priority order. Defaults to the built-in stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    stores: Option<Stores>,

    /// Path to the OAuth 2.0 client credentials file (optional, relative to config.json or absolute)
    /// Defaults to $EXPENSE_BOT_HOME/.secrets/client_secret.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file (optional, relative to config.json or absolute)
    /// Defaults to $EXPENSE_BOT_HOME/.secrets/token.json if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            chat_id: DEFAULT_CHAT_ID.to_string(),
            webhook_path: DEFAULT_WEBHOOK_PATH.to_string(),
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            ledger_timeout_secs: DEFAULT_TIMEOUT_SECS,
            reply_timeout_secs: DEFAULT_TIMEOUT_SECS,
            stores: None,
            client_secret_path: None,
            token_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the store table is invalid
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.ledger_timeout_secs > 0 && config.reply_timeout_secs > 0,
            "Timeouts in the config file must be greater than zero"
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// If None, defaults to $EXPENSE_BOT_HOME/.secrets/client_secret.json
    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    /// If None, defaults to $EXPENSE_BOT_HOME/.secrets/token.json
    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL. Anything that does not look like a URL is
/// taken to be the ID itself.
///
/// # Arguments
/// * `s` - e.g. "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit" or "SPREADSHEET_ID"
fn extract_spreadsheet_id(s: &str) -> Res<&str> {
    let s = s.trim();
    if !s.contains('/') {
        return Ok(s);
    }

    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = s.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split(['?', '#'])
                .next()
                .unwrap_or(id_part);
            return Ok(id);
        }
    }
    Err(anyhow::anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
