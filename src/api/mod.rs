//! The remote services we talk to: the ledger (a Google sheet) and the messaging platform
//! (Telegram). Each is hidden behind a trait so that the router does not know how they are
//! implemented, and so that tests and test mode can swap them out.

mod files;
mod oauth;
mod sheet;
mod telegram;
mod test_ledger;

use crate::error::Res;
use crate::Config;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(crate) use oauth::TokenProvider;
pub use telegram::{send_message_url, TelegramMessenger};
pub use test_ledger::TestLedger;

/// OAuth scopes required for Sheets API access.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// The environment variable that, when set and non-empty, switches the ledger to `Mode::Test`.
pub const TEST_MODE_ENV: &str = "EXPENSE_BOT_IN_TEST_MODE";

/// The remote ledger where expense rows are appended and read back.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Appends one row to the end of the ledger.
    async fn append(&self, row: Vec<String>) -> Res<()>;

    /// Reads one column of the ledger, top to bottom. Missing cells are returned as empty strings.
    async fn column(&self, column: &str) -> Res<Vec<String>>;
}

/// Sends reply text back to the chat the bot serves.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, text: &str) -> Res<()>;
}

/// Whether the ledger is a real Google sheet or in-memory data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Test` when `EXPENSE_BOT_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the ledger for `mode`. In `Mode::Google` this loads the cached OAuth token, so it fails
/// if `expense-bot auth` has not been run.
pub async fn ledger(config: &Config, mode: Mode) -> Res<Arc<dyn Ledger>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(&config.client_secret_path(), &config.token_path()).await?;
            let ledger = sheet::GoogleLedger::new(config, token_provider).await?;
            Ok(Arc::new(ledger))
        }
        Mode::Test => Ok(Arc::new(TestLedger::new(config.sheet_name()))),
    }
}

/// Creates the Telegram messenger described by `config`.
pub fn messenger(config: &Config) -> Res<Arc<dyn Messenger>> {
    Ok(Arc::new(TelegramMessenger::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Test.to_string(), "test");
        assert_eq!("google".parse::<Mode>().unwrap(), Mode::Google);
    }
}
