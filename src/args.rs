//! These structs provide the CLI interface for the expense-bot CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expense-bot: log purchases to a Google sheet by sending short messages to a Telegram bot.
///
/// Send the bot a store shortcut followed by a price, e.g. `SF 12.50`, and it appends a row with
/// today's date, the store's location, name and category, and the price to your sheet. Send
/// `total` for the sum of all prices in the sheet and `help` for the list of shortcuts.
///
/// Setup, in order: `expense-bot init` to create the home directory, `expense-bot auth` to
/// authorize Google Sheets access, then `expense-bot serve` behind an HTTPS proxy that Telegram's
/// webhook points to.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// You need a Google OAuth client for a desktop application first. Download its credentials
    /// JSON and pass it as --client-secret; it will be moved into the home directory. The client
    /// must list `http://localhost` as a redirect URI.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Run the webhook server.
    Serve(ServeArgs),
    /// Print the store shortcuts from the configuration.
    Stores,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and credentials are held. Defaults to ~/.expense-bot
    #[arg(long, env = "EXPENSE_BOT_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `expense-bot init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// secrets directory inside the home directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(client_secret: impl Into<PathBuf>) -> Self {
        Self {
            client_secret: client_secret.into(),
        }
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// Args for the `expense-bot auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// Args for the `expense-bot serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The ID (or full URL) of the Google sheet that holds the ledger.
    #[arg(long, env = "SPREADSHEET_ID", hide_env_values = true)]
    spreadsheet_id: String,

    /// The Telegram bot token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// The address to listen on.
    #[arg(long, env = "EXPENSE_BOT_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Overrides `telegram_api_url` from the config file.
    #[arg(long, env = "TELEGRAM_API_URL")]
    telegram_api_url: Option<String>,
}

impl ServeArgs {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        bot_token: impl Into<String>,
        bind: SocketAddr,
        telegram_api_url: Option<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            bot_token: bot_token.into(),
            bind,
            telegram_api_url,
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn bind(&self) -> SocketAddr {
        self.bind
    }

    pub fn telegram_api_url(&self) -> Option<&str> {
        self.telegram_api_url.as_deref()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join(".expense-bot"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSE_BOT_HOME instead of relying on the default \
                directory. If you continue using the program right now, you may have problems!",
            );
            PathBuf::from(".expense-bot")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args = Args::try_parse_from([
            "expense-bot",
            "--home",
            "/tmp/eb",
            "--log-level",
            "debug",
            "serve",
            "--spreadsheet-id",
            "abc",
            "--bot-token",
            "123:xyz",
            "--bind",
            "127.0.0.1:9000",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/eb"));
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        match args.command() {
            Command::Serve(serve) => {
                assert_eq!(serve.spreadsheet_id(), "abc");
                assert_eq!(serve.bot_token(), "123:xyz");
                assert_eq!(serve.bind(), "127.0.0.1:9000".parse().unwrap());
                assert_eq!(serve.telegram_api_url(), None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_auth_verify() {
        let args = Args::try_parse_from(["expense-bot", "auth", "--verify"]).unwrap();
        match args.command() {
            Command::Auth(auth) => assert!(auth.verify()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
