use clap::Parser;
use expense_bot::args::{Args, Command, ServeArgs};
use expense_bot::{commands, Config, Error, ErrorType, Mode, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for running the server without hitting the Google APIs. When
    // EXPENSE_BOT_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.client_secret())
            .await?
            .print(),

        Command::Auth(auth_args) => {
            let config = load_config(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Serve(serve_args) => {
            let config = serve_config(home, serve_args).await?;
            commands::serve(config, mode, serve_args.bind())
                .await?
                .print()
        }

        Command::Stores => commands::stores(load_config(home).await?)
            .await?
            .print(),
    };
    Ok(())
}

async fn load_config(home: &Path) -> Result<Config> {
    Config::load(home)
        .await
        .map_err(|e| Error::new(ErrorType::Startup, e))
}

/// Loads the config file and layers the deployment secrets from the environment on top of it.
async fn serve_config(home: &Path, serve_args: &ServeArgs) -> Result<Config> {
    let mut config = load_config(home).await?;
    config
        .set_spreadsheet_id(serve_args.spreadsheet_id())
        .map_err(|e| Error::new(ErrorType::Startup, e))?;
    config.set_bot_token(serve_args.bot_token());
    if let Some(url) = serve_args.telegram_api_url() {
        config.set_telegram_api_url(url);
    }
    Ok(config)
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only. The library and
            // the binary share the crate name.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
