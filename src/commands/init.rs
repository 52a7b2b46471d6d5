use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file with the default store table
/// - Moves `secret_file` into its default location in the home directory.
///
/// # Arguments
/// - `home` - The directory that will be the root of the home directory, e.g.
///   `$HOME/.expense-bot`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(home: &Path, secret_file: &Path) -> Result<Out<()>> {
    let config = Config::create(home, secret_file)
        .await
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Startup)?;
    Ok(format!(
        "Created {}. Edit it to change the store table, then run 'expense-bot auth'",
        config.config_path().display()
    )
    .into())
}
