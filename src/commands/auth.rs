//! Authentication command handlers for the OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `expense-bot auth` - Initial OAuth consent flow
//! - `expense-bot auth --verify` - Verify and refresh authentication

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `expense-bot auth` command - runs the OAuth consent flow
///
/// This is the ONLY command that asks the user to visit a consent page.
///
/// 1. Loads client_secret.json
/// 2. Prints the consent URL and waits for Google's redirect
/// 3. Saves tokens to token.json with required scopes
///
/// # Errors
/// Returns an error if OAuth flow fails or if client_secret.json is missing
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(&config.client_secret_path(), &config.token_path())
        .await
        .pub_result(ErrorType::Startup)?;
    Ok("Authorization complete".into())
}

/// Handles the `expense-bot auth --verify` command - verifies authentication
///
/// This command never starts the consent flow. It only verifies that the cached tokens exist, have
/// the correct scopes, and can be refreshed. If not, it fails with an error message telling the
/// user to run `expense-bot auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider =
        TokenProvider::load(&config.client_secret_path(), &config.token_path())
            .await
            .context(
                "Unable to use the existing tokens found in the token JSON file. \n\n\
                You should run 'expense-bot auth' (without the --verify flag).",
            )
            .pub_result(ErrorType::Startup)?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")
        .pub_result(ErrorType::Startup)?;
    Ok("Your OAuth token is valid!".into())
}
