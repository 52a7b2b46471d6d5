//! The `expense-bot serve` command: runs the webhook server until the process is stopped.

use crate::api::Mode;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::router::Router;
use crate::server::{self, AppState};
use crate::{api, Config, Result};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Builds the ledger, messenger and router from `config` and serves webhooks on `bind`.
///
/// Everything that can be checked before the first message arrives is checked here, so that a
/// broken deployment fails at startup rather than on a request.
pub async fn serve(config: Config, mode: Mode, bind: SocketAddr) -> Result<Out<()>> {
    config.validate_for_serve().pub_result(ErrorType::Startup)?;
    info!(
        "Starting with {} stores, ledger '{}' in {mode} mode",
        config.stores().len(),
        config.sheet_name()
    );

    let ledger = api::ledger(&config, mode)
        .await
        .context("Unable to connect to the ledger, you may need to run 'expense-bot auth'")
        .pub_result(ErrorType::Startup)?;
    let messenger = api::messenger(&config).pub_result(ErrorType::Startup)?;
    let router = Router::new(config.stores().clone(), ledger);
    let state = Arc::new(AppState::new(router, messenger, config.webhook_path()));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Unable to listen on {bind}"))
        .pub_result(ErrorType::Startup)?;
    server::serve(listener, state)
        .await
        .pub_result(ErrorType::Dependency)?;
    Ok("Server stopped".into())
}
