//! Common test utilities for integration tests.

use expense_bot::api::{Ledger, Messenger, TelegramMessenger};
use expense_bot::model::Stores;
use expense_bot::router::Router;
use expense_bot::server::{self, AppState};
use expense_bot::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const BOT_TOKEN: &str = "123:test-token";
pub const CHAT_ID: &str = "188909374";
pub const WEBHOOK_PATH: &str = "/telegramBot";

/// The path that the mock Telegram server expects replies on.
pub fn send_message_path() -> String {
    format!("/bot{BOT_TOKEN}/sendMessage")
}

/// Creates a home directory in `dir` and a config that sends replies to `telegram`.
pub async fn test_config(dir: &TempDir, telegram: &MockServer) -> Config {
    let config = create_home(dir).await;
    with_secrets(config, telegram)
}

/// Like `test_config`, but `config.json` is replaced with `config_json` before it is loaded.
pub async fn test_config_with(dir: &TempDir, telegram: &MockServer, config_json: &str) -> Config {
    let created = create_home(dir).await;
    tokio::fs::write(created.config_path(), config_json)
        .await
        .unwrap();
    let config = Config::load(created.root()).await.unwrap();
    with_secrets(config, telegram)
}

async fn create_home(dir: &TempDir) -> Config {
    let secret = dir.path().join("client_secret.json");
    tokio::fs::write(&secret, "{}").await.unwrap();
    Config::create(dir.path().join("home"), &secret)
        .await
        .unwrap()
}

fn with_secrets(mut config: Config, telegram: &MockServer) -> Config {
    config.set_spreadsheet_id("test-spreadsheet").unwrap();
    config.set_bot_token(BOT_TOKEN);
    config.set_telegram_api_url(telegram.uri());
    config
}

/// Starts the webhook server on an ephemeral port and returns its address.
pub async fn start_server(config: &Config, ledger: Arc<dyn Ledger>) -> SocketAddr {
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(config).unwrap());
    let router = Router::new(Stores::default(), ledger);
    let state = Arc::new(AppState::new(router, messenger, config.webhook_path()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));
    addr
}

/// A Telegram update carrying `text`.
pub fn update(text: &str) -> String {
    serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 7,
            "chat": {"id": 188909374, "type": "private"},
            "text": text
        }
    })
    .to_string()
}

/// Posts `body` to the webhook and returns the status code.
pub async fn post(addr: SocketAddr, path: &str, body: String) -> u16 {
    reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}
