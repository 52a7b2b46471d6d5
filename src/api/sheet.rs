//! Implements the `Ledger` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{Ledger, TokenProvider};
use crate::error::Res;
use crate::Config;
use anyhow::Context;
use sheets::types::{
    DateTimeRenderOption, Dimension, InsertDataOption, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::trace;

/// The columns of a ledger row: date, location, name, category, price.
const ROW_RANGE: &str = "A:E";

/// Implements the `Ledger` trait with a Google sheet. It takes a `TokenProvider`, which it asks for
/// a fresh access token before each call. Token refreshes are serialized by the mutex.
pub(super) struct GoogleLedger {
    spreadsheet_id: String,
    sheet_name: String,
    timeout: Duration,
    token_provider: Mutex<TokenProvider>,
}

impl GoogleLedger {
    pub(super) async fn new(config: &Config, mut token_provider: TokenProvider) -> Res<Self> {
        // Fail at startup, not on the first message, if the token cannot be refreshed.
        let _ = token_provider.token_with_refresh().await?;
        Ok(Self {
            spreadsheet_id: config.spreadsheet_id().to_string(),
            sheet_name: config.sheet_name().to_string(),
            timeout: config.ledger_timeout(),
            token_provider: Mutex::new(token_provider),
        })
    }

    /// Creates a sheets client with an access token that is good for at least a few minutes.
    async fn client(&self) -> Res<sheets::Client> {
        let mut token_provider = self.token_provider.lock().await;
        let access_token = token_provider.token_with_refresh().await?;
        Ok(create_sheets_client(access_token))
    }
}

/// Bounds `call` by `timeout`. Expiry is an error like any other failed call.
async fn bounded<T>(timeout: Duration, what: &str, call: impl Future<Output = Res<T>>) -> Res<T> {
    tokio::time::timeout(timeout, call)
        .await
        .with_context(|| format!("Timed out after {timeout:?} trying to {what}"))?
}

#[async_trait::async_trait]
impl Ledger for GoogleLedger {
    async fn append(&self, row: Vec<String>) -> Res<()> {
        let range = format!("{}!{ROW_RANGE}", self.sheet_name);
        trace!("append to {range}: {row:?}");
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.clone(),
            values: vec![row],
        };
        bounded(self.timeout, "append a row to the ledger", async {
            self.client()
                .await?
                .spreadsheets()
                .values_append(
                    &self.spreadsheet_id,
                    &range,
                    false,
                    InsertDataOption::InsertRows,
                    DateTimeRenderOption::FormattedString,
                    ValueRenderOption::FormattedValue,
                    ValueInputOption::Raw,
                    &body,
                )
                .await
                .map_err(map_client_error)
                .with_context(|| format!("Failed to append a row to {range}"))?;
            Ok::<_, anyhow::Error>(())
        })
        .await
    }

    async fn column(&self, column: &str) -> Res<Vec<String>> {
        let range = format!("{}!{column}:{column}", self.sheet_name);
        trace!("get {range}");
        let rows = bounded(self.timeout, "read the ledger", async {
            let response = self
                .client()
                .await?
                .spreadsheets()
                .values_get(
                    &self.spreadsheet_id,
                    &range,
                    DateTimeRenderOption::FormattedString,
                    Dimension::Rows,
                    ValueRenderOption::FormattedValue,
                )
                .await
                .map_err(map_client_error)
                .with_context(|| format!("Failed to fetch {range}"))?;
            Ok::<_, anyhow::Error>(response.body.values)
        })
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }
}

/// Creates a new sheets client for an access token.
fn create_sheets_client(access_token: &str) -> sheets::Client {
    // The sheets crate requires client_id, client_secret, and redirect_uri, but we don't need
    // them for API calls, only the access token. Refresh is handled by `TokenProvider`.
    sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    )
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded(
            Duration::from_millis(20),
            "read the ledger",
            std::future::pending::<Res<()>>(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
        assert!(err.to_string().contains("read the ledger"));
    }

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let rows = bounded(Duration::from_secs(1), "read the ledger", async {
            Ok::<_, anyhow::Error>(vec!["3".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(rows, vec!["3"]);
    }
}
