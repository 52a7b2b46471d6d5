//! Implements the `Messenger` trait with the Telegram Bot API.

use crate::api::Messenger;
use crate::error::Res;
use crate::Config;
use anyhow::{bail, Context};
use tracing::debug;
use url::Url;

/// Builds the `sendMessage` URL. The reply text is form-urlencoded into the query string, so
/// newlines, ampersands and non-ASCII text survive the trip.
///
/// ```
/// # use expense_bot::api::send_message_url;
/// let url = send_message_url("https://api.telegram.org", "123:abc", "42", "P: Persia\nSF: Save on Foods").unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://api.telegram.org/bot123:abc/sendMessage?chat_id=42&text=P%3A+Persia%0ASF%3A+Save+on+Foods"
/// );
/// ```
pub fn send_message_url(api_base: &str, bot_token: &str, chat_id: &str, text: &str) -> Res<Url> {
    let base = api_base.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/bot{bot_token}/sendMessage"))
        .with_context(|| format!("Invalid Telegram API URL '{base}'"))?;
    url.query_pairs_mut()
        .append_pair("chat_id", chat_id)
        .append_pair("text", text);
    Ok(url)
}

/// Sends every reply to the one chat that this bot serves.
#[derive(Debug, Clone)]
pub struct TelegramMessenger {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramMessenger {
    pub fn new(config: &Config) -> Res<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.reply_timeout())
            .build()
            .context("Unable to build the Telegram HTTP client")?;
        Ok(Self {
            client,
            api_base: config.telegram_api_url().to_string(),
            bot_token: config.bot_token().to_string(),
            chat_id: config.chat_id().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, text: &str) -> Res<()> {
        let url = send_message_url(&self.api_base, &self.bot_token, &self.chat_id, text)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send the reply to Telegram")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Telegram sendMessage failed with status {status}: {body}");
        }

        debug!("Sent reply to chat {}", self.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url_trailing_slash() {
        let url = send_message_url("http://127.0.0.1:9999/", "t", "1", "done").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9999/bott/sendMessage?chat_id=1&text=done"
        );
    }

    #[test]
    fn test_send_message_url_encodes_apostrophe_and_unicode() {
        let url = send_message_url("https://api.telegram.org", "t", "1", "I don't understand")
            .unwrap();
        assert!(url.as_str().ends_with("text=I+don%27t+understand"));

        let url = send_message_url("https://api.telegram.org", "t", "1", "工作表").unwrap();
        assert!(url.as_str().ends_with("text=%E5%B7%A5%E4%BD%9C%E8%A1%A8"));
    }

    #[test]
    fn test_send_message_url_bad_base() {
        assert!(send_message_url("not a url", "t", "1", "x").is_err());
    }
}
