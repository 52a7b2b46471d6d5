use serde::Deserialize;

/// The part of a Telegram webhook update that we care about:
/// `{"message": {"text": "SF 12.50", ...}, ...}`. Everything else is ignored.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Update {
    pub message: Message,
}

/// An inbound chat message.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Update {
    /// Parses the webhook body.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_telegram_update() {
        let body = br#"{
            "update_id": 10000,
            "message": {
                "message_id": 1365,
                "date": 1441645532,
                "chat": {"id": 1111111, "type": "private"},
                "text": "SF 12.50"
            }
        }"#;
        let update = Update::from_slice(body).unwrap();
        assert_eq!(update.text(), "SF 12.50");
    }

    #[test]
    fn test_missing_text_is_an_error() {
        assert!(Update::from_slice(br#"{"message": {"photo": []}}"#).is_err());
        assert!(Update::from_slice(br#"{"edited_message": {"text": "x"}}"#).is_err());
        assert!(Update::from_slice(b"not json").is_err());
    }
}
