//! Error types.
//!
//! Internally we use `anyhow` everywhere (`Res<T>`). At the boundaries of the program (the webhook
//! server and the CLI commands) errors are tagged with an `ErrorType` so that the caller can decide
//! whether the failure was the requester's fault, a remote dependency's fault, or a problem with
//! the way the program was started.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies where an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The inbound request could not be processed, e.g. a malformed price.
    Request,
    /// The ledger or the messaging platform failed or timed out.
    Dependency,
    /// Configuration or credentials are missing or invalid.
    Startup,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type. It wraps an `anyhow::Error` together with its `ErrorType`.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(AsRef::<dyn std::error::Error>::as_ref(&self.inner))
    }
}

/// Converts an internal `Res<T>` into a public `Result<T>` by attaching an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_keeps_context() {
        let res: Res<()> = Err(anyhow::anyhow!("disk on fire")).context("Unable to append row");
        let err = res.pub_result(ErrorType::Dependency).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Dependency);
        let message = err.to_string();
        assert!(message.starts_with("dependency error"));
        assert!(message.contains("Unable to append row"));
        assert!(message.contains("disk on fire"));
    }

    #[test]
    fn test_source_starts_at_the_outermost_context() {
        use std::error::Error as _;

        let res: Res<()> = Err(anyhow::anyhow!("disk on fire")).context("Unable to append row");
        let err = res.pub_result(ErrorType::Dependency).unwrap_err();
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Unable to append row");
        assert_eq!(source.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn test_error_type_from_str() {
        let t: ErrorType = "startup".parse().unwrap();
        assert_eq!(t, ErrorType::Startup);
    }
}
