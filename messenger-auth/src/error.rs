//! Error types for the `messenger-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for messenger-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in messenger-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Configuration(ConfigurationErrorKind),
    Webhook(WebhookErrorKind),
    Http(HttpErrorKind),
}

/// Setup errors. These should stop the service from starting.
#[derive(Debug, PartialEq)]
pub enum ConfigurationErrorKind {
    MissingSecret,
    MissingAccessToken,
    InvalidProxy,
}

/// Per-request webhook rejections. Every variant means "invalid signature";
/// none of them are transient.
#[derive(Debug, PartialEq)]
pub enum WebhookErrorKind {
    MissingSignature,
    MalformedSignature,
    UnsupportedAlgorithm,
    SignatureMismatch,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl Error {
    /// True when the error rejects a single webhook request.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Webhook(_))
    }

    /// True when the error comes from missing or unusable configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Configuration(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::Webhook(kind) => write!(f, "Invalid webhook signature: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(kind: ConfigurationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration(kind),
    }
}

/// Helper function to create webhook errors.
pub fn webhook_error(kind: WebhookErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Webhook(kind),
    }
}
