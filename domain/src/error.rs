//! Error types for the `domain` layer.
use messenger_auth::error::{
    Error as MessengerAuthError, ErrorKind as MessengerAuthErrorKind, HttpErrorKind,
    WebhookErrorKind,
};
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `messenger-auth`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `messenger-auth`. Ultimately the various
/// `error_kind`s are used by `web` to return appropriate HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Signature(SignatureErrorKind),
    InvalidPayload,
    Validation(String),
    Other(String),
}

/// Webhook signature rejections, reduced to what `web` needs to pick a status code.
#[derive(Debug, PartialEq)]
pub enum SignatureErrorKind {
    /// No signature header, or an empty one.
    Missing,
    /// Malformed, unsupported algorithm, or mismatched signature.
    Invalid,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// DNS, connect, TLS or timeout failures.
    Network,
    /// The platform answered with an `error` object in the response body.
    Platform(PlatformError),
    /// Non-2xx response without a JSON body.
    UnexpectedStatus(u16),
    /// 2xx response whose body is not the expected JSON.
    InvalidResponse,
    Other(String),
}

/// The `error` object the platform returns in failed responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlatformError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

impl Error {
    /// True when the error rejects a webhook request because of its signature.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Signature(_))
        )
    }

    /// The platform's error object, when the failure came from one.
    pub fn platform_error(&self) -> Option<&PlatformError> {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::Platform(platform_error)) => {
                Some(platform_error)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {:?}", self.error_kind)
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
        // Request URLs carry the access token in their query string.
        let err = err.without_url();
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

// This is where we translate errors from the `messenger-auth` layer to the `domain` layer.
impl From<MessengerAuthError> for Error {
    fn from(err: MessengerAuthError) -> Self {
        let error_kind = match &err.error_kind {
            MessengerAuthErrorKind::Configuration(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            MessengerAuthErrorKind::Webhook(WebhookErrorKind::MissingSignature) => {
                DomainErrorKind::Internal(InternalErrorKind::Signature(SignatureErrorKind::Missing))
            }
            MessengerAuthErrorKind::Webhook(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Signature(SignatureErrorKind::Invalid))
            }
            // Building the client happens before any network call.
            MessengerAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build reqwest client".to_string()),
            ),
            MessengerAuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
