//! HMAC webhook signature verification.

use std::fmt;

use log::*;
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::{SignatureAlgorithm, WebhookValidator};
use crate::error::{
    configuration_error, webhook_error, ConfigurationErrorKind, Error, WebhookErrorKind,
};

/// Header the platform puts the SHA-1 signature in.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-hub-signature";

/// Verifies that an inbound webhook was signed with the application secret.
///
/// The signature is computed over the raw request body exactly as it arrived
/// on the wire. Callers must hand over the bytes before any JSON parsing;
/// re-encoded JSON almost never reproduces the original byte sequence.
///
/// The verifier holds only the immutable secret, so it is `Send + Sync` and
/// can be shared between handlers behind an `Arc`.
pub struct SignatureVerifier {
    secret: SecretString,
    signature_header: String,
}

impl SignatureVerifier {
    /// Create a verifier from the application secret.
    ///
    /// Fails with a configuration error when the secret is empty.
    pub fn new(secret: SecretString) -> Result<Self, Error> {
        if secret.expose_secret().is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::MissingSecret,
                "Webhook application secret is empty",
            ));
        }

        Ok(Self {
            secret,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
        })
    }

    /// Create a verifier from an optional secret, typically read from configuration.
    ///
    /// Fails with a configuration error when the secret is absent or empty.
    pub fn from_optional(secret: Option<SecretString>) -> Result<Self, Error> {
        let secret = secret.ok_or_else(|| {
            configuration_error(
                ConfigurationErrorKind::MissingSecret,
                "Webhook application secret is not configured",
            )
        })?;

        Self::new(secret)
    }

    /// Read the signature from a different header, e.g. `x-hub-signature-256`.
    pub fn with_signature_header(mut self, signature_header: &str) -> Self {
        self.signature_header = signature_header.to_ascii_lowercase();
        self
    }

    /// Compute the signature the platform sends for `body`, as `"<algorithm>=<hex>"`.
    pub fn sign(&self, algorithm: SignatureAlgorithm, body: &[u8]) -> Result<String, Error> {
        let digest = algorithm.hex_digest(self.secret.expose_secret().as_bytes(), body)?;
        Ok(format!("{}={}", algorithm, digest))
    }

    /// Verify a declared signature against the raw request body.
    ///
    /// # Arguments
    ///
    /// * `declared_signature` - Value of the signature header, `None` when the header was absent
    /// * `raw_body` - Request body bytes, untouched
    ///
    /// The computed and declared signatures are compared in constant time.
    pub fn verify(&self, declared_signature: Option<&str>, raw_body: &[u8]) -> Result<(), Error> {
        let result = self.check(declared_signature, raw_body);

        match &result {
            Ok(()) => debug!(
                "Webhook signature verified ({} byte body)",
                raw_body.len()
            ),
            Err(e) => warn!(
                "Rejected webhook signature: {} ({} byte body)",
                e,
                raw_body.len()
            ),
        }

        result
    }

    fn check(&self, declared_signature: Option<&str>, raw_body: &[u8]) -> Result<(), Error> {
        let declared = declared_signature.ok_or_else(|| {
            webhook_error(
                WebhookErrorKind::MissingSignature,
                &format!("Missing signature header: {}", self.signature_header),
            )
        })?;

        if declared.is_empty() {
            return Err(webhook_error(
                WebhookErrorKind::MissingSignature,
                &format!("Empty signature header: {}", self.signature_header),
            ));
        }

        let (prefix, digest) = declared.split_once('=').ok_or_else(|| {
            webhook_error(
                WebhookErrorKind::MalformedSignature,
                "Signature is not of the form <algorithm>=<digest>",
            )
        })?;

        if prefix.is_empty() || digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(webhook_error(
                WebhookErrorKind::MalformedSignature,
                "Signature is not of the form <algorithm>=<digest>",
            ));
        }

        let algorithm: SignatureAlgorithm = prefix.parse()?;
        let computed = self.sign(algorithm, raw_body)?;

        if bool::from(computed.as_bytes().ct_eq(declared.as_bytes())) {
            Ok(())
        } else {
            Err(webhook_error(
                WebhookErrorKind::SignatureMismatch,
                "Signature does not match request body",
            ))
        }
    }
}

impl WebhookValidator for SignatureVerifier {
    fn validate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), Error> {
        // A header that is not visible ASCII cannot be a valid signature.
        let declared = match headers.get(self.signature_header.as_str()) {
            Some(value) => Some(value.to_str().map_err(|_| {
                webhook_error(
                    WebhookErrorKind::MalformedSignature,
                    "Signature header is not valid ASCII",
                )
            })?),
            None => None,
        };

        self.verify(declared, body)
    }

    fn signature_header(&self) -> &str {
        &self.signature_header
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .field("signature_header", &self.signature_header)
            .finish()
    }
}
