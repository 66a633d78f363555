//! Webhook signature validation.

mod algorithm;
mod signature;

pub use algorithm::SignatureAlgorithm;
pub use signature::{SignatureVerifier, DEFAULT_SIGNATURE_HEADER};

use reqwest::header::HeaderMap;

use crate::error::Error;

/// Trait for validating webhook signatures.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// # Arguments
    ///
    /// * `headers` - HTTP headers from the webhook request
    /// * `body` - Raw request body bytes, exactly as received
    ///
    /// # Returns
    ///
    /// `Ok(())` when the signature is authentic, an invalid signature error otherwise.
    fn validate(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), Error>;

    /// Name of the header this validator reads the signature from.
    fn signature_header(&self) -> &str;
}
