//! This module re-exports the webhook verification items from the `messenger-auth` crate.
//!
//! Consumers of the `domain` crate (`web`, the binary) do not need to depend on
//! `messenger-auth` directly. Its errors are translated into `domain::error::Error`
//! at this boundary, the same way outbound platform errors are.
pub use messenger_auth::webhook::{
    SignatureAlgorithm, SignatureVerifier, WebhookValidator, DEFAULT_SIGNATURE_HEADER,
};

pub mod error;
pub mod gateway;
pub mod webhook_event;
