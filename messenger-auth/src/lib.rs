//! # messenger-auth
//!
//! Authentication for the messaging platform, in both directions:
//! - Inbound: webhook signature verification (`X-Hub-Signature`)
//! - Outbound: page access token authentication for Graph API calls
//! - HTTP client building (timeout, user agent, forward proxy)
//!
//! ## Architecture
//!
//! The webhook verifier and the outbound client never call each other. They
//! meet in the application layer:
//! - `web` verifies every inbound webhook before it parses the body
//! - `domain` uses the access token auth and the client builder to reach the platform
//!
//! ## Usage
//!
//! ```rust,ignore
//! use messenger_auth::{
//!     access_token::AccessTokenAuth,
//!     http::PlatformClientBuilder,
//!     webhook::{SignatureVerifier, WebhookValidator},
//! };
//! ```

pub mod access_token;
pub mod error;
pub mod http;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
