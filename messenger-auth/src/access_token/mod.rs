//! Page access token authentication for outbound Graph API calls.
//!
//! The platform authenticates every call with the token appended as the
//! `access_token` query parameter rather than an `Authorization` header.

mod auth;

pub use auth::{AccessTokenAuth, ACCESS_TOKEN_PARAMETER};
