//! HTTP client building for outbound platform calls.

mod client;

pub use client::{HttpClientConfig, PlatformClientBuilder};
