//! Platform HTTP client builder.

use std::time::Duration;

use log::*;

use crate::error::{ConfigurationErrorKind, Error, ErrorKind};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Optional HTTP/HTTPS forward proxy all requests are tunnelled through.
    pub proxy_url: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("messenger-auth/{}", env!("CARGO_PKG_VERSION")),
            proxy_url: None,
        }
    }
}

/// Builder for the HTTP client used to reach the platform.
///
/// Outbound calls are never retried; a failed call surfaces to the caller.
pub struct PlatformClientBuilder {
    config: HttpClientConfig,
}

impl PlatformClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Route every request through a forward proxy. An empty string disables the proxy.
    pub fn with_proxy(mut self, proxy_url: Option<String>) -> Self {
        self.config.proxy_url = proxy_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent);

        if let Some(proxy_url) = &self.config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                warn!("Invalid proxy URL configured for platform requests");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::Configuration(ConfigurationErrorKind::InvalidProxy),
                }
            })?;
            debug!("Routing platform requests through proxy");
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}

impl Default for PlatformClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
