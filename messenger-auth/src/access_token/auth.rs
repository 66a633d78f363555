//! Access token query parameter authentication.

use std::fmt;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{configuration_error, ConfigurationErrorKind, Error};

/// Query parameter the platform reads the page access token from.
pub const ACCESS_TOKEN_PARAMETER: &str = "access_token";

/// Page access token authentication.
///
/// # Examples
///
/// ```rust,ignore
/// let auth = AccessTokenAuth::new(SecretString::new("EAAB...".to_string()))?;
/// let request = auth.authenticate(client.get(url));
/// ```
pub struct AccessTokenAuth {
    token: SecretString,
}

impl AccessTokenAuth {
    /// Create a new access token authenticator.
    ///
    /// Fails with a configuration error when the token is empty.
    pub fn new(token: SecretString) -> Result<Self, Error> {
        if token.expose_secret().is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::MissingAccessToken,
                "Page access token is empty",
            ));
        }

        Ok(Self { token })
    }

    /// Create an authenticator from an optional token, typically read from configuration.
    pub fn from_optional(token: Option<SecretString>) -> Result<Self, Error> {
        let token = token.ok_or_else(|| {
            configuration_error(
                ConfigurationErrorKind::MissingAccessToken,
                "Page access token is not configured",
            )
        })?;

        Self::new(token)
    }

    /// Apply authentication to a request builder.
    pub fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[(ACCESS_TOKEN_PARAMETER, self.token.expose_secret().as_str())])
    }

    /// Get a reference to the token.
    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

impl fmt::Debug for AccessTokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessTokenAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
