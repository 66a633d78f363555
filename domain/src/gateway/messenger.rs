//! Messenger Platform (Graph API) client.
//!
//! Every call goes to `<base_url>/<path>` with the page access token appended
//! as the `access_token` query parameter. Responses are JSON; a body carrying
//! an `error` object is surfaced as `ExternalErrorKind::Platform`, distinct
//! from transport failures.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind, PlatformError};
use log::*;
use messenger_auth::access_token::AccessTokenAuth;
use messenger_auth::http::PlatformClientBuilder;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use service::config::Config;

const MESSAGES_PATH: &str = "me/messages";
const MESSENGER_PROFILE_PATH: &str = "me/messenger_profile";

/// Why a message is being sent, as required by the Send API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagingType {
    /// Reply to a message the user sent.
    Response,
    /// Proactive update sent outside a reply.
    Update,
    MessageTag,
}

/// Typing and read indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    TypingOn,
    TypingOff,
    MarkSeen,
}

/// Response from the Send API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendMessageResponse {
    pub recipient_id: String,
    /// Absent for sender actions.
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Messenger Platform API client
pub struct MessengerClient {
    client: reqwest::Client,
    auth: AccessTokenAuth,
    base_url: String,
}

impl MessengerClient {
    /// Create a new client from configuration.
    ///
    /// Fails when no page access token is configured or the proxy URL is invalid.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let auth = AccessTokenAuth::from_optional(config.page_access_token()).map_err(|e| {
            warn!("Failed to get page access token from config");
            Error::from(e)
        })?;

        let client = PlatformClientBuilder::new()
            .with_timeout(config.request_timeout())
            .with_proxy(config.proxy_url())
            .build()?;

        Ok(Self::with_client(client, auth, config.graph_api_base_url()))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, auth: AccessTokenAuth, base_url: &str) -> Self {
        Self {
            client,
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an authenticated request to `path` and return the parsed JSON response.
    ///
    /// # Arguments
    ///
    /// * `path` - Path relative to the base URL, e.g. `me/messages`
    /// * `body` - Optional JSON body
    /// * `method` - HTTP method
    pub async fn send_request(
        &self,
        path: &str,
        body: Option<&Value>,
        method: Method,
    ) -> Result<Value, Error> {
        self.send_request_with_query(path, &[], body, method).await
    }

    /// Like `send_request`, with extra query parameters next to the access token.
    pub async fn send_request_with_query(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        method: Method,
    ) -> Result<Value, Error> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        debug!("Platform request: {} {}", method, url);

        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let request = self.auth.authenticate(request);

        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            warn!("Failed to send platform request to {}: {:?}", url, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        })?;

        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<Value>(&text) {
            Ok(json) => {
                if let Some(error) = json.get("error").filter(|error| !error.is_null()) {
                    let platform_error = parse_platform_error(error);
                    warn!(
                        "Platform returned an error for {}: {} - {:?}",
                        url, status, platform_error
                    );
                    return Err(Error {
                        source: None,
                        error_kind: DomainErrorKind::External(ExternalErrorKind::Platform(
                            platform_error,
                        )),
                    });
                }

                if status.is_success() {
                    Ok(json)
                } else {
                    warn!("Platform request to {} failed: {}", url, status);
                    Err(unexpected_status(status))
                }
            }
            Err(e) => {
                if status.is_success() {
                    warn!("Platform response from {} is not JSON: {:?}", url, e);
                    Err(Error {
                        source: Some(Box::new(e)),
                        error_kind: DomainErrorKind::External(ExternalErrorKind::InvalidResponse),
                    })
                } else {
                    warn!("Platform request to {} failed: {} - {}", url, status, text);
                    Err(unexpected_status(status))
                }
            }
        }
    }

    /// Send a plain text message to a user.
    pub async fn send_text_message(
        &self,
        recipient_id: &str,
        text: &str,
        messaging_type: MessagingType,
    ) -> Result<SendMessageResponse, Error> {
        require_non_empty("recipient id", recipient_id)?;
        require_non_empty("message text", text)?;

        let body = json!({
            "recipient": { "id": recipient_id },
            "messaging_type": messaging_type,
            "message": { "text": text },
        });

        info!("Sending text message to recipient {}", recipient_id);
        let response = self
            .send_request(MESSAGES_PATH, Some(&body), Method::POST)
            .await?;

        parse_response(response)
    }

    /// Show or hide the typing indicator, or mark the conversation as seen.
    pub async fn send_sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
    ) -> Result<SendMessageResponse, Error> {
        require_non_empty("recipient id", recipient_id)?;

        let body = json!({
            "recipient": { "id": recipient_id },
            "sender_action": action,
        });

        debug!("Sending {:?} to recipient {}", action, recipient_id);
        let response = self
            .send_request(MESSAGES_PATH, Some(&body), Method::POST)
            .await?;

        parse_response(response)
    }

    /// Fetch a user's public profile. `fields` are passed through untouched.
    pub async fn get_user_profile(&self, user_id: &str, fields: &[&str]) -> Result<Value, Error> {
        require_non_empty("user id", user_id)?;
        require_path_segment("user id", user_id)?;

        let query = fields_query(fields);
        self.send_request_with_query(user_id, &query, None, Method::GET)
            .await
    }

    /// Read Messenger profile properties (greeting, get started button, ...).
    pub async fn get_messenger_profile(&self, fields: &[&str]) -> Result<Value, Error> {
        if fields.is_empty() {
            return Err(validation_error("at least one messenger profile field is required"));
        }

        let query = fields_query(fields);
        self.send_request_with_query(MESSENGER_PROFILE_PATH, &query, None, Method::GET)
            .await
    }

    /// Set Messenger profile properties. `properties` is sent as the request body.
    pub async fn set_messenger_profile(&self, properties: &Value) -> Result<Value, Error> {
        if !properties.as_object().is_some_and(|object| !object.is_empty()) {
            return Err(validation_error(
                "messenger profile properties must be a non-empty JSON object",
            ));
        }

        self.send_request(MESSENGER_PROFILE_PATH, Some(properties), Method::POST)
            .await
    }

    /// Delete Messenger profile properties.
    pub async fn delete_messenger_profile(&self, fields: &[&str]) -> Result<Value, Error> {
        if fields.is_empty() {
            return Err(validation_error("at least one messenger profile field is required"));
        }

        let body = json!({ "fields": fields });
        self.send_request(MESSENGER_PROFILE_PATH, Some(&body), Method::DELETE)
            .await
    }
}

fn parse_platform_error(error: &Value) -> PlatformError {
    serde_json::from_value(error.clone()).unwrap_or_else(|_| PlatformError {
        message: Some(
            error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
        ..Default::default()
    })
}

fn parse_response(response: Value) -> Result<SendMessageResponse, Error> {
    serde_json::from_value(response).map_err(|e| {
        warn!("Unexpected Send API response shape: {:?}", e);
        Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::InvalidResponse),
        }
    })
}

fn fields_query(fields: &[&str]) -> Vec<(&'static str, String)> {
    if fields.is_empty() {
        Vec::new()
    } else {
        vec![("fields", fields.join(","))]
    }
}

fn unexpected_status(status: reqwest::StatusCode) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::External(ExternalErrorKind::UnexpectedStatus(
            status.as_u16(),
        )),
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        warn!("Refusing platform request with empty {}", name);
        return Err(validation_error(&format!("{} must not be empty", name)));
    }
    Ok(())
}

// Ids become a single path segment; separators would address another endpoint.
fn require_path_segment(name: &str, value: &str) -> Result<(), Error> {
    if value.contains(['/', '?', '#']) {
        warn!("Refusing platform request with {} containing a URL separator", name);
        return Err(validation_error(&format!(
            "{} must not contain '/', '?' or '#'",
            name
        )));
    }
    Ok(())
}

fn validation_error(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(message.to_string())),
    }
}
