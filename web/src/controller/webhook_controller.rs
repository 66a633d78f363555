//! Controller for the Messenger Platform webhook.
//!
//! `GET /webhook` answers the subscription handshake. `POST /webhook` receives
//! signed event batches; the signature is checked against the raw body bytes
//! before anything is parsed.

use crate::{AppState, Error};

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use domain::gateway::messenger::{MessengerClient, SenderAction};
use domain::webhook_event::{MessagingEvent, MessagingEventKind, WebhookEvent};
use log::*;
use serde::Deserialize;
use subtle::ConstantTimeEq;

const SUBSCRIBE_MODE: &str = "subscribe";

/// Query parameters the platform sends when subscribing the webhook.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook
///
/// Echoes `hub.challenge` back when the mode is `subscribe` and the verify token
/// matches the configured one.
#[utoipa::path(
    get,
    path = "/webhook",
    params(
        ("hub.mode" = String, Query, description = "Always `subscribe`"),
        ("hub.verify_token" = String, Query, description = "The verify token configured on the platform"),
        ("hub.challenge" = String, Query, description = "Value to echo back on success"),
    ),
    responses(
        (status = 200, description = "Subscription verified, body is the challenge", body = String),
        (status = 403, description = "Wrong mode or verify token"),
    )
)]
pub async fn verify_subscription(
    State(app_state): State<AppState>,
    Query(params): Query<SubscriptionParams>,
) -> impl IntoResponse {
    let expected_token = match app_state.config.verify_token() {
        Some(token) if !token.is_empty() => token,
        _ => {
            warn!("Webhook subscription attempted but no VERIFY_TOKEN is configured");
            return (StatusCode::FORBIDDEN, "FORBIDDEN".to_string());
        }
    };

    let token_matches = params
        .verify_token
        .as_deref()
        .map(|token| bool::from(token.as_bytes().ct_eq(expected_token.as_bytes())))
        .unwrap_or(false);

    if params.mode.as_deref() == Some(SUBSCRIBE_MODE) && token_matches {
        info!("Webhook subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        warn!(
            "Webhook subscription rejected (mode: {:?}, token matches: {})",
            params.mode, token_matches
        );
        (StatusCode::FORBIDDEN, "FORBIDDEN".to_string())
    }
}

/// POST /webhook
///
/// Verifies the signature header over the raw body, then parses and logs the events.
/// When a platform client is configured, inbound messages are marked as seen.
#[utoipa::path(
    post,
    path = "/webhook",
    params(
        ("x-hub-signature" = String, Header, description = "`sha1=<hex>` HMAC of the raw body keyed with the app secret"),
    ),
    request_body(content = String, description = "Webhook event batch", content_type = "application/json"),
    responses(
        (status = 200, description = "Events accepted", body = String),
        (status = 400, description = "Signature valid but the body is not a webhook event"),
        (status = 401, description = "Signature header missing"),
        (status = 403, description = "Signature malformed or does not match"),
        (status = 404, description = "Event is not for a page subscription"),
    )
)]
pub async fn receive_event(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    app_state.validator().validate(&headers, &body)?;

    let event = WebhookEvent::from_slice(&body)?;

    if !event.is_page() {
        warn!("Ignoring webhook event for object type {:?}", event.object);
        return Ok((StatusCode::NOT_FOUND, "NOT FOUND"));
    }

    debug!("Received webhook event with {} entries", event.entry.len());
    for messaging_event in event.messaging_events() {
        log_messaging_event(messaging_event);
    }

    if let Some(messenger_client) = app_state.messenger_client() {
        mark_messages_seen(messenger_client, &event);
    }

    Ok((StatusCode::OK, "EVENT_RECEIVED"))
}

fn log_messaging_event(messaging_event: &MessagingEvent) {
    info!("{}", event_summary(messaging_event));
    match messaging_event.kind() {
        MessagingEventKind::Message => debug!(
            "Message text from {}: {:?}",
            messaging_event.sender.id,
            messaging_event.text().unwrap_or_default()
        ),
        MessagingEventKind::Postback => debug!(
            "Postback payload from {}: {:?}",
            messaging_event.sender.id,
            messaging_event
                .postback
                .as_ref()
                .and_then(|postback| postback.payload.as_deref())
        ),
        MessagingEventKind::Echo | MessagingEventKind::Other => {}
    }
}

/// One-line description of an event for `info!` logs. Carries ids and the
/// event kind only, never user content.
fn event_summary(messaging_event: &MessagingEvent) -> String {
    match messaging_event.kind() {
        MessagingEventKind::Message => format!("Message from {}", messaging_event.sender.id),
        MessagingEventKind::Postback => format!("Postback from {}", messaging_event.sender.id),
        MessagingEventKind::Echo => {
            format!("Echo of page message to {}", messaging_event.recipient.id)
        }
        MessagingEventKind::Other => {
            format!("Unhandled messaging event from {}", messaging_event.sender.id)
        }
    }
}

// The platform expects a fast 200, so replies run off the request task.
fn mark_messages_seen(messenger_client: &Arc<MessengerClient>, event: &WebhookEvent) {
    for messaging_event in event.messaging_events() {
        if messaging_event.kind() != MessagingEventKind::Message {
            continue;
        }

        let messenger_client = Arc::clone(messenger_client);
        let sender_id = messaging_event.sender.id.clone();
        tokio::spawn(async move {
            if let Err(e) = messenger_client
                .send_sender_action(&sender_id, SenderAction::MarkSeen)
                .await
            {
                warn!("Failed to mark message from {} as seen: {}", sender_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::event_summary;
    use crate::router::define_routes;
    use crate::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use domain::{SignatureAlgorithm, SignatureVerifier};
    use secrecy::SecretString;
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const APP_SECRET: &str = "app_secret";
    const PAGE_BODY: &str = r#"{"object":"page","entry":[]}"#;
    // HMAC-SHA1 of PAGE_BODY keyed with APP_SECRET.
    const PAGE_BODY_SHA1: &str = "sha1=51b8d50f6b49af800369697e6e1de2d25e15685d";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::new(APP_SECRET.to_string())).unwrap()
    }

    fn app_with_config(config: Config) -> Router {
        define_routes(AppState::new(config, Arc::new(verifier()), None))
    }

    fn app() -> Router {
        let config = Config::try_parse_args(["messenger_platform_rs"])
            .unwrap()
            .set_verify_token("verify_me".to_string());
        app_with_config(config)
    }

    async fn body_string(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    async fn post_event(signature: Option<&str>, body: &str) -> Response {
        let mut request = Request::builder().method("POST").uri("/webhook");
        if let Some(signature) = signature {
            request = request.header("x-hub-signature", signature);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        app().oneshot(request).await.unwrap()
    }

    async fn handshake(app: Router, query: &str) -> Response {
        let request = Request::builder()
            .uri(format!("/webhook?{}", query))
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_handshake_echoes_challenge() {
        let response = handshake(
            app(),
            "hub.mode=subscribe&hub.verify_token=verify_me&hub.challenge=1158201444",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1158201444");
    }

    #[tokio::test]
    async fn test_handshake_rejects_wrong_token() {
        let response = handshake(
            app(),
            "hub.mode=subscribe&hub.verify_token=verify_you&hub.challenge=1158201444",
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handshake_rejects_wrong_mode() {
        let response = handshake(
            app(),
            "hub.mode=unsubscribe&hub.verify_token=verify_me&hub.challenge=1158201444",
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handshake_rejects_missing_params() {
        let response = handshake(app(), "hub.challenge=1158201444").await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handshake_without_configured_token() {
        let config = Config::try_parse_args(["messenger_platform_rs"])
            .unwrap()
            .set_verify_token(String::new());
        let response = handshake(
            app_with_config(config),
            "hub.mode=subscribe&hub.verify_token=&hub.challenge=1158201444",
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_with_valid_signature() {
        let response = post_event(Some(PAGE_BODY_SHA1), PAGE_BODY).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "EVENT_RECEIVED");
    }

    #[tokio::test]
    async fn test_post_with_sha256_signature() {
        let body = r#"{"object":"page","entry":[{"id":"PAGE_ID","time":1458692752478,"messaging":[{"sender":{"id":"USER_ID"},"recipient":{"id":"PAGE_ID"},"message":{"mid":"mid.1","text":"hello"}}]}]}"#;
        let signature = verifier()
            .sign(SignatureAlgorithm::Sha256, body.as_bytes())
            .unwrap();

        let response = post_event(Some(&signature), body).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_without_signature_is_unauthorized() {
        let response = post_event(None, PAGE_BODY).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_with_wrong_signature_is_forbidden() {
        let response = post_event(
            Some("sha1=0000000000000000000000000000000000000000"),
            PAGE_BODY,
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_with_altered_body_is_forbidden() {
        let response = post_event(Some(PAGE_BODY_SHA1), r#"{"object":"page","entry":[{}]}"#).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_with_malformed_signature_is_forbidden() {
        let response = post_event(Some("51b8d50f6b49af800369697e6e1de2d25e15685d"), PAGE_BODY).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_signed_invalid_json_is_bad_request() {
        let body = "not json";
        let signature = verifier()
            .sign(SignatureAlgorithm::Sha1, body.as_bytes())
            .unwrap();

        let response = post_event(Some(&signature), body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_unsigned_invalid_json_is_unauthorized() {
        let response = post_event(None, "not json").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_non_page_object_is_not_found() {
        let body = r#"{"object":"user","entry":[]}"#;
        let signature = verifier()
            .sign(SignatureAlgorithm::Sha1, body.as_bytes())
            .unwrap();

        let response = post_event(Some(&signature), body).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_event_summary_omits_user_content() {
        let event = domain::webhook_event::WebhookEvent::from_slice(
            br#"{"object":"page","entry":[{"id":"PAGE_ID","messaging":[
                {"sender":{"id":"USER_ID"},"recipient":{"id":"PAGE_ID"},"message":{"mid":"mid.1","text":"my card number is 4111"}},
                {"sender":{"id":"USER_ID"},"recipient":{"id":"PAGE_ID"},"postback":{"title":"Buy","payload":"ORDER_SECRET_42"}}
            ]}]}"#,
        )
        .unwrap();

        let summaries: Vec<String> = event.messaging_events().map(event_summary).collect();

        assert_eq!(
            summaries,
            vec!["Message from USER_ID".to_string(), "Postback from USER_ID".to_string()]
        );
    }
}
