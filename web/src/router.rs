use crate::AppState;
use axum::{routing::get, Router};

use crate::controller::{health_check_controller, webhook_controller};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

#[derive(OpenApi)]
#[openapi(
        info(
            title = "Messenger Platform Webhook API",
            description = "Receives signed webhook events from the Messenger Platform",
        ),
        paths(
            health_check_controller::health_check,
            webhook_controller::verify_subscription,
            webhook_controller::receive_event,
        ),
        tags(
            (name = "messenger_platform", description = "Messenger Platform webhook receiver")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(webhook_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for the platform webhook (no session authentication - validated by signature)
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(webhook_controller::verify_subscription).post(webhook_controller::receive_event),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use domain::SignatureVerifier;
    use secrecy::SecretString;
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::try_parse_args(["messenger_platform_rs"]).unwrap();
        let verifier = SignatureVerifier::new(SecretString::new("app_secret".to_string())).unwrap();
        define_routes(AppState::new(config, Arc::new(verifier), None))
    }

    #[tokio::test]
    async fn test_health_check() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[tokio::test]
    async fn test_openapi_document_lists_webhook() {
        let request = Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let document = String::from_utf8(body.to_vec()).unwrap();
        assert!(document.contains("/webhook"));
        assert!(document.contains("/health"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::builder()
            .uri("/webhooks")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
