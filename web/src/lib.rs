use std::sync::Arc;

use domain::error::Error as DomainError;
use domain::gateway::messenger::MessengerClient;
use domain::{SignatureVerifier, WebhookValidator};
use log::*;
use service::config::Config;
use tokio::net::TcpListener;

mod controller;
mod error;
pub mod router;

pub use error::{Error, Result};

/// Shared state handed to every webhook handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    validator: Arc<dyn WebhookValidator>,
    messenger_client: Option<Arc<MessengerClient>>,
}

impl AppState {
    pub fn new(
        config: Config,
        validator: Arc<dyn WebhookValidator>,
        messenger_client: Option<Arc<MessengerClient>>,
    ) -> Self {
        Self {
            config,
            validator,
            messenger_client,
        }
    }

    /// Builds the signature verifier and, when a page access token is configured,
    /// the platform client.
    ///
    /// A missing application secret fails startup. A missing page access token only
    /// disables outbound calls.
    pub fn from_config(config: Config) -> core::result::Result<Self, DomainError> {
        let verifier = SignatureVerifier::from_optional(config.app_secret())
            .map_err(|e| {
                error!("APP_SECRET must be set to verify webhook signatures");
                DomainError::from(e)
            })?
            .with_signature_header(config.signature_header());

        let messenger_client = match config.page_access_token() {
            Some(_) => Some(Arc::new(MessengerClient::new(&config)?)),
            None => {
                info!("No PAGE_ACCESS_TOKEN configured, outbound platform calls are disabled");
                None
            }
        };

        Ok(Self::new(config, Arc::new(verifier), messenger_client))
    }

    pub fn validator(&self) -> &dyn WebhookValidator {
        self.validator.as_ref()
    }

    pub fn messenger_client(&self) -> Option<&Arc<MessengerClient>> {
        self.messenger_client.as_ref()
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{}:{}", interface, app_state.config.port);

    info!(
        "Server starting... listening for connections on http://{}",
        listen_addr
    );

    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, router::define_routes(app_state)).await
}
