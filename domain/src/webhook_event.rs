//! Inbound webhook event envelope.
//!
//! Deserialization is lenient: unknown fields are ignored and optional parts
//! default, so new platform fields never cause a webhook to be rejected.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use log::*;
use serde::Deserialize;

/// Top-level webhook payload, e.g. `{"object":"page","entry":[...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEvent {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One page's batch of events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Set when the page itself sent the message.
    #[serde(default)]
    pub is_echo: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

/// What a messaging event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingEventKind {
    Message,
    Echo,
    Postback,
    Other,
}

impl WebhookEvent {
    /// Parse a payload from the raw request body.
    ///
    /// Call this only after the body's signature has been verified.
    pub fn from_slice(raw_body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(raw_body).map_err(|e| {
            warn!("Failed to parse webhook payload: {}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::InvalidPayload),
            }
        })
    }

    /// True for page subscriptions, the only object type the Messenger Platform delivers.
    pub fn is_page(&self) -> bool {
        self.object == "page"
    }

    /// All messaging events across every entry, in delivery order.
    pub fn messaging_events(&self) -> impl Iterator<Item = &MessagingEvent> {
        self.entry.iter().flat_map(|entry| entry.messaging.iter())
    }
}

impl MessagingEvent {
    pub fn kind(&self) -> MessagingEventKind {
        match (&self.message, &self.postback) {
            (Some(message), _) if message.is_echo => MessagingEventKind::Echo,
            (Some(_), _) => MessagingEventKind::Message,
            (None, Some(_)) => MessagingEventKind::Postback,
            (None, None) => MessagingEventKind::Other,
        }
    }

    /// Text of an inbound (non-echo) message, if any.
    pub fn text(&self) -> Option<&str> {
        match self.kind() {
            MessagingEventKind::Message => self.message.as_ref()?.text.as_deref(),
            _ => None,
        }
    }
}
