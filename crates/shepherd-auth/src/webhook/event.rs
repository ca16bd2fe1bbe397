//! Typed envelope for verified billing events
//!
//! Handlers dispatch on the event type and pick the fields they need out
//! of the payload object; shapes vary per type, so the object stays raw
//! JSON rather than being modeled here.

use serde::Deserialize;

use crate::error::WebhookError;

/// A billing event parsed from a verified webhook body
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    /// Provider-assigned event id
    #[serde(default)]
    pub id: Option<String>,

    /// Event type, e.g. `checkout.session.completed` or
    /// `customer.subscription.updated`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload
    pub data: EventData,
}

/// The payload half of an event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event describes (a checkout session, a subscription...)
    pub object: serde_json::Value,
}

impl BillingEvent {
    /// Parse a verified raw body into an event envelope
    ///
    /// Only call this with a body that already passed signature
    /// verification; parsing is not a security boundary.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Payload`] when the body is not an event
    /// envelope.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        Ok(serde_json::from_slice(body)?)
    }
}
