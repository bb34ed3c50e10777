//! Delivery and event models.
//!
//! A [`Delivery`] is the unverified form of an inbound webhook request. Once
//! its signature checks out and its body parses, it becomes an immutable
//! [`WebhookEvent`] that handlers receive.

use std::{borrow::Cow, fmt};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Result, signature};

/// Provider-assigned identifier of one delivery.
///
/// Opaque to hookwire; GitHub sends a GUID in `X-GitHub-Delivery`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeliveryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeliveryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Provider-defined event name such as `push` or `issues`.
///
/// Matched case-sensitively against handler patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventName(pub String);

impl EventName {
    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Verified, parsed webhook event handed to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Delivery identifier.
    pub id: DeliveryId,
    /// Event name from the event header.
    pub name: EventName,
    /// Parsed JSON payload.
    pub payload: Value,
}

impl WebhookEvent {
    /// Creates an event record.
    pub fn new(id: DeliveryId, name: EventName, payload: Value) -> Self {
        Self { id, name, payload }
    }

    /// The payload's `action` field, if it is a string.
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }

    /// Compound `name.action` pattern, when the payload carries an action.
    pub fn qualified_name(&self) -> Option<String> {
        self.action().map(|action| format!("{}.{action}", self.name))
    }
}

/// Body of a delivery as the receiver obtained it.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryBody {
    /// Bytes exactly as transmitted.
    Raw(Bytes),
    /// Value already parsed by the host before the receiver saw the request.
    Parsed(Value),
}

impl DeliveryBody {
    /// Bytes the signature is checked against.
    ///
    /// `Raw` bodies are used as-is. `Parsed` bodies are re-serialized
    /// compactly with object keys in insertion order; this matches what most
    /// senders transmit but is not guaranteed to be byte-identical (spacing,
    /// float formatting and escapes can differ).
    pub fn signed_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Raw(bytes) => Cow::Borrowed(bytes.as_ref()),
            Self::Parsed(value) => Cow::Owned(serde_json::to_vec(value).unwrap_or_default()),
        }
    }

    /// Parses the body into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HookError::InvalidJson`] if a raw body is not valid
    /// JSON.
    pub fn into_payload(self) -> Result<Value> {
        match self {
            Self::Raw(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Self::Parsed(value) => Ok(value),
        }
    }
}

/// Unverified inbound delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Delivery identifier header value.
    pub id: DeliveryId,
    /// Event name header value.
    pub name: EventName,
    /// Request body.
    pub body: DeliveryBody,
    /// Signature header value.
    pub signature: String,
}

impl Delivery {
    /// Checks the signature against the delivery body.
    pub fn verify(&self, secret: &[u8]) -> bool {
        signature::verify(secret, &self.body.signed_bytes(), &self.signature)
    }

    /// Parses the body and builds the event record.
    ///
    /// Does not check the signature; call [`Delivery::verify`] first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HookError::InvalidJson`] if the body is not valid JSON.
    pub fn into_event(self) -> Result<WebhookEvent> {
        let payload = self.body.into_payload()?;
        Ok(WebhookEvent::new(self.id, self.name, payload))
    }
}
