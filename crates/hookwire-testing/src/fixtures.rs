//! Delivery fixtures and signed request builders.
//!
//! [`DeliveryRequestBuilder`] produces requests that pass every receiver
//! check by default; each setter breaks or changes exactly one of them.

use std::collections::HashSet;

use axum::{body::Body, extract::Request};
use bytes::Bytes;
use hookwire_core::sign;
use serde_json::{json, Value};

/// Secret shared by test dispatchers and signed requests.
pub const TEST_SECRET: &str = "mySecret";

/// Delivery identifier used by default.
pub const DELIVERY_ID: &str = "123e4567-e89b-12d3-a456-426655440000";

const DEFAULT_PATH: &str = "/api/github/webhooks";
const DELIVERY_ID_HEADER: &str = "x-github-delivery";
const EVENT_NAME_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Minimal `push` event payload.
pub fn push_event_payload() -> Value {
    json!({
        "ref": "refs/heads/main",
        "before": "6113728f27ae82c7b1a177c8d03f9e96e0adf246",
        "after": "0000000000000000000000000000000000000000",
        "repository": {
            "id": 1296269,
            "full_name": "octocat/Hello-World"
        },
        "pusher": { "name": "octocat" }
    })
}

/// Builder for delivery requests.
#[derive(Debug, Clone)]
pub struct DeliveryRequestBuilder {
    method: String,
    path: String,
    delivery_id: String,
    event: String,
    body: Bytes,
    secret: String,
    signature: Option<String>,
    omitted: HashSet<String>,
    extra_headers: Vec<(String, String)>,
}

impl DeliveryRequestBuilder {
    /// Creates a signed `push` delivery to the default path.
    pub fn new() -> Self {
        Self {
            method: "POST".to_string(),
            path: DEFAULT_PATH.to_string(),
            delivery_id: DELIVERY_ID.to_string(),
            event: "push".to_string(),
            body: Bytes::from(push_event_payload().to_string()),
            secret: TEST_SECRET.to_string(),
            signature: None,
            omitted: HashSet::new(),
            extra_headers: Vec::new(),
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the event name header.
    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Sets the delivery identifier header.
    #[must_use]
    pub fn delivery_id(mut self, id: impl Into<String>) -> Self {
        self.delivery_id = id.into();
        self
    }

    /// Sets the raw body. The signature is computed over these bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body to the compact serialization of `value`.
    #[must_use]
    pub fn json_body(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self
    }

    /// Signs with `secret` instead of [`TEST_SECRET`].
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Sends `signature` verbatim instead of computing one.
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Leaves out one of the required headers.
    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.omitted.insert(name.into().to_ascii_lowercase());
        self
    }

    /// Adds an arbitrary header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// The signature that [`build`](Self::build) will send.
    ///
    /// # Panics
    ///
    /// Panics if the secret is empty and no explicit signature was set.
    pub fn computed_signature(&self) -> String {
        match &self.signature {
            Some(signature) => signature.clone(),
            None => {
                sign(self.secret.as_bytes(), &self.body).expect("test secret must not be empty")
            },
        }
    }

    /// Builds the request.
    ///
    /// # Panics
    ///
    /// Panics if a method, path, or header is malformed.
    pub fn build(self) -> Request {
        let signature = self.computed_signature();
        let mut builder = Request::builder().method(self.method.as_str()).uri(self.path.as_str());

        for (name, value) in [
            (DELIVERY_ID_HEADER, self.delivery_id.as_str()),
            (EVENT_NAME_HEADER, self.event.as_str()),
            (SIGNATURE_HEADER, signature.as_str()),
        ] {
            if !self.omitted.contains(name) {
                builder = builder.header(name, value);
            }
        }
        for (name, value) in &self.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .header("content-type", "application/json")
            .body(Body::from(self.body))
            .expect("test request should be well formed")
    }
}

impl Default for DeliveryRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
