//! Receiver state shared by the router and the middleware.
//!
//! [`WebhookReceiver`] pairs the dispatcher with the per-endpoint
//! [`ReceiverConfig`]. Both are immutable once the router is built.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use axum::{
    extract::Request,
    http::{HeaderName, Method},
    response::Response,
};
use futures::future::BoxFuture;
use hookwire_core::Webhooks;

/// Default webhook endpoint path.
pub const DEFAULT_PATH: &str = "/api/github/webhooks";

/// Default time to wait for handlers before answering `202 Accepted`.
///
/// Kept under the 10 second execution limit of common serverless hosts.
pub const DEFAULT_RESPONSE_DEADLINE: Duration = Duration::from_millis(9_000);

/// Default maximum request body size (10MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Callback that takes over requests outside the webhook route.
///
/// Receives the complete request and produces the complete response.
pub type UnhandledRequest = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Names of the headers every delivery must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredHeaders {
    /// Delivery identifier header.
    pub delivery_id: HeaderName,
    /// Event name header.
    pub event_name: HeaderName,
    /// Signature header.
    pub signature: HeaderName,
}

impl Default for RequiredHeaders {
    fn default() -> Self {
        Self {
            delivery_id: HeaderName::from_static("x-github-delivery"),
            event_name: HeaderName::from_static("x-github-event"),
            signature: HeaderName::from_static("x-hub-signature-256"),
        }
    }
}

/// Endpoint configuration for the receiver.
#[derive(Clone)]
pub struct ReceiverConfig {
    /// Path deliveries are POSTed to.
    pub path: String,
    /// How long to wait for handlers before answering `202`.
    pub response_deadline: Duration,
    /// Largest body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Required delivery headers.
    pub headers: RequiredHeaders,
    /// Replaces the default `404 Unknown route` response.
    pub on_unhandled_request: Option<UnhandledRequest>,
}

impl ReceiverConfig {
    /// Sets the endpoint path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the response deadline.
    #[must_use]
    pub fn with_response_deadline(mut self, deadline: Duration) -> Self {
        self.response_deadline = deadline;
        self
    }

    /// Sets the body size limit.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Sets the required header names.
    #[must_use]
    pub fn with_headers(mut self, headers: RequiredHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Installs a handler for requests outside the webhook route.
    #[must_use]
    pub fn with_unhandled_request<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.on_unhandled_request =
            Some(Arc::new(move |request: Request| -> BoxFuture<'static, Response> {
                Box::pin(handler(request))
            }));
        self
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_string(),
            response_deadline: DEFAULT_RESPONSE_DEADLINE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            headers: RequiredHeaders::default(),
            on_unhandled_request: None,
        }
    }
}

impl fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("path", &self.path)
            .field("response_deadline", &self.response_deadline)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("headers", &self.headers)
            .field("on_unhandled_request", &self.on_unhandled_request.is_some())
            .finish()
    }
}

/// Dispatcher plus endpoint configuration, used as axum state.
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    webhooks: Arc<Webhooks>,
    config: Arc<ReceiverConfig>,
}

impl WebhookReceiver {
    /// Creates receiver state.
    pub fn new(webhooks: Arc<Webhooks>, config: ReceiverConfig) -> Self {
        Self { webhooks, config: Arc::new(config) }
    }

    /// The shared dispatcher.
    pub fn webhooks(&self) -> &Arc<Webhooks> {
        &self.webhooks
    }

    /// The endpoint configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Returns true when the request addresses the webhook endpoint.
    pub fn matches_route(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && path == self.config.path
    }
}
