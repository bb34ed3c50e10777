//! Webhook delivery handler.
//!
//! Turns an inbound request into a verified [`WebhookEvent`] and hands it to
//! the response coordinator. Each step short-circuits with its own error:
//!
//! ```text
//!   route ─▶ headers ─▶ body ─▶ signature ─▶ JSON ─▶ dispatch_with_deadline
//!    404       400     413/400     401        400       200 / 500 / 202
//! ```
//!
//! Rejected requests never reach the dispatcher.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use hookwire_core::{Delivery, DeliveryBody, DeliveryId, EventName, HookError, WebhookEvent};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use tracing::{debug, instrument};

use super::error_response;
use crate::{
    coordinator::dispatch_with_deadline,
    receiver::{ReceiverConfig, RequiredHeaders, WebhookReceiver},
};

/// Body already parsed by the host, supplied as a request extension.
///
/// When present the request body stream is ignored and the signature is
/// checked against the compact re-serialization of this value.
#[derive(Debug, Clone, PartialEq)]
pub struct PreParsedBody(pub Value);

/// Values of the required delivery headers.
#[derive(Debug)]
struct DeliveryHeaders {
    id: String,
    name: String,
    signature: String,
}

/// Receives a webhook delivery.
///
/// Mounted as the router fallback so every request passes through the route
/// check; requests outside the webhook route go to the unhandled-request
/// handler.
#[instrument(
    name = "receive_webhook",
    skip_all,
    fields(method = %request.method(), path = %request.uri().path())
)]
pub async fn receive_webhook(
    State(receiver): State<WebhookReceiver>,
    request: Request,
) -> Response {
    if !receiver.matches_route(request.method(), request.uri().path()) {
        return unhandled_request(receiver.config(), request).await;
    }

    handle_delivery(&receiver, request).await
}

/// Receives a webhook delivery on a route chosen by the host router.
///
/// Skips the method and path checks, so the configured path is ignored and
/// the unhandled-request handler is never consulted. Mount it with a method
/// router such as `post(webhook_handler)`.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use axum::{routing::post, Router};
/// use hookwire_api::{webhook_handler, ReceiverConfig, WebhookReceiver};
/// use hookwire_core::Webhooks;
///
/// let webhooks = Arc::new(Webhooks::new("secret"));
/// let receiver = WebhookReceiver::new(webhooks, ReceiverConfig::default());
/// let app: Router = Router::new().route("/github", post(webhook_handler)).with_state(receiver);
/// ```
#[instrument(
    name = "webhook_handler",
    skip_all,
    fields(method = %request.method(), path = %request.uri().path())
)]
pub async fn webhook_handler(
    State(receiver): State<WebhookReceiver>,
    request: Request,
) -> Response {
    handle_delivery(&receiver, request).await
}

/// Runs a request already known to address the webhook route.
pub(crate) async fn handle_delivery(receiver: &WebhookReceiver, request: Request) -> Response {
    let event = match accept_delivery(receiver, request).await {
        Ok(event) => event,
        Err(error) => return error_response(&error),
    };

    debug!(delivery_id = %event.id, event_name = %event.name, "Delivery accepted");

    dispatch_with_deadline(
        receiver.webhooks().clone(),
        event,
        receiver.config().response_deadline,
    )
    .await
    .into_response()
}

/// Answers a request outside the webhook route.
pub(crate) async fn unhandled_request(config: &ReceiverConfig, request: Request) -> Response {
    if let Some(handler) = &config.on_unhandled_request {
        return handler(request).await;
    }

    error_response(&HookError::UnknownRoute {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
    })
}

async fn accept_delivery(
    receiver: &WebhookReceiver,
    request: Request,
) -> Result<WebhookEvent, HookError> {
    let config = receiver.config();
    let (parts, body) = request.into_parts();

    let headers = required_headers(&parts.headers, &config.headers)?;

    let body = match parts.extensions.get::<PreParsedBody>() {
        Some(PreParsedBody(value)) => DeliveryBody::Parsed(value.clone()),
        None => DeliveryBody::Raw(read_body(body, config.max_body_bytes).await?),
    };

    let delivery = Delivery {
        id: DeliveryId::from(headers.id),
        name: EventName::from(headers.name),
        body,
        signature: headers.signature,
    };

    if !receiver.webhooks().verify_delivery(&delivery) {
        return Err(HookError::SignatureMismatch);
    }

    delivery.into_event()
}

/// Collects the required header values, reporting every missing name.
///
/// A header that is empty or not valid UTF-8 counts as missing.
fn required_headers(
    headers: &HeaderMap,
    required: &RequiredHeaders,
) -> Result<DeliveryHeaders, HookError> {
    let mut missing = Vec::new();
    let mut lookup = |name: &HeaderName| {
        let value = headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if value.is_none() {
            missing.push(name.as_str().to_string());
        }
        value
    };

    let id = lookup(&required.delivery_id);
    let name = lookup(&required.event_name);
    let signature = lookup(&required.signature);

    match (id, name, signature) {
        (Some(id), Some(name), Some(signature)) => Ok(DeliveryHeaders { id, name, signature }),
        _ => Err(HookError::MissingHeaders { names: missing }),
    }
}

/// Buffers the request body, failing once it exceeds `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, HookError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(error) if error.downcast_ref::<LengthLimitError>().is_some() => {
            Err(HookError::PayloadTooLarge { limit })
        },
        Err(error) => Err(HookError::BodyRead { message: error.to_string() }),
    }
}
