//! Receiver middleware with fall-through for unrelated requests.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{handlers::receive::handle_delivery, receiver::WebhookReceiver};

/// Axum middleware that answers deliveries to the webhook route.
///
/// Every other request is passed to the next service unchanged, so the
/// receiver's unhandled-request callback is never consulted here.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use axum::{middleware, routing::get, Router};
/// use hookwire_api::{
///     middleware::webhook::webhook_middleware, ReceiverConfig, WebhookReceiver,
/// };
/// use hookwire_core::Webhooks;
///
/// let webhooks = Arc::new(Webhooks::new("secret"));
/// let receiver = WebhookReceiver::new(webhooks, ReceiverConfig::default());
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .fallback(|| async { "not here" })
///     .layer(middleware::from_fn_with_state(receiver, webhook_middleware));
/// ```
pub async fn webhook_middleware(
    State(receiver): State<WebhookReceiver>,
    request: Request,
    next: Next,
) -> Response {
    if receiver.matches_route(request.method(), request.uri().path()) {
        return handle_delivery(&receiver, request).await;
    }

    next.run(request).await
}
