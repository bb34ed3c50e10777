//! HTTP server setup and request routing.
//!
//! The receiver is mounted as the router fallback, so the route check in
//! [`receive_webhook`] sees every request. Requests flow through:
//! 1. Request ID generation
//! 2. Request/response tracing
//! 3. Route check and delivery handling
//!
//! # Graceful Shutdown
//!
//! On CTRL+C or SIGTERM the server stops accepting connections and waits
//! for in-flight requests. Dispatches already answered with `202` keep
//! running only as long as the runtime does.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use hookwire_core::Webhooks;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    handlers::receive_webhook,
    receiver::{ReceiverConfig, WebhookReceiver},
};

/// Creates the router serving `webhooks` under `config`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use hookwire_api::{create_router, ReceiverConfig};
/// use hookwire_core::Webhooks;
///
/// let webhooks = Arc::new(Webhooks::new("mySecret"));
/// let app = create_router(webhooks, ReceiverConfig::default());
/// ```
pub fn create_router(webhooks: Arc<Webhooks>, config: ReceiverConfig) -> Router {
    Router::new()
        .fallback(receive_webhook)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(WebhookReceiver::new(webhooks, config))
}

/// Adds an `X-Request-Id` header to every response.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Serves the receiver on `addr` until a shutdown signal arrives.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(
    webhooks: Arc<Webhooks>,
    config: ReceiverConfig,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let path = config.path.clone();
    let app = create_router(webhooks, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, path = %path, "Webhook receiver listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Webhook receiver stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = create_router(Arc::new(Webhooks::new("secret")), ReceiverConfig::default());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let request_id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }
}
