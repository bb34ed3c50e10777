//! hookwire webhook receiver.
//!
//! Loads configuration, registers a handler that logs every verified event,
//! and serves the receiver until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use hookwire_api::Config;
use hookwire_core::{DispatchError, WebhookEvent, Webhooks};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    info!(config = ?config, "Configuration loaded");

    let webhooks = Arc::new(config.webhooks());
    register_event_logging(&webhooks);

    let receiver_config = config.to_receiver_config()?;
    let addr = config.parse_server_addr()?;

    hookwire_api::start_server(webhooks, receiver_config, addr)
        .await
        .context("Webhook receiver failed")?;

    info!("hookwire shutdown complete");
    Ok(())
}

/// Initializes tracing from `RUST_LOG`, falling back to the configured filter.
fn init_tracing(configured: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Logs every verified event and every failed dispatch.
fn register_event_logging(webhooks: &Webhooks) {
    webhooks.on_any(|event: WebhookEvent| async move {
        info!(
            delivery_id = %event.id,
            event_name = %event.name,
            action = event.action().unwrap_or("-"),
            "Received webhook event"
        );
        anyhow::Ok(())
    });

    webhooks.on_error(|error: &DispatchError| {
        error!(
            delivery_id = %error.event().id,
            event_name = %error.event().name,
            failed_handlers = error.len(),
            error = %error,
            "Webhook event handlers failed"
        );
    });
}
