//! HTTP transport for hookwire.
//!
//! Receives webhook deliveries over axum, verifies and parses them, and
//! dispatches them to a shared [`hookwire_core::Webhooks`] within a response
//! deadline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod handlers;
pub mod middleware;
pub mod receiver;
pub mod server;

pub use config::Config;
pub use coordinator::{dispatch_with_deadline, DispatchOutcome};
pub use handlers::{receive_webhook, webhook_handler, PreParsedBody};
pub use middleware::webhook::webhook_middleware;
pub use receiver::{ReceiverConfig, RequiredHeaders, UnhandledRequest, WebhookReceiver};
pub use server::{create_router, start_server};
