//! HTTP middleware for mounting the receiver inside a host router.
//!
//! Hosts that already run an axum application can layer
//! [`webhook::webhook_middleware`] onto it instead of using the receiver as
//! the router fallback. Hosts that pick the delivery route themselves mount
//! [`crate::webhook_handler`] on it instead.
pub mod webhook;
