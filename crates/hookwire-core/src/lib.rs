//! Core webhook primitives: signature verification, delivery models, and
//! in-process event dispatch.
//!
//! Transport crates turn inbound HTTP requests into [`Delivery`] values and
//! hand verified [`WebhookEvent`]s to a shared [`Webhooks`] dispatcher.
//! Nothing in this crate knows about HTTP.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod signature;

pub use error::{DispatchError, HookError, Result};
pub use events::{ErrorHandler, EventHandler, Webhooks, WILDCARD};
pub use models::{Delivery, DeliveryBody, DeliveryId, EventName, WebhookEvent};
pub use signature::{sign, verify, Secret, SignatureError, SIGNATURE_PREFIX};
