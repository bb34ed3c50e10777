//! Error taxonomy for webhook receipt and dispatch.
//!
//! Receipt errors (routing, header validation, authentication, payload) are
//! resolved by the transport into a response and never reach handlers.
//! [`DispatchError`] is the only error produced by the dispatcher itself.

use std::fmt;

use thiserror::Error;

use crate::models::WebhookEvent;

/// Result type alias using [`HookError`].
pub type Result<T> = std::result::Result<T, HookError>;

/// Errors raised while receiving and dispatching a webhook delivery.
#[derive(Debug, Error)]
pub enum HookError {
    // Receipt errors (E1001-E1006)
    /// Request method or path does not address the webhook endpoint (E1001).
    #[error("Unknown route: {method} {path}")]
    UnknownRoute {
        /// HTTP method of the rejected request
        method: String,
        /// Request path of the rejected request
        path: String,
    },

    /// One or more required delivery headers are absent (E1002).
    #[error("Required headers missing: {}", .names.join(", "))]
    MissingHeaders {
        /// Lowercase names of the missing headers
        names: Vec<String>,
    },

    /// Signature header does not match the payload and secret (E1003).
    #[error("signature does not match event payload and secret")]
    SignatureMismatch,

    /// Payload is not valid JSON (E1004).
    #[error("SyntaxError: Invalid JSON: {message}")]
    InvalidJson {
        /// Parser diagnostic
        message: String,
    },

    /// Payload exceeds the configured body limit (E1005).
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Request body stream failed before completion (E1006).
    #[error("failed to read request body: {message}")]
    BodyRead {
        /// Underlying stream error
        message: String,
    },

    // Dispatch errors (E2001)
    /// One or more handlers failed (E2001).
    #[error(transparent)]
    Handler(#[from] DispatchError),
}

impl HookError {
    /// Returns the stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownRoute { .. } => "E1001",
            Self::MissingHeaders { .. } => "E1002",
            Self::SignatureMismatch => "E1003",
            Self::InvalidJson { .. } => "E1004",
            Self::PayloadTooLarge { .. } => "E1005",
            Self::BodyRead { .. } => "E1006",
            Self::Handler(_) => "E2001",
        }
    }

    /// Returns whether the error was caused by the sender rather than by a
    /// registered handler.
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Handler(_))
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson { message: err.to_string() }
    }
}

/// Aggregate of every handler failure from one dispatch.
///
/// Errors are kept in invocation order. The event that triggered them is
/// retained so error handlers can correlate failures with deliveries.
#[derive(Debug)]
pub struct DispatchError {
    event: WebhookEvent,
    errors: Vec<anyhow::Error>,
}

impl DispatchError {
    /// Creates an aggregate from the failed event and its handler errors.
    pub fn new(event: WebhookEvent, errors: Vec<anyhow::Error>) -> Self {
        Self { event, errors }
    }

    /// The event whose handlers failed.
    pub fn event(&self) -> &WebhookEvent {
        &self.event
    }

    /// Handler errors in invocation order.
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    /// Number of failed handlers.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true when no handler failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{error:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors.first().map(|error| {
            let source: &(dyn std::error::Error + 'static) = error.as_ref();
            source
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{DeliveryId, EventName};

    fn push_event() -> WebhookEvent {
        WebhookEvent::new(DeliveryId::from("abc"), EventName::from("push"), json!({}))
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(HookError::SignatureMismatch.code(), "E1003");
        assert_eq!(HookError::PayloadTooLarge { limit: 1 }.code(), "E1005");
        assert_eq!(HookError::MissingHeaders { names: vec![] }.code(), "E1002");
    }

    #[test]
    fn missing_headers_message_lists_names() {
        let error = HookError::MissingHeaders {
            names: vec!["x-github-event".to_string(), "x-hub-signature-256".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Required headers missing: x-github-event, x-hub-signature-256"
        );
    }

    #[test]
    fn invalid_json_message_carries_parser_detail() {
        let parse_error = serde_json::from_slice::<serde_json::Value>(b"invalid").unwrap_err();
        let error = HookError::from(parse_error);

        let message = error.to_string();
        assert!(message.starts_with("SyntaxError: Invalid JSON: "));
        assert!(message.contains("expected value"));
    }

    #[test]
    fn dispatch_error_joins_messages_in_order() {
        let error = DispatchError::new(push_event(), vec![
            anyhow::anyhow!("first"),
            anyhow::anyhow!("second"),
        ]);

        assert_eq!(error.len(), 2);
        assert_eq!(error.to_string(), "first\nsecond");
        assert_eq!(error.event().name.as_str(), "push");
    }

    #[test]
    fn handler_errors_are_not_client_errors() {
        let dispatch = DispatchError::new(push_event(), vec![anyhow::anyhow!("boom")]);
        let error = HookError::from(dispatch);

        assert!(!error.is_client_error());
        assert!(HookError::SignatureMismatch.is_client_error());
        assert_eq!(error.to_string(), "boom");
    }
}
