//! Test infrastructure for hookwire.
//!
//! Provides signed delivery request builders, payload fixtures, and event
//! handlers that record what they receive so tests can assert on dispatch.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
pub mod handlers;

use axum::response::Response;
use http_body_util::BodyExt;

pub use fixtures::{push_event_payload, DeliveryRequestBuilder, DELIVERY_ID, TEST_SECRET};
pub use handlers::RecordingHandler;

/// Collects a response body into a string.
///
/// # Panics
///
/// Panics if the body stream fails or is not UTF-8.
pub async fn response_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body should be UTF-8")
}
