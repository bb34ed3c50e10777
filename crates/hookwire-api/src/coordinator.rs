//! Response deadline coordination.
//!
//! Dispatch runs in its own task so it survives the HTTP response. The
//! request waits on that task for at most the configured deadline:
//!
//! ```text
//!   spawn(receive) ──┬── settles first ──▶ 200 "ok\n" / 500 <handler errors>
//!                    └── deadline first ─▶ 202 "still processing\n"
//!                                          └─▶ watcher logs the late outcome
//! ```
//!
//! The deadline timer belongs to the request future and is dropped as soon
//! as either side settles, so concurrent deliveries never share timer state.
//! A request produces exactly one [`DispatchOutcome`] and therefore exactly
//! one response.

use std::{sync::Arc, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hookwire_core::{DeliveryId, DispatchError, WebhookEvent, Webhooks};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// Body of the `200` response.
pub const OK_BODY: &str = "ok\n";

/// Body of the `202` response.
pub const STILL_PROCESSING_BODY: &str = "still processing\n";

/// How a dispatch settled relative to the response deadline.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Every handler succeeded before the deadline.
    Completed,
    /// At least one handler failed before the deadline.
    Failed(DispatchError),
    /// The dispatch task itself died before the deadline.
    Aborted(String),
    /// The deadline passed; dispatch continues in the background.
    StillProcessing,
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Completed => (StatusCode::OK, OK_BODY).into_response(),
            Self::Failed(error) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            },
            Self::Aborted(message) => (StatusCode::INTERNAL_SERVER_ERROR, message).into_response(),
            Self::StillProcessing => (StatusCode::ACCEPTED, STILL_PROCESSING_BODY).into_response(),
        }
    }
}

/// Dispatches `event`, waiting at most `deadline` for the outcome.
///
/// When the deadline wins, dispatch is not cancelled. A detached watcher
/// awaits it and logs its result; failures also reach the dispatcher's
/// error handlers. Nothing from a late dispatch is surfaced to the caller.
pub async fn dispatch_with_deadline(
    webhooks: Arc<Webhooks>,
    event: WebhookEvent,
    deadline: Duration,
) -> DispatchOutcome {
    let delivery_id = event.id.clone();
    let mut dispatch =
        tokio::spawn(async move { webhooks.receive(event).await }.in_current_span());

    match tokio::time::timeout(deadline, &mut dispatch).await {
        Ok(Ok(Ok(()))) => {
            debug!(delivery_id = %delivery_id, "Dispatch completed within deadline");
            DispatchOutcome::Completed
        },
        Ok(Ok(Err(error))) => DispatchOutcome::Failed(error),
        Ok(Err(join_error)) => {
            error!(delivery_id = %delivery_id, error = %join_error, "Dispatch task aborted");
            DispatchOutcome::Aborted(format!("dispatch aborted: {join_error}"))
        },
        Err(_elapsed) => {
            info!(
                delivery_id = %delivery_id,
                deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                "Response deadline exceeded, continuing dispatch in background"
            );
            tokio::spawn(watch_late_dispatch(delivery_id, dispatch).in_current_span());
            DispatchOutcome::StillProcessing
        },
    }
}

async fn watch_late_dispatch(
    delivery_id: DeliveryId,
    dispatch: JoinHandle<Result<(), DispatchError>>,
) {
    match dispatch.await {
        Ok(Ok(())) => {
            debug!(delivery_id = %delivery_id, "Background dispatch completed");
        },
        Ok(Err(error)) => {
            warn!(
                delivery_id = %delivery_id,
                failed_handlers = error.len(),
                error = %error,
                "Background dispatch failed after response was sent"
            );
        },
        Err(join_error) => {
            error!(delivery_id = %delivery_id, error = %join_error, "Background dispatch aborted");
        },
    }
}

#[cfg(test)]
mod tests {
    use hookwire_core::EventName;
    use serde_json::json;

    use super::*;

    fn event() -> WebhookEvent {
        WebhookEvent::new(DeliveryId::from("delivery-1"), EventName::from("push"), json!({}))
    }

    #[tokio::test]
    async fn completes_without_handlers() {
        let webhooks = Arc::new(Webhooks::new("secret"));

        let outcome = dispatch_with_deadline(webhooks, event(), Duration::from_secs(1)).await;

        assert!(matches!(outcome, DispatchOutcome::Completed));
    }

    #[tokio::test]
    async fn reports_failure_within_deadline() {
        let webhooks = Arc::new(Webhooks::new("secret"));
        webhooks.on("push", |_event: WebhookEvent| async move {
            Err::<(), _>(anyhow::anyhow!("boom"))
        });

        let outcome = dispatch_with_deadline(webhooks, event(), Duration::from_secs(1)).await;

        match outcome {
            DispatchOutcome::Failed(error) => assert_eq!(error.to_string(), "boom"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn answers_still_processing_after_deadline() {
        let webhooks = Arc::new(Webhooks::new("secret"));
        webhooks.on("push", |_event: WebhookEvent| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            anyhow::Ok(())
        });

        let outcome = dispatch_with_deadline(webhooks, event(), Duration::from_secs(9)).await;

        assert!(matches!(outcome, DispatchOutcome::StillProcessing));
    }

    #[tokio::test(start_paused = true)]
    async fn late_failure_reaches_error_handlers() {
        let webhooks = Arc::new(Webhooks::new("secret"));
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = parking_lot::Mutex::new(Some(tx));

        webhooks.on("push", |_event: WebhookEvent| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err::<(), _>(anyhow::anyhow!("oops"))
        });
        webhooks.on_error(move |error: &DispatchError| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(error.to_string());
            }
        });

        let outcome =
            dispatch_with_deadline(webhooks.clone(), event(), Duration::from_secs(9)).await;
        assert!(matches!(outcome, DispatchOutcome::StillProcessing));

        assert_eq!(rx.await.unwrap(), "oops");
    }

    #[test]
    fn outcomes_map_to_status_codes() {
        assert_eq!(DispatchOutcome::Completed.into_response().status(), StatusCode::OK);
        assert_eq!(DispatchOutcome::StillProcessing.into_response().status(), StatusCode::ACCEPTED);
        assert_eq!(
            DispatchOutcome::Aborted("gone".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
