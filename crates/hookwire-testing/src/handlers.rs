//! Event handlers that record what they receive.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use hookwire_core::{EventHandler, WebhookEvent};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Handler that records every event it is invoked with.
///
/// Clones share the same record, so a test can register one clone and
/// assert on another. Optionally sleeps before recording and fails after.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<WebhookEvent>>>,
    notify: Arc<Notify>,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl RecordingHandler {
    /// Creates a handler that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` before completing.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails with `message` after recording the event.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Events received so far, in arrival order.
    pub fn events(&self) -> Vec<WebhookEvent> {
        self.events.lock().clone()
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Waits until at least `count` events have been recorded.
    pub async fn wait_for(&self, count: usize) -> Vec<WebhookEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let events = self.events.lock();
                if events.len() >= count {
                    return events.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: WebhookEvent) -> anyhow::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.events.lock().push(event);
        self.notify.notify_waiters();

        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}
