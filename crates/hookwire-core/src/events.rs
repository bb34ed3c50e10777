//! In-process event dispatch keyed by event name.
//!
//! [`Webhooks`] owns the shared secret and the handler registry. Handlers
//! register under an exact event name (`push`), a compound name
//! (`issues.opened`), or the [`WILDCARD`] pattern.
//!
//! # Dispatch Order
//!
//! ```text
//!   WebhookEvent { name: "issues", payload.action: "opened" }
//!        │
//!        ├─▶ handlers["issues"]          (registration order)
//!        ├─▶ handlers["issues.opened"]   (registration order)
//!        └─▶ handlers["*"]               (registration order)
//!                     │
//!                     ▼
//!        join_all ─▶ failures collected in the order above
//! ```
//!
//! Every matching handler runs even when an earlier one fails. Failures are
//! returned together as a [`DispatchError`] and also passed to every handler
//! registered with [`Webhooks::on_error`].

use std::{
    any::Any, collections::HashMap, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc,
};

use futures::{future::join_all, FutureExt};
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    error::{DispatchError, HookError},
    models::{Delivery, WebhookEvent},
    signature::{self, Secret, SignatureError},
};

/// Pattern matching every event.
pub const WILDCARD: &str = "*";

/// Handler invoked for matching events.
///
/// Implemented for any `Fn(WebhookEvent) -> impl Future<Output =
/// anyhow::Result<()>>` closure, so most callers register closures.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one event. An `Err` is recorded as a handler failure.
    async fn handle_event(&self, event: WebhookEvent) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle_event(&self, event: WebhookEvent) -> anyhow::Result<()> {
        (self)(event).await
    }
}

/// Callback receiving every failed dispatch.
pub type ErrorHandler = Arc<dyn Fn(&DispatchError) + Send + Sync>;

type HandlerList = Vec<Arc<dyn EventHandler>>;

/// Webhook dispatcher bound to one secret.
///
/// Shared behind an `Arc`; registration takes `&self` so handlers can be
/// added while deliveries are in flight. Dispatch snapshots the matching
/// handlers and releases the registry lock before awaiting them.
pub struct Webhooks {
    secret: Secret,
    handlers: RwLock<HashMap<String, HandlerList>>,
    error_handlers: RwLock<Vec<ErrorHandler>>,
}

impl Webhooks {
    /// Creates a dispatcher with no handlers.
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
            handlers: RwLock::new(HashMap::new()),
            error_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Registers `handler` for events matching `pattern`.
    pub fn on<H>(&self, pattern: impl Into<String>, handler: H)
    where
        H: EventHandler + 'static,
    {
        let pattern = pattern.into();
        debug!(pattern = %pattern, "Registering event handler");
        self.handlers.write().entry(pattern).or_default().push(Arc::new(handler));
    }

    /// Registers `handler` for every event.
    pub fn on_any<H>(&self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.on(WILDCARD, handler);
    }

    /// Registers a callback for failed dispatches.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        self.error_handlers.write().push(Arc::new(handler));
    }

    /// Total number of registered event handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Signs `payload` with this dispatcher's secret.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::EmptySecret`] if the secret is empty.
    pub fn sign(&self, payload: &[u8]) -> Result<String, SignatureError> {
        signature::sign(self.secret.as_bytes(), payload)
    }

    /// Verifies `signature` against `payload` with this dispatcher's secret.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        signature::verify(self.secret.as_bytes(), payload, signature)
    }

    /// Checks a delivery's signature against its body with this dispatcher's
    /// secret.
    pub fn verify_delivery(&self, delivery: &Delivery) -> bool {
        delivery.verify(self.secret.as_bytes())
    }

    /// Verifies, parses and dispatches a delivery.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::SignatureMismatch`] on a bad signature,
    /// [`HookError::InvalidJson`] on an unparsable body, and
    /// [`HookError::Handler`] if any handler fails.
    pub async fn verify_and_receive(&self, delivery: Delivery) -> crate::Result<()> {
        if !self.verify_delivery(&delivery) {
            return Err(HookError::SignatureMismatch);
        }

        let event = delivery.into_event()?;
        self.receive(event).await?;
        Ok(())
    }

    /// Dispatches `event` to every matching handler.
    ///
    /// Succeeds immediately when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] holding every handler failure in
    /// invocation order.
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(delivery_id = %event.id, event_name = %event.name)
    )]
    pub async fn receive(&self, event: WebhookEvent) -> Result<(), DispatchError> {
        let handlers = self.matching_handlers(&event);

        if handlers.is_empty() {
            debug!("No handlers registered for event");
            return Ok(());
        }

        debug!(handler_count = handlers.len(), "Dispatching event");

        let invocations = handlers.iter().map(|handler| {
            AssertUnwindSafe(handler.handle_event(event.clone())).catch_unwind()
        });

        let errors: Vec<anyhow::Error> = join_all(invocations)
            .await
            .into_iter()
            .filter_map(|outcome| match outcome {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(panic) => {
                    Some(anyhow::anyhow!("handler panicked: {}", panic_message(&*panic)))
                },
            })
            .collect();

        if errors.is_empty() {
            return Ok(());
        }

        let error = DispatchError::new(event, errors);
        warn!(failed_handlers = error.len(), error = %error, "Event handlers failed");
        self.report(&error);
        Err(error)
    }

    fn matching_handlers(&self, event: &WebhookEvent) -> HandlerList {
        let registry = self.handlers.read();
        let qualified = event.qualified_name();
        // an event literally named "*" must not run wildcard handlers twice
        let exact = (event.name.as_str() != WILDCARD).then_some(event.name.as_str());

        [exact, qualified.as_deref(), Some(WILDCARD)]
            .into_iter()
            .flatten()
            .filter_map(|pattern| registry.get(pattern))
            .flatten()
            .cloned()
            .collect()
    }

    fn report(&self, error: &DispatchError) {
        let error_handlers = self.error_handlers.read().clone();
        for handler in error_handlers {
            handler(error);
        }
    }
}

impl fmt::Debug for Webhooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut patterns: Vec<String> = self.handlers.read().keys().cloned().collect();
        patterns.sort();

        f.debug_struct("Webhooks")
            .field("secret", &self.secret)
            .field("patterns", &patterns)
            .field("error_handlers", &self.error_handlers.read().len())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
