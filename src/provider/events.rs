//! Auth-state change fan-out.
//!
//! DESIGN
//! ======
//! Providers publish `AuthEvent`s on a `broadcast` channel. Each subscriber
//! gets its own `Subscription`, a single-consumer inbox with an explicit
//! cancel hook. Lag is reported to the consumer as a delivery error and the
//! subscription stays usable; only the bus shutting down closes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

use super::types::AuthEvent;

const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The consumer fell behind and `0` events were dropped.
    #[error("subscription lagged, {0} events dropped")]
    Lagged(u64),
    /// The publishing side is gone, or the subscription was cancelled.
    #[error("subscription closed")]
    Closed,
}

type CancelHook = Box<dyn FnOnce() + Send>;

/// Receiving half of an auth-state subscription.
pub struct Subscription {
    events: broadcast::Receiver<AuthEvent>,
    open: bool,
    on_cancel: Option<CancelHook>,
}

impl Subscription {
    pub fn new<F>(events: broadcast::Receiver<AuthEvent>, on_cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { events, open: true, on_cancel: Some(Box::new(on_cancel)) }
    }

    /// Wait for the next event.
    ///
    /// # Errors
    ///
    /// `Lagged` when events were dropped (the subscription stays open),
    /// `Closed` once the bus is gone or after `unsubscribe`.
    pub async fn recv(&mut self) -> Result<AuthEvent, DeliveryError> {
        if !self.open {
            return Err(DeliveryError::Closed);
        }
        match self.events.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(DeliveryError::Lagged(skipped)),
            Err(broadcast::error::RecvError::Closed) => {
                self.open = false;
                Err(DeliveryError::Closed)
            }
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Cancel the subscription. The cancel hook runs at most once.
    pub fn unsubscribe(&mut self) {
        self.open = false;
        if let Some(cancel) = self.on_cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Broadcast bus for auth events, shared by a provider and its subscribers.
#[derive(Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl AuthEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, subscribers: Arc::new(AtomicUsize::new(0)) }
    }

    /// Publish an event to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: AuthEvent) -> usize {
        debug!(kind = event.kind(), "auth event published");
        self.sender.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let subscribers = Arc::clone(&self.subscribers);
        let live = subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(live, "auth event subscription opened");
        Subscription::new(self.sender.subscribe(), move || {
            let live = subscribers.fetch_sub(1, Ordering::SeqCst) - 1;
            debug!(live, "auth event subscription cancelled");
        })
    }

    /// Number of subscriptions that have not been cancelled yet.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
