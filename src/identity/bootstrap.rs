//! Identity bootstrap: resolves and tracks "who is logged in" for one page
//! lifecycle.
//!
//! ARCHITECTURE
//! ============
//! `IdentityBootstrap::spawn` subscribes to provider auth events, then hands
//! the subscription to a worker task. The worker is the only writer of a
//! `watch` slot holding the current `IdentitySnapshot`; layouts and streams
//! hold receivers and only read.
//!
//! The subscription is the worker's single-consumer inbox, so events are
//! processed one at a time. If an event arrives while a resolution is still
//! in flight, that resolution is dropped and restarted (latest wins), which
//! keeps stale results from overwriting newer ones.
//!
//! EVENT FILTERING
//! ===============
//! The provider's event bus is shared by every open bootstrap. A worker only
//! reacts to events for the user it follows: the session's user at spawn, or
//! the last user a resolution found. `TokenRefreshed` hands the worker the
//! rotated token pair, and `SignedOut` drops its tokens, so the next
//! resolution always runs with what the provider currently honours.
//!
//! LIFECYCLE
//! =========
//! `teardown()` or dropping the handle stops the worker. The worker cancels
//! the subscription exactly once on its way out and drops the slot's sender,
//! so nothing can change the snapshot afterwards.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::state::{IdentitySnapshot, IdentityState};
use crate::provider::{AuthEvent, AuthProvider, Credentials, DeliveryError, Session, Subscription};

const NOTICE_LOAD_FAILED: &str = "We couldn't load your account details. Please try again.";
const NOTICE_TIMED_OUT: &str = "Confirming your session took too long. Please try again.";

// =============================================================================
// ONE-SHOT RESOLUTION
// =============================================================================

/// Terminal result of one resolution: never `Loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub state: IdentityState,
    pub notice: Option<String>,
}

impl Resolved {
    fn quiet(state: IdentityState) -> Self {
        Self { state, notice: None }
    }

    /// Wrap as a snapshot for callers that resolve once per request.
    #[must_use]
    pub fn into_snapshot(self, revision: u64) -> IdentitySnapshot {
        IdentitySnapshot { state: self.state, notice: self.notice, revision }
    }
}

async fn lookup(provider: &dyn AuthProvider, credentials: &Credentials) -> Resolved {
    let user = match provider.current_user(credentials).await {
        Ok(Some(user)) => user,
        Ok(None) => return Resolved::quiet(IdentityState::Unauthenticated),
        Err(e) => {
            warn!(error = %e, "current user lookup failed");
            return Resolved { state: IdentityState::Unauthenticated, notice: Some(NOTICE_LOAD_FAILED.into()) };
        }
    };

    match provider.fetch_profile(credentials, &user.id).await {
        Ok(Some(profile)) => Resolved::quiet(IdentityState::Authenticated { user, profile }),
        Ok(None) => {
            info!(user_id = %user.id, "signed-in user has no profile row yet");
            Resolved::quiet(IdentityState::ProfileMissing { user })
        }
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "profile lookup failed");
            Resolved { state: IdentityState::Unauthenticated, notice: Some(NOTICE_LOAD_FAILED.into()) }
        }
    }
}

/// Resolve the current user and their profile, bounded by `limit`.
///
/// Always ends in a terminal state: errors and timeouts become
/// `Unauthenticated` with a notice for the user.
pub async fn resolve_identity(provider: &dyn AuthProvider, credentials: &Credentials, limit: Duration) -> Resolved {
    match tokio::time::timeout(limit, lookup(provider, credentials)).await {
        Ok(resolved) => resolved,
        Err(_) => {
            warn!(timeout_ms = limit.as_millis(), "identity resolution timed out");
            Resolved { state: IdentityState::Unauthenticated, notice: Some(NOTICE_TIMED_OUT.into()) }
        }
    }
}

// =============================================================================
// BOOTSTRAP HANDLE
// =============================================================================

/// Owner handle for a running bootstrap. Dropping it tears the bootstrap down.
pub struct IdentityBootstrap {
    id: Uuid,
    identity: watch::Receiver<IdentitySnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl IdentityBootstrap {
    /// Subscribe to auth events and start resolving `session` in the
    /// background. Without a session the bootstrap settles signed out.
    #[must_use]
    pub fn spawn(provider: Arc<dyn AuthProvider>, session: Option<Session>, limit: Duration) -> Self {
        let id = Uuid::new_v4();
        let events = provider.subscribe();
        let (publisher, identity) = watch::channel(IdentitySnapshot::loading());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let (user_id, credentials) = match session {
            Some(session) => (Some(session.user.id), session.credentials),
            None => (None, Credentials::default()),
        };
        let worker = Worker { id, provider, user_id, credentials, limit, events, publisher, revision: 0 };
        let task = tokio::spawn(worker.run(shutdown_rx));
        debug!(bootstrap = %id, "identity bootstrap started");

        Self { id, identity, shutdown: Some(shutdown_tx), task: Some(task) }
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn current(&self) -> IdentitySnapshot {
        self.identity.borrow().clone()
    }

    /// Like `current`, but also marks the snapshot as seen so `changed` only
    /// reports later publishes.
    pub fn latest(&mut self) -> IdentitySnapshot {
        self.identity.borrow_and_update().clone()
    }

    /// A read-only view of the identity slot for another reader.
    #[must_use]
    pub fn reader(&self) -> watch::Receiver<IdentitySnapshot> {
        self.identity.clone()
    }

    /// Wait for the next published snapshot. `None` once the bootstrap has
    /// stopped publishing.
    pub async fn changed(&mut self) -> Option<IdentitySnapshot> {
        self.identity.changed().await.ok()?;
        Some(self.identity.borrow_and_update().clone())
    }

    /// Wait until resolution reaches a terminal state.
    pub async fn settled(&mut self) -> Option<IdentitySnapshot> {
        let snapshot = self.identity.wait_for(|s| !s.is_loading()).await.ok()?;
        Some(snapshot.clone())
    }

    /// Stop the worker and wait for it to cancel its subscription.
    pub async fn teardown(mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(bootstrap = %self.id, error = %e, "identity bootstrap worker did not stop cleanly");
            }
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for IdentityBootstrap {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

// =============================================================================
// WORKER
// =============================================================================

struct Worker {
    id: Uuid,
    provider: Arc<dyn AuthProvider>,
    /// The user whose events this worker follows.
    user_id: Option<String>,
    credentials: Credentials,
    limit: Duration,
    events: Subscription,
    publisher: watch::Sender<IdentitySnapshot>,
    revision: u64,
}

impl Worker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let provider = Arc::clone(&self.provider);
        let limit = self.limit;

        // Mount counts as the first trigger.
        let mut pending = true;
        'worker: loop {
            if !pending {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    delivery = self.events.recv(), if self.events.is_open() => {
                        pending = self.accept(delivery);
                    }
                }
                continue;
            }

            let credentials = self.credentials.clone();
            let resolution = resolve_identity(provider.as_ref(), &credentials, limit);
            tokio::pin!(resolution);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break 'worker,
                    delivery = self.events.recv(), if self.events.is_open() => {
                        if self.accept(delivery) {
                            debug!(bootstrap = %self.id, "restarting identity resolution for newer event");
                            continue 'worker;
                        }
                    }
                    resolved = &mut resolution => {
                        self.publish(resolved);
                        pending = false;
                        continue 'worker;
                    }
                }
            }
        }

        self.events.unsubscribe();
        debug!(bootstrap = %self.id, "identity bootstrap stopped");
    }

    /// Decide whether a delivery should trigger re-resolution.
    fn accept(&mut self, delivery: Result<AuthEvent, DeliveryError>) -> bool {
        match delivery {
            Ok(event) => self.follow(event),
            Err(DeliveryError::Lagged(skipped)) => {
                warn!(bootstrap = %self.id, skipped, "auth events dropped; re-resolving identity");
                true
            }
            Err(DeliveryError::Closed) => {
                warn!(bootstrap = %self.id, "auth event subscription closed by provider");
                false
            }
        }
    }

    /// Apply an event for the followed user to the worker's credentials.
    fn follow(&mut self, event: AuthEvent) -> bool {
        if self.user_id.as_deref() != Some(event.user_id()) {
            trace!(bootstrap = %self.id, kind = event.kind(), "auth event for another user ignored");
            return false;
        }
        debug!(bootstrap = %self.id, kind = event.kind(), session = event.session_present(), "auth event received");

        if !event.session_present() {
            self.credentials = Credentials::default();
        } else if let AuthEvent::TokenRefreshed { credentials, .. } = event {
            self.credentials = credentials;
        }
        true
    }

    fn publish(&mut self, resolved: Resolved) {
        self.revision += 1;
        let snapshot = resolved.into_snapshot(self.revision);
        if let Some(user) = snapshot.user() {
            self.user_id = Some(user.id.clone());
        }
        debug!(bootstrap = %self.id, revision = snapshot.revision, has_profile = snapshot.has_profile(), "identity published");
        self.publisher.send_replace(snapshot);
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
