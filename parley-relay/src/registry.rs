//! Session registry of in-flight relay operations
//!
//! The registry maps a session id to the cancellation handle of the relay
//! currently running for it. It is the only mutable state shared between
//! relay operations. Every operation on it takes one short, non-async lock,
//! so register, cancel and release on the same session are linearizable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, trace};
use uuid::Uuid;

/// The ability to abort one in-flight upstream call
///
/// The relay that creates a handle owns it; the registry keeps a clone used
/// only for lookup and signalling.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    id: Uuid,
    session_id: String,
    token: CancellationToken,
}

impl CancellationHandle {
    /// Create a fresh, unsignalled handle for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            token: CancellationToken::new(),
        }
    }

    /// Identity of this handle, distinct for every relay
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Owning session
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The underlying token, for passing into transport layers
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signal abort
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if abort was signalled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when abort is signalled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Process-wide table of active relays, keyed by session id
///
/// Cloning is cheap and clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    handles: Arc<Mutex<HashMap<String, CancellationHandle>>>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationHandle>> {
        // No code path panics while holding the lock, so a poisoned map is
        // still consistent.
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a handle, replacing any previous one for the session
    ///
    /// The replaced handle is returned and is not cancelled.
    pub fn register(&self, handle: CancellationHandle) -> Option<CancellationHandle> {
        let session_id = handle.session_id.clone();
        let previous = self.lock().insert(session_id.clone(), handle);
        trace!(%session_id, replaced = previous.is_some(), "Registered handle");
        previous
    }

    /// Create and install a handle only if the session has none
    ///
    /// Returns `None` when a relay is already active for the session.
    pub fn try_register(&self, session_id: &str) -> Option<CancellationHandle> {
        let mut handles = self.lock();
        if handles.contains_key(session_id) {
            return None;
        }
        let handle = CancellationHandle::new(session_id);
        handles.insert(session_id.to_string(), handle.clone());
        trace!(%session_id, handle_id = %handle.id, "Registered handle");
        Some(handle)
    }

    /// Signal abort and remove the session's handle
    ///
    /// Returns `false` when there was nothing to cancel.
    pub fn cancel(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id);
        match removed {
            Some(handle) => {
                handle.cancel();
                debug!(%session_id, handle_id = %handle.id, "Cancelled relay");
                true
            }
            None => {
                trace!(%session_id, "Nothing to cancel");
                false
            }
        }
    }

    /// Remove the session's handle without signalling it
    pub fn release(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// Remove `handle` only if it is still the one registered for its session
    ///
    /// A relay finishing after a newer relay registered for the same session
    /// leaves the newer entry in place. Returns whether the entry was removed.
    pub fn release_handle(&self, handle: &CancellationHandle) -> bool {
        let mut handles = self.lock();
        match handles.get(&handle.session_id) {
            Some(current) if current.id == handle.id => {
                handles.remove(&handle.session_id);
                trace!(session_id = %handle.session_id, "Released handle");
                true
            }
            _ => false,
        }
    }

    /// Whether a relay is registered for the session
    pub fn is_active(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if no handles are registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Signal and remove every handle, returning how many there were
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled all relays");
        }
        drained.len()
    }

    /// Remove every handle without signalling
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_unknown_session_is_not_found() {
        let registry = SessionRegistry::new();
        assert!(!registry.cancel("s1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_signals_and_removes() {
        let registry = SessionRegistry::new();
        let handle = registry.try_register("s1").unwrap();

        assert!(registry.cancel("s1"));
        assert!(handle.is_cancelled());
        assert!(!registry.is_active("s1"));

        // A second cancel finds nothing
        assert!(!registry.cancel("s1"));
    }

    #[test]
    fn test_cancelled_future_wakes_on_cancel() {
        let registry = SessionRegistry::new();
        let handle = registry.try_register("s1").unwrap();

        let mut cancelled = tokio_test::task::spawn(handle.cancelled());
        tokio_test::assert_pending!(cancelled.poll());

        registry.cancel("s1");
        assert!(cancelled.is_woken());
        tokio_test::assert_ready!(cancelled.poll());
    }

    #[test]
    fn test_release_does_not_signal() {
        let registry = SessionRegistry::new();
        let handle = registry.try_register("s1").unwrap();

        assert!(registry.release("s1"));
        assert!(!handle.is_cancelled());
        assert!(!registry.cancel("s1"));
    }

    #[test]
    fn test_register_replaces_without_cancelling() {
        let registry = SessionRegistry::new();
        let first = CancellationHandle::new("s1");
        let second = CancellationHandle::new("s1");

        assert!(registry.register(first.clone()).is_none());
        let replaced = registry.register(second.clone()).unwrap();

        assert_eq!(replaced.id(), first.id());
        assert!(!first.is_cancelled());
        assert_eq!(registry.len(), 1);

        registry.cancel("s1");
        assert!(second.is_cancelled());
        assert!(!first.is_cancelled());
    }

    #[test]
    fn test_try_register_rejects_active_session() {
        let registry = SessionRegistry::new();
        let _first = registry.try_register("s1").unwrap();
        assert!(registry.try_register("s1").is_none());
        assert!(registry.try_register("s2").is_some());
    }

    #[test]
    fn test_release_handle_checks_identity() {
        let registry = SessionRegistry::new();
        let stale = CancellationHandle::new("s1");
        let current = CancellationHandle::new("s1");
        registry.register(stale.clone());
        registry.register(current.clone());

        assert!(!registry.release_handle(&stale));
        assert!(registry.is_active("s1"));
        assert!(registry.release_handle(&current));
        assert!(!registry.release_handle(&current));
    }

    #[test]
    fn test_session_registers_again_after_cancel() {
        let registry = SessionRegistry::new();
        registry.try_register("s1").unwrap();
        registry.cancel("s1");

        let again = registry.try_register("s1").unwrap();
        assert!(!again.is_cancelled());
    }

    #[test]
    fn test_cancel_all_and_clear() {
        let registry = SessionRegistry::new();
        let a = registry.try_register("a").unwrap();
        let b = registry.try_register("b").unwrap();

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(registry.is_empty());

        let c = registry.try_register("c").unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(!c.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_races_release_exactly_one_wins() {
        for _ in 0..200 {
            let registry = SessionRegistry::new();
            let handle = registry.try_register("s1").unwrap();

            let canceller = {
                let registry = registry.clone();
                tokio::spawn(async move { registry.cancel("s1") })
            };
            let releaser = {
                let registry = registry.clone();
                tokio::spawn(async move { registry.release_handle(&handle) })
            };

            let cancelled = canceller.await.unwrap();
            let released = releaser.await.unwrap();
            assert!(cancelled ^ released, "exactly one side must win");
            assert!(registry.is_empty());
        }
    }
}
