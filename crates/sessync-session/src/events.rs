//! Local session notifications and the bus that delivers them.
//!
//! Exactly three things can happen to the session from a listener's point
//! of view, so [`SessionEvent`] has exactly three variants. Delivery is
//! synchronous: `emit` returns only after every listener has run, in the
//! order they subscribed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sessync_protocol::SessionSnapshot;

/// A change to the session, as seen by local listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A snapshot was applied. Sent on every apply, changed or not.
    SessionChanged {
        snapshot: Arc<SessionSnapshot>,
        /// `true` only for the first apply since the process started.
        initial_load: bool,
    },

    /// The set of group ids differs from the previous snapshot.
    GroupsChanged,

    /// The `userid` differs from the previous snapshot.
    UserChanged,
}

impl SessionEvent {
    /// A short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionChanged { .. } => "session_changed",
            Self::GroupsChanged => "groups_changed",
            Self::UserChanged => "user_changed",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Delivers [`SessionEvent`]s to every registered listener.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`; it sees every event emitted from now on.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        tracing::debug!(%id, "session listener subscribed");
        id
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        before != listeners.len()
    }

    /// Calls every listener with `event`, in subscription order.
    ///
    /// The listener list is copied first, so a listener may subscribe,
    /// unsubscribe, or read the session without deadlocking. Changes it
    /// makes to the list take effect from the next event.
    pub fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::trace!(event = event.name(), listeners = listeners.len(), "emitting");
        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}
