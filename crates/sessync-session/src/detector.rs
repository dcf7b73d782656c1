//! The change detector: the single write path into the session store.
//!
//! Every new snapshot, whether it came from login, logout, load, or a
//! direct `update`, goes through [`ChangeDetector::apply`]. It:
//! - Replaces the stored snapshot
//! - Works out what changed ([`diff`])
//! - Broadcasts the matching [`SessionEvent`]s, in a fixed order
//! - Tells the credential cache and error telemetry about user changes
//!
//! The server only ever sends whole snapshots, never "the user changed",
//! so the store has no other writer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sessync_protocol::SessionSnapshot;

use crate::{
    CredentialCache, ErrorTelemetry, EventBus, SessionEvent, SessionStore, SubscriptionId,
    SyncState,
};

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// What a single apply changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    /// First apply since the process started.
    pub initial_load: bool,
    /// The group-id set differs (order doesn't count).
    pub groups_changed: bool,
    /// The `userid` differs, including anonymous ↔ logged in.
    pub user_changed: bool,
}

/// Compares two snapshots the way the detector does.
///
/// Only `userid` and the set of group ids are compared; everything else
/// (csrf, preferences, group order) may change without being reported
/// beyond the unconditional `SessionChanged`.
pub fn diff(previous: &SessionSnapshot, next: &SessionSnapshot, initial_load: bool) -> ChangeSet {
    ChangeSet {
        initial_load,
        groups_changed: previous.group_ids() != next.group_ids(),
        user_changed: previous.userid != next.userid,
    }
}

// ---------------------------------------------------------------------------
// ChangeDetector
// ---------------------------------------------------------------------------

/// Owns the [`SessionStore`] and the [`EventBus`], and applies snapshots.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ [Uninitialized, anonymous]
///              │
///              ▼ apply()  → SessionChanged { initial_load: true }
///           [Synced]
///              │
///              ▼ apply()  → SessionChanged { initial_load: false }
///           [Synced]        (+ GroupsChanged) (+ UserChanged)
/// ```
pub struct ChangeDetector {
    store: Mutex<SessionStore>,
    bus: EventBus,
    credentials: Arc<dyn CredentialCache>,
    telemetry: Arc<dyn ErrorTelemetry>,
}

impl ChangeDetector {
    /// Creates a detector around an empty (anonymous) store.
    pub fn new(credentials: Arc<dyn CredentialCache>, telemetry: Arc<dyn ErrorTelemetry>) -> Self {
        Self {
            store: Mutex::new(SessionStore::new()),
            bus: EventBus::new(),
            credentials,
            telemetry,
        }
    }

    /// Replaces the stored snapshot and broadcasts what changed.
    ///
    /// Events go out after the store lock is released, so listeners may
    /// call [`current`](Self::current). Order is always:
    ///
    /// 1. `SessionChanged` (every time)
    /// 2. `GroupsChanged` (if the group-id set changed)
    /// 3. `UserChanged` (if `userid` changed), after which the credential
    ///    cache is cleared and telemetry is re-tagged
    ///
    /// Nothing is validated: a snapshot without `csrf` is stored as-is.
    pub fn apply(&self, snapshot: SessionSnapshot) -> (Arc<SessionSnapshot>, ChangeSet) {
        let next = Arc::new(snapshot);

        let changes = {
            let mut store = self.lock();
            let replaced = store.replace(Arc::clone(&next));
            diff(&replaced.previous, &next, replaced.initial_load)
        };

        tracing::debug!(
            initial_load = changes.initial_load,
            groups_changed = changes.groups_changed,
            user_changed = changes.user_changed,
            "session snapshot applied"
        );

        self.bus.emit(&SessionEvent::SessionChanged {
            snapshot: Arc::clone(&next),
            initial_load: changes.initial_load,
        });

        if changes.groups_changed {
            tracing::info!(groups = next.groups.len(), "group memberships changed");
            self.bus.emit(&SessionEvent::GroupsChanged);
        }

        if changes.user_changed {
            match &next.userid {
                Some(userid) => tracing::info!(%userid, "session user changed"),
                None => tracing::info!("session user logged out"),
            }
            self.bus.emit(&SessionEvent::UserChanged);
            self.credentials.clear_cache();
            self.telemetry.set_user_info(next.userid.as_ref());
        }

        (next, changes)
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<SessionSnapshot> {
        self.lock().current()
    }

    pub fn state(&self) -> SyncState {
        self.lock().state()
    }

    /// Registers a session listener. See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn lock(&self) -> MutexGuard<'_, SessionStore> {
        // `SessionStore::replace` can't panic half-way, so a poisoned
        // store still holds a whole snapshot.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =========================================================================
// Tests
// =========================================================================
