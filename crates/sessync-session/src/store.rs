//! The session store: the one snapshot the client currently believes.
//!
//! It records:
//! - WHAT the session looks like (the current [`SessionSnapshot`])
//! - WHETHER any snapshot has been applied yet ([`SyncState`])

use std::sync::Arc;

use sessync_protocol::SessionSnapshot;

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Where the store is in its (very short) lifecycle.
///
/// ```text
///   Uninitialized ──(first apply)──→ Synced ──(apply)──→ Synced
/// ```
///
/// There is no way back: logging out applies an anonymous snapshot and
/// the store stays `Synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing has been applied since the process started. The store
    /// holds the anonymous default.
    #[default]
    Uninitialized,

    /// At least one snapshot has been applied.
    Synced,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Holds exactly one snapshot at a time.
///
/// Snapshots are kept behind `Arc` so readers get a cheap, immutable
/// handle that stays valid even after the store moves on.
///
/// Not thread-safe by itself; the [`ChangeDetector`](crate::ChangeDetector)
/// owns it behind a lock and is its only writer.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Arc<SessionSnapshot>,
    state: SyncState,
}

/// What [`SessionStore::replace`] hands back.
#[derive(Debug)]
pub struct Replaced {
    pub previous: Arc<SessionSnapshot>,
    /// `true` if this was the first snapshot ever applied.
    pub initial_load: bool,
}

impl SessionStore {
    /// A store holding the anonymous snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Swaps in `next` and moves to [`SyncState::Synced`].
    pub fn replace(&mut self, next: Arc<SessionSnapshot>) -> Replaced {
        let initial_load = self.state == SyncState::Uninitialized;
        self.state = SyncState::Synced;
        let previous = std::mem::replace(&mut self.current, next);
        Replaced {
            previous,
            initial_load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessync_protocol::UserId;

    #[test]
    fn test_new_store_is_uninitialized_and_anonymous() {
        let store = SessionStore::new();
        assert_eq!(store.state(), SyncState::Uninitialized);
        assert!(!store.current().is_authenticated());
    }

    #[test]
    fn test_replace_first_time_is_initial_load() {
        let mut store = SessionStore::new();

        let replaced = store.replace(Arc::new(SessionSnapshot::anonymous()));

        assert!(replaced.initial_load);
        assert_eq!(store.state(), SyncState::Synced);
    }

    #[test]
    fn test_replace_returns_previous_snapshot() {
        let mut store = SessionStore::new();
        let fred = SessionSnapshot {
            userid: Some(UserId::from("fred")),
            ..SessionSnapshot::default()
        };
        store.replace(Arc::new(fred.clone()));

        let replaced = store.replace(Arc::new(SessionSnapshot::anonymous()));

        assert!(!replaced.initial_load);
        assert_eq!(*replaced.previous, fred);
        assert!(!store.current().is_authenticated());
    }

    #[test]
    fn test_readers_keep_old_snapshot_after_replace() {
        // A handle taken before a replace still points at the old value.
        let mut store = SessionStore::new();
        let before = store.current();

        store.replace(Arc::new(SessionSnapshot {
            csrf: Some("t".into()),
            ..SessionSnapshot::default()
        }));

        assert!(before.csrf.is_none());
        assert_eq!(store.current().csrf.as_deref(), Some("t"));
    }
}
