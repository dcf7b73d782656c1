//! Session state for Sessync.
//!
//! This crate owns the client's single view of the session and decides
//! what changed each time a new snapshot arrives:
//!
//! 1. **Storage**: the one current snapshot ([`SessionStore`])
//! 2. **Change detection**: diffing the previous snapshot against the
//!    next and announcing what changed ([`ChangeDetector`], [`diff`])
//! 3. **Broadcasting**: synchronous, ordered delivery to local listeners
//!    ([`EventBus`], [`SessionEvent`])
//! 4. **Collaborators**: the outside services told about changes
//!    ([`CredentialCache`], [`ErrorTelemetry`], [`FlashNotifier`],
//!    [`ProfileFetcher`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Synchronizer (above)  ← fetches snapshots and hands them to apply()
//!     ↕
//! Session Layer (this crate)  ← stores, diffs, and broadcasts
//!     ↕
//! Protocol Layer (below)  ← provides SessionSnapshot, UserId, FlashLevel
//! ```

mod collaborators;
mod detector;
mod error;
mod events;
mod store;

pub use collaborators::{
    CredentialCache, ErrorTelemetry, FlashNotifier, NoopCollaborator, ProfileFetcher,
};
pub use detector::{ChangeDetector, ChangeSet, diff};
pub use error::SessionError;
pub use events::{EventBus, SessionEvent, SubscriptionId};
pub use store::{Replaced, SessionStore, SyncState};
