//! # Sessync
//!
//! Client-side session synchronizer.
//!
//! Sessync keeps one authoritative view of the user's session in the
//! client and keeps it in step with the server. Callers log in, load,
//! log out, or push a snapshot they got elsewhere; Sessync fetches,
//! merges third-party profiles, and tells local listeners exactly what
//! changed.
//!
//! - Loads go through a single-flight cache: concurrent callers share
//!   one request and a result is reused for five minutes.
//! - Every new snapshot is diffed against the last. Listeners get
//!   `SessionChanged`, then `GroupsChanged`, then `UserChanged`.
//! - A user change clears the credential cache and re-tags telemetry.
//! - No operation fails. Errors are logged and reported, and the
//!   current session is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessync::prelude::*;
//!
//! # async fn run() -> Result<(), SyncError> {
//! let config = SyncConfig::from_json(r#"{"serviceUrl": "https://example.org/"}"#)?;
//! let sync = Synchronizer::http(config)?.build();
//!
//! sync.subscribe(|event| println!("session event: {}", event.name()));
//!
//! let session = sync.login(&Credentials::new("alice", "s3cret")).await;
//! assert_eq!(sync.load().await, session);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod synchronizer;

pub use config::{AuthorityGrant, SyncConfig};
pub use error::SyncError;
pub use logging::init_tracing;
pub use synchronizer::{Synchronizer, SynchronizerBuilder};

pub use sessync_cache::{CacheStats, DEFAULT_TTL, ReadCache};
pub use sessync_protocol::{
    Codec, Credentials, Flash, FlashLevel, Group, JsonCodec, ProfileRecord, ProtocolError,
    ResponseEnvelope, SessionSnapshot, UserId,
};
pub use sessync_session::{
    ChangeSet, CredentialCache, ErrorTelemetry, FlashNotifier, NoopCollaborator,
    ProfileFetcher, SessionError, SessionEvent, SubscriptionId, SyncState, diff,
};
#[cfg(feature = "http")]
pub use sessync_transport::HttpEndpoint;
pub use sessync_transport::{
    Operation, RawResponse, SessionEndpoint, SessionRequest, TransportError, XSRF_HEADER,
};

/// The types most embedders need.
pub mod prelude {
    pub use crate::{
        Credentials, CredentialCache, ErrorTelemetry, FlashLevel, FlashNotifier, ProfileFetcher,
        ProfileRecord, SessionEvent, SessionSnapshot, SyncConfig, SyncError, Synchronizer,
        UserId,
    };
}
