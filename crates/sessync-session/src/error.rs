//! Error types for the session layer.

use sessync_protocol::ProtocolError;

/// Errors that can occur around the session: fetching and merging
/// third-party profiles.
///
/// None of these are fatal to the synchronizer. A profile that can't be
/// fetched or merged is reported and the base session is applied anyway.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The profile service failed for this authority (network error,
    /// rejected grant token, ...).
    #[error("profile fetch failed for authority {authority}: {reason}")]
    ProfileFetch { authority: String, reason: String },

    /// The profile arrived but could not be laid over the session.
    #[error("profile for authority {authority} could not be merged: {source}")]
    ProfileMerge {
        authority: String,
        #[source]
        source: ProtocolError,
    },

    /// No profile fetcher is configured for this authority.
    #[error("no profile fetcher configured for authority {0}")]
    ProfileUnavailable(String),
}
