//! Hooks for the services that react to session changes.
//!
//! Sessync doesn't clear token caches, tag error reports, show toasts, or
//! exchange grant tokens itself; those belong to the embedding app.
//! Instead it defines one small trait per collaborator. You implement
//! the ones you need; [`NoopCollaborator`] stands in for the rest.
//!
//! All of them are `Send + Sync + 'static`: the synchronizer shares them
//! between tokio tasks for as long as it lives.

use std::future::Future;

use sessync_protocol::{FlashLevel, ProfileRecord, UserId};

use crate::SessionError;

/// The cache of API access tokens. Must be cleared whenever the user
/// changes, or the new user would act with the old user's token.
pub trait CredentialCache: Send + Sync + 'static {
    /// Drops every cached access token.
    fn clear_cache(&self);
}

/// The error-reporting service.
pub trait ErrorTelemetry: Send + Sync + 'static {
    /// Tags subsequent error reports with `user`, or clears the tag when
    /// `user` is `None`.
    fn set_user_info(&self, user: Option<&UserId>);

    /// Records a non-fatal failure (a failed load, a profile that
    /// couldn't be merged). The default does nothing.
    fn capture(&self, _error: &(dyn std::error::Error + 'static)) {}
}

/// Shows transient messages to the user.
pub trait FlashNotifier: Send + Sync + 'static {
    /// Called once per flash message in a server response.
    fn flash(&self, level: FlashLevel, message: &str);
}

/// Exchanges a configured grant token for the user's profile at a
/// third-party authority.
///
/// # Example
///
/// ```rust
/// use sessync_protocol::ProfileRecord;
/// use sessync_session::{ProfileFetcher, SessionError};
///
/// /// Pretends every authority knows the same user.
/// struct StaticProfiles;
///
/// impl ProfileFetcher for StaticProfiles {
///     async fn read(&self, authority: &str) -> Result<ProfileRecord, SessionError> {
///         Ok(ProfileRecord::default().with("userid", format!("acct:user@{authority}")))
///     }
/// }
/// ```
pub trait ProfileFetcher: Send + Sync + 'static {
    /// Fetches the profile for `authority`.
    ///
    /// # Errors
    /// Any [`SessionError`]; the caller reports it and carries on with
    /// the base session.
    fn read(
        &self,
        authority: &str,
    ) -> impl Future<Output = Result<ProfileRecord, SessionError>> + Send;
}

/// A collaborator that does nothing.
///
/// As a [`ProfileFetcher`] it fails with
/// [`SessionError::ProfileUnavailable`], so a configured grant without a
/// real fetcher is reported instead of silently ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollaborator;

impl CredentialCache for NoopCollaborator {
    fn clear_cache(&self) {}
}

impl ErrorTelemetry for NoopCollaborator {
    fn set_user_info(&self, _user: Option<&UserId>) {}
}

impl FlashNotifier for NoopCollaborator {
    fn flash(&self, _level: FlashLevel, _message: &str) {}
}

impl ProfileFetcher for NoopCollaborator {
    async fn read(&self, authority: &str) -> Result<ProfileRecord, SessionError> {
        Err(SessionError::ProfileUnavailable(authority.to_string()))
    }
}
