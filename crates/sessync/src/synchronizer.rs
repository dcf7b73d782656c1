//! `Synchronizer` builder and the session operations.
//!
//! This is the entry point for embedding Sessync. It ties together all
//! the layers: endpoint → protocol → cache → change detection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use sessync_cache::ReadCache;
use sessync_protocol::{Codec, Credentials, JsonCodec, ResponseEnvelope, SessionSnapshot};
use sessync_session::{
    ChangeDetector, CredentialCache, ErrorTelemetry, FlashNotifier, NoopCollaborator,
    ProfileFetcher, SessionError, SessionEvent, SubscriptionId, SyncState,
};
use sessync_transport::{Operation, RawResponse, SessionEndpoint, SessionRequest, TransportError};
use tracing::{debug, info, warn};

use crate::{SyncConfig, SyncError};

/// State shared by the synchronizer and the reads it has in flight.
///
/// Wrapped in `Arc` so a cached load can own it for as long as it runs.
pub(crate) struct SyncCore<E, P, C> {
    endpoint: E,
    profiles: P,
    codec: C,
    detector: ChangeDetector,
    notifier: Arc<dyn FlashNotifier>,
    telemetry: Arc<dyn ErrorTelemetry>,
    /// Authorities with a grant token, in configured order.
    authorities: Vec<String>,
    xsrf: Mutex<Option<String>>,
    /// Bumped by every apply. A load that sees it move while in flight
    /// was overtaken and must not overwrite the newer session.
    epoch: AtomicU64,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Synchronizer`].
///
/// # Example
///
/// ```rust,ignore
/// use sessync::prelude::*;
///
/// let sync = Synchronizer::builder(endpoint)
///     .config(SyncConfig::from_json(settings)?)
///     .profiles(my_profiles)
///     .credential_cache(tokens.clone())
///     .telemetry(reporter.clone())
///     .build();
///
/// let session = sync.load().await;
/// ```
pub struct SynchronizerBuilder<E, P = NoopCollaborator, C = JsonCodec> {
    endpoint: E,
    profiles: P,
    codec: C,
    config: SyncConfig,
    credentials: Arc<dyn CredentialCache>,
    telemetry: Arc<dyn ErrorTelemetry>,
    notifier: Arc<dyn FlashNotifier>,
}

impl<E, P, C> SynchronizerBuilder<E, P, C>
where
    E: SessionEndpoint,
    P: ProfileFetcher,
    C: Codec,
{
    /// Sets the configuration (TTL and authorities).
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the profile fetcher used for authorities with a grant token.
    pub fn profiles<P2: ProfileFetcher>(self, profiles: P2) -> SynchronizerBuilder<E, P2, C> {
        SynchronizerBuilder {
            endpoint: self.endpoint,
            profiles,
            codec: self.codec,
            config: self.config,
            credentials: self.credentials,
            telemetry: self.telemetry,
            notifier: self.notifier,
        }
    }

    /// Replaces the JSON codec.
    pub fn codec<C2: Codec>(self, codec: C2) -> SynchronizerBuilder<E, P, C2> {
        SynchronizerBuilder {
            endpoint: self.endpoint,
            profiles: self.profiles,
            codec,
            config: self.config,
            credentials: self.credentials,
            telemetry: self.telemetry,
            notifier: self.notifier,
        }
    }

    pub fn credential_cache(mut self, credentials: Arc<dyn CredentialCache>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn ErrorTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn FlashNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Builds the synchronizer. Nothing is fetched until the first call.
    pub fn build(self) -> Synchronizer<E, P, C> {
        let authorities: Vec<String> = self
            .config
            .grants()
            .map(|grant| grant.authority.clone())
            .collect();

        debug!(
            authorities = authorities.len(),
            ttl_secs = self.config.cache_ttl_secs,
            "session synchronizer built"
        );

        let core = Arc::new(SyncCore {
            endpoint: self.endpoint,
            profiles: self.profiles,
            codec: self.codec,
            detector: ChangeDetector::new(self.credentials, Arc::clone(&self.telemetry)),
            notifier: self.notifier,
            telemetry: self.telemetry,
            authorities,
            xsrf: Mutex::new(None),
            epoch: AtomicU64::new(0),
        });

        Synchronizer {
            core,
            cache: ReadCache::new(self.config.cache_ttl()),
        }
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Keeps the client's view of the session in step with the server.
///
/// Every operation resolves to a snapshot; none of them fail. Network
/// errors, bad statuses and undecodable bodies are logged, handed to
/// [`ErrorTelemetry::capture`], and answered with the current session.
///
/// The synchronizer is `Send + Sync` and is meant to be shared (behind
/// an `Arc`) by everything that reads or changes the session.
pub struct Synchronizer<E, P = NoopCollaborator, C = JsonCodec> {
    core: Arc<SyncCore<E, P, C>>,
    cache: ReadCache<Arc<SessionSnapshot>, SyncError>,
}

impl<E: SessionEndpoint> Synchronizer<E> {
    /// Starts a builder around `endpoint`, with no-op collaborators and
    /// default configuration.
    pub fn builder(endpoint: E) -> SynchronizerBuilder<E> {
        SynchronizerBuilder {
            endpoint,
            profiles: NoopCollaborator,
            codec: JsonCodec,
            config: SyncConfig::default(),
            credentials: Arc::new(NoopCollaborator),
            telemetry: Arc::new(NoopCollaborator),
            notifier: Arc::new(NoopCollaborator),
        }
    }
}

#[cfg(feature = "http")]
impl Synchronizer<sessync_transport::HttpEndpoint> {
    /// Starts a builder that talks HTTP to `config.service_url`.
    ///
    /// # Errors
    /// [`SyncError::Transport`] if the service URL is invalid or the
    /// HTTP client can't be built.
    pub fn http(
        config: SyncConfig,
    ) -> Result<SynchronizerBuilder<sessync_transport::HttpEndpoint>, SyncError> {
        let endpoint = sessync_transport::HttpEndpoint::new(
            &config.service_url,
            config.request_timeout(),
        )?;
        Ok(Synchronizer::builder(endpoint).config(config))
    }
}

impl<E, P, C> Synchronizer<E, P, C>
where
    E: SessionEndpoint,
    P: ProfileFetcher,
    C: Codec,
{
    /// Logs in and applies the session the server returns.
    ///
    /// A rejected login still resolves: the returned snapshot carries the
    /// server's `errors` and `reason`. The result also becomes the cached
    /// load, so a `load()` right after doesn't hit the network.
    pub async fn login(&self, credentials: &Credentials) -> Arc<SessionSnapshot> {
        info!(username = %credentials.username, "logging in");
        let result = self.core.login(credentials).await;
        self.settle(Operation::Login, result)
    }

    /// Returns the session, fetching it only when the cached one is
    /// missing or older than the TTL.
    ///
    /// Concurrent callers share a single outstanding fetch. A failed
    /// fetch is reported once, is not cached, and every waiting caller
    /// gets the current session back.
    pub async fn load(&self) -> Arc<SessionSnapshot> {
        let core = Arc::clone(&self.core);
        let result = self
            .cache
            .get_or_fetch(move || async move { core.fetch_session().await })
            .await;

        result.unwrap_or_else(|_| self.core.detector.current())
    }

    /// Logs out and applies the (anonymous) session the server returns.
    pub async fn logout(&self) -> Arc<SessionSnapshot> {
        info!("logging out");
        let result = self.core.post(SessionRequest::logout(self.core.xsrf_token())).await;
        self.settle(Operation::Logout, result)
    }

    /// Tells the server the sidebar tutorial was dismissed.
    ///
    /// Flash messages are forwarded, but the session is left alone: the
    /// server-side flag shows up on a later `load()`.
    pub async fn dismiss_sidebar_tutorial(&self) {
        let request = SessionRequest::dismiss_sidebar_tutorial(self.core.xsrf_token());
        if let Err(err) = self.core.post(request).await {
            self.core.report(Operation::DismissSidebarTutorial, &err);
        }
    }

    /// Applies a snapshot obtained some other way, without a request.
    ///
    /// Fires the same events as a fetched snapshot and refreshes the
    /// cached load.
    pub fn update(&self, snapshot: SessionSnapshot) -> Arc<SessionSnapshot> {
        let applied = self.core.apply(snapshot);
        self.cache.prime(Arc::clone(&applied));
        applied
    }

    /// The current session, without any I/O.
    pub fn current(&self) -> Arc<SessionSnapshot> {
        self.core.detector.current()
    }

    pub fn state(&self) -> SyncState {
        self.core.detector.state()
    }

    /// Registers a listener for [`SessionEvent`]s.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.core.detector.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.detector.unsubscribe(id)
    }

    /// The anti-forgery token sent with requests, once one is known.
    pub fn xsrf_token(&self) -> Option<String> {
        self.core.xsrf_token()
    }

    /// Whether the next `load()` would be served from cache.
    pub fn is_cache_fresh(&self) -> bool {
        self.cache.is_fresh()
    }

    /// Applies the outcome of a login or logout.
    fn settle(
        &self,
        operation: Operation,
        result: Result<ResponseEnvelope, SyncError>,
    ) -> Arc<SessionSnapshot> {
        let mut envelope = match result {
            Ok(envelope) => envelope,
            Err(err) => return self.core.report(operation, &err),
        };

        match envelope.take_model() {
            Some(model) => self.update(model),
            None => {
                debug!(%operation, "response carried no session, keeping current");
                if operation == Operation::Logout {
                    self.cache.invalidate();
                }
                self.core.current_with(envelope)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SyncCore
// ---------------------------------------------------------------------------

impl<E, P, C> SyncCore<E, P, C>
where
    E: SessionEndpoint,
    P: ProfileFetcher,
    C: Codec,
{
    async fn login(&self, credentials: &Credentials) -> Result<ResponseEnvelope, SyncError> {
        let body = self.codec.encode(credentials)?;
        self.post(SessionRequest::login(body, self.xsrf_token())).await
    }

    /// Sends `request` and decodes the reply.
    async fn post(&self, request: SessionRequest) -> Result<ResponseEnvelope, SyncError> {
        let operation = request.operation;
        let response = self.endpoint.send(request).await?;
        self.receive(operation, response)
    }

    /// The read behind `load()`. Runs once per shared load, so a failure
    /// is reported here rather than by each waiting caller.
    async fn fetch_session(&self) -> Result<Arc<SessionSnapshot>, SyncError> {
        let result = self.read_session().await;
        if let Err(err) = &result {
            self.report(Operation::Load, err);
        }
        result
    }

    /// Fetch, merge profiles, apply.
    async fn read_session(&self) -> Result<Arc<SessionSnapshot>, SyncError> {
        let epoch = self.epoch.load(Ordering::Acquire);

        let mut envelope = self.post(SessionRequest::load(self.xsrf_token())).await?;
        let Some(base) = envelope.take_model() else {
            debug!("load returned no session, keeping current");
            return Ok(self.detector.current());
        };

        let merged = self.merge_profiles(base).await;

        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("session changed while loading, discarding stale load");
            return Ok(self.detector.current());
        }
        Ok(self.apply(merged))
    }

    /// Lays each authority's profile over `base`, in configured order.
    ///
    /// Profiles are fetched concurrently. One that fails to fetch or
    /// merge is reported and skipped; the rest still apply.
    async fn merge_profiles(&self, base: SessionSnapshot) -> SessionSnapshot {
        if self.authorities.is_empty() {
            return base;
        }

        let mut reads = Vec::with_capacity(self.authorities.len());
        for authority in &self.authorities {
            debug!(%authority, "fetching profile");
            reads.push(self.profiles.read(authority));
        }
        let profiles = join_all(reads).await;

        let mut merged = base;
        for (authority, profile) in self.authorities.iter().zip(profiles) {
            let next = profile.and_then(|profile| {
                merged
                    .merged_with(&profile)
                    .map_err(|source| SessionError::ProfileMerge {
                        authority: authority.clone(),
                        source,
                    })
            });

            match next {
                Ok(next) => merged = next,
                Err(err) => {
                    warn!(%authority, error = %err, "profile not merged, using base session");
                    self.telemetry.capture(&err);
                }
            }
        }
        merged
    }

    /// Decodes a response, forwarding flash messages and capturing a
    /// rotated token.
    ///
    /// A non-2xx response is only accepted when it explains itself with
    /// `errors` or `reason` (a rejected login); otherwise it is an error.
    fn receive(
        &self,
        operation: Operation,
        response: RawResponse,
    ) -> Result<ResponseEnvelope, SyncError> {
        let mut envelope: ResponseEnvelope = match self.codec.decode(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if !response.is_success() => {
                return Err(TransportError::Status(response.status).into());
            }
            Err(err) => return Err(err.into()),
        };

        for (level, message) in envelope.flash.iter() {
            debug!(%operation, %level, "forwarding flash message");
            self.notifier.flash(level, message);
        }

        if !response.is_success() && envelope.errors.is_none() && envelope.reason.is_none() {
            return Err(TransportError::Status(response.status).into());
        }

        if let Some(token) = response.xsrf_token {
            if let Some(model) = envelope.model.as_mut() {
                model.csrf = Some(token.clone());
            }
            self.set_xsrf(token);
        }

        Ok(envelope)
    }

    fn apply(&self, snapshot: SessionSnapshot) -> Arc<SessionSnapshot> {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let (applied, _) = self.detector.apply(snapshot);
        if let Some(token) = &applied.csrf {
            self.set_xsrf(token.clone());
        }
        applied
    }

    /// The current session with a response's `errors` and `reason`
    /// attached, for replies that carried no model.
    fn current_with(&self, envelope: ResponseEnvelope) -> Arc<SessionSnapshot> {
        let current = self.detector.current();
        if envelope.errors.is_none() && envelope.reason.is_none() {
            return current;
        }
        Arc::new(SessionSnapshot {
            errors: envelope.errors,
            reason: envelope.reason,
            ..(*current).clone()
        })
    }

    fn report(&self, operation: Operation, err: &SyncError) -> Arc<SessionSnapshot> {
        warn!(%operation, error = %err, "session request failed, keeping current session");
        self.telemetry.capture(err);
        self.detector.current()
    }

    fn xsrf_token(&self) -> Option<String> {
        self.lock_xsrf().clone()
    }

    fn set_xsrf(&self, token: String) {
        *self.lock_xsrf() = Some(token);
    }

    fn lock_xsrf(&self) -> MutexGuard<'_, Option<String>> {
        self.xsrf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
