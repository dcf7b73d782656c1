//! Synchronizer configuration.
//!
//! The embedding page supplies these settings as JSON; everything has a
//! default so an empty object is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SyncError;

// ---------------------------------------------------------------------------
// AuthorityGrant
// ---------------------------------------------------------------------------

/// A third-party identity domain, and the grant token the host page
/// issued for it.
///
/// On the wire the token is `grantToken`, matching the host page's
/// settings object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityGrant {
    pub authority: String,

    #[serde(default)]
    pub grant_token: Option<String>,
}

impl AuthorityGrant {
    pub fn new(authority: impl Into<String>, grant_token: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            grant_token: Some(grant_token.into()),
        }
    }

    /// Only entries with a non-empty token trigger a profile fetch.
    pub fn has_grant(&self) -> bool {
        self.grant_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Configuration for the synchronizer.
///
/// ```rust
/// use sessync::SyncConfig;
///
/// let config = SyncConfig::from_json(r#"{
///     "serviceUrl": "https://example.org/",
///     "services": [{"authority": "publisher.org", "grantToken": "abc"}]
/// }"#).unwrap();
///
/// assert_eq!(config.grants().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Base URL of the session service. Request paths are relative to it.
    pub service_url: String,

    /// Third-party authorities. `services` is accepted as an alias since
    /// that's what host pages call the list.
    #[serde(alias = "services")]
    pub authorities: Vec<AuthorityGrant>,

    /// How long a loaded session stays fresh. Default: 300 seconds.
    pub cache_ttl_secs: u64,

    /// HTTP request timeout. Default: 10 seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:5000/".to_string(),
            authorities: Vec::new(),
            cache_ttl_secs: 300,
            request_timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    /// Parses settings JSON. Missing fields take their defaults.
    ///
    /// # Errors
    /// [`SyncError::Config`] if the JSON is malformed or a field has the
    /// wrong type.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Authorities that carry a usable grant token.
    pub fn grants(&self) -> impl Iterator<Item = &AuthorityGrant> {
        self.authorities.iter().filter(|a| a.has_grant())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_five_minute_ttl() {
        let config = SyncConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.authorities.is_empty());
    }

    #[test]
    fn test_from_json_empty_object_uses_defaults() {
        let config = SyncConfig::from_json("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_from_json_reads_camel_case_fields() {
        let config = SyncConfig::from_json(
            r#"{"serviceUrl": "https://h.example/", "cacheTtlSecs": 60,
                "authorities": [{"authority": "a.org", "grantToken": "tok"}]}"#,
        )
        .unwrap();

        assert_eq!(config.service_url, "https://h.example/");
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.authorities, vec![AuthorityGrant::new("a.org", "tok")]);
    }

    #[test]
    fn test_grants_skips_entries_without_token() {
        let config = SyncConfig::from_json(
            r#"{"services": [
                {"authority": "a.org", "grantToken": "tok"},
                {"authority": "b.org"},
                {"authority": "c.org", "grantToken": ""}
            ]}"#,
        )
        .unwrap();

        let authorities: Vec<_> = config.grants().map(|g| g.authority.as_str()).collect();
        assert_eq!(authorities, vec!["a.org"]);
    }

    #[test]
    fn test_from_json_malformed_returns_config_error() {
        let result = SyncConfig::from_json(r#"{"cacheTtlSecs": "soon"}"#);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
