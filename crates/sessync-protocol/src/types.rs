//! Core record types for the session wire format.
//!
//! The server never sends deltas: every login, logout, and load answers
//! with a full [`SessionSnapshot`] wrapped in a [`ResponseEnvelope`].
//! These types model those records, keeping any field we don't know
//! about so nothing the server sends is silently dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The opaque identifier of an authenticated principal,
/// e.g. `acct:alice@example.org`.
///
/// A newtype over `String` so a user id can't be confused with a group
/// id or a csrf token in a function signature. `#[serde(transparent)]`
/// keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A group the user belongs to.
///
/// Only `id` matters to change detection. Everything else the server
/// sends (name, urls, scopes...) is kept in `extra` and serialized back
/// out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    /// Creates a group with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// The full server-asserted view of the session, held client-side.
///
/// `Default` is the anonymous, empty snapshot the store starts with.
///
/// `errors` and `reason` only appear on the result of a failed login.
/// They describe that one response and are not part of the session
/// itself, but they ride along on the snapshot so the caller of
/// `login()` can inspect them without a second return type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// `None` for an anonymous session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<UserId>,

    /// Anti-forgery token; attached to every later mutating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf: Option<String>,

    /// Ordered as the server sent them.
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Field name → validation message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Fields the store doesn't interpret (preferences, features, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionSnapshot {
    /// The anonymous snapshot: no user, no groups, no token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns `true` when a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.userid.is_some()
    }

    /// The set of group ids, ignoring order and duplicates.
    ///
    /// Two snapshots whose groups differ only in order produce equal sets.
    pub fn group_ids(&self) -> BTreeSet<&str> {
        self.groups.iter().map(|g| g.id.as_str()).collect()
    }

    /// Looks up an uninterpreted field by name.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Returns a copy of this snapshot with `profile`'s fields laid on top.
    ///
    /// Profile fields win on overlapping keys, including the typed ones:
    /// a profile carrying `userid` replaces the snapshot's `userid`.
    ///
    /// # Errors
    /// Returns [`ProtocolError`] if the merged record no longer has the
    /// shape of a snapshot (e.g. a profile with `groups: "oops"`).
    pub fn merged_with(&self, profile: &ProfileRecord) -> Result<Self, ProtocolError> {
        let mut fields = match serde_json::to_value(self).map_err(ProtocolError::encode)? {
            Value::Object(map) => map,
            other => {
                return Err(ProtocolError::InvalidRecord(format!(
                    "snapshot serialized to {other}"
                )));
            }
        };

        for (key, value) in profile.fields() {
            fields.insert(key.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(fields)).map_err(ProtocolError::decode)
    }
}

// ---------------------------------------------------------------------------
// ProfileRecord
// ---------------------------------------------------------------------------

/// Profile data returned for one third-party authority.
///
/// The shape is owned by the profile service, so this is an open map
/// with a couple of convenience accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileRecord(pub Map<String, Value>);

impl ProfileRecord {
    /// The `userid` field, if the profile carries one as a string.
    pub fn userid(&self) -> Option<&str> {
        self.0.get("userid").and_then(Value::as_str)
    }

    /// All fields of the profile.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Sets a field, returning `self` for chaining.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Flash messages
// ---------------------------------------------------------------------------

/// The severity of a flash message, mirroring the keys the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Error,
    Warning,
    Info,
    Success,
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
        };
        f.write_str(name)
    }
}

/// Flash messages attached to a response, grouped by level.
///
/// On the wire: `{ "error": ["..."], "info": ["..."] }`. Missing levels
/// default to empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flash {
    pub error: Vec<String>,
    pub warning: Vec<String>,
    pub info: Vec<String>,
    pub success: Vec<String>,
}

impl Flash {
    /// Iterates over every message, errors first.
    pub fn iter(&self) -> impl Iterator<Item = (FlashLevel, &str)> {
        let levels = [
            (FlashLevel::Error, &self.error),
            (FlashLevel::Warning, &self.warning),
            (FlashLevel::Info, &self.info),
            (FlashLevel::Success, &self.success),
        ];
        levels
            .into_iter()
            .flat_map(|(level, msgs)| msgs.iter().map(move |m| (level, m.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// ResponseEnvelope
// ---------------------------------------------------------------------------

/// The top-level body of every session endpoint response.
///
/// ```text
/// {
///   "model":  { "userid": ..., "csrf": ..., "groups": [...] },   optional
///   "errors": { "password": "Required" },                       optional
///   "reason": "Wrong username or password.",                    optional
///   "flash":  { "error": ["..."] }                              optional
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub model: Option<SessionSnapshot>,

    #[serde(default)]
    pub errors: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub flash: Flash,
}

impl ResponseEnvelope {
    /// Takes the model out of the envelope with `errors` and `reason`
    /// attached. Returns `None` when the server sent no model.
    pub fn take_model(&mut self) -> Option<SessionSnapshot> {
        let mut model = self.model.take()?;
        model.errors = self.errors.clone();
        model.reason = self.reason.clone();
        Some(model)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// The login form body.
///
/// `Debug` is written by hand so a password never ends up in a log line.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================
