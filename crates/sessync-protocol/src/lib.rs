//! Wire types for Sessync.
//!
//! This crate defines what the session server sends back and what the
//! client keeps in memory:
//!
//! - **Types** ([`SessionSnapshot`], [`ResponseEnvelope`], [`Flash`],
//!   [`ProfileRecord`], etc.): the records that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those records are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding or merging.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw HTTP bodies) and the
//! session layer (change detection). It doesn't know about requests,
//! caching, or listeners. It only knows how to read and merge records.
//!
//! ```text
//! Transport (bytes) → Protocol (ResponseEnvelope) → Session (snapshot store)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Users write `use sessync_protocol::SessionSnapshot` instead of reaching
// into `sessync_protocol::types`.

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Credentials, Flash, FlashLevel, Group, ProfileRecord, ResponseEnvelope,
    SessionSnapshot, UserId,
};
