//! Identifiers
//!
//! Opaque handles used to route events between the gateway and the engine.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Opaque per-connection handle (UUID as bytes).
///
/// Implements Ord so it can key BTreeMaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub [u8; 16]);

impl ConnectionId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Allocate a fresh random handle.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        self.to_uuid_string()[..8].to_string()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0))
    }
}

// =============================================================================
// TOPIC ID
// =============================================================================

/// Topic identifier as it appears in the catalog.
pub type TopicId = u32;

// =============================================================================
// SESSION ID
// =============================================================================

/// Quiz session identifier.
///
/// Derived from the connection whose join completed the pairing plus a
/// per-manager sequence number. A connection can complete several pairings
/// over its lifetime, so the handle alone does not identify a session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Derive the session id for the `seq`-th pairing, triggered by `connection`.
    pub fn for_connection(connection: &ConnectionId, seq: u64) -> Self {
        Self(format!("game_{}_{}", connection, seq))
    }

    /// Wrap a raw id received from a client.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
