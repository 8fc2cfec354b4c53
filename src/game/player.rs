//! Player records.

use serde::{Serialize, Deserialize};

use crate::core::ids::ConnectionId;

/// A player attached to a connection.
///
/// Lives in a lobby queue until matched, then inside exactly one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Connection handle.
    pub connection: ConnectionId,
    /// Display name.
    pub name: String,
    /// Running score (correct answers this session).
    pub score: u32,
}

impl Player {
    /// Create a player with a zero score.
    pub fn new(connection: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            connection,
            name: name.into(),
            score: 0,
        }
    }

    /// Award one point.
    #[inline]
    pub fn award_point(&mut self) {
        self.score += 1;
    }

    /// Public view for roster broadcasts.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            name: self.name.clone(),
            score: self.score,
        }
    }
}

/// Name and score as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name.
    pub name: String,
    /// Current score.
    pub score: u32,
}
