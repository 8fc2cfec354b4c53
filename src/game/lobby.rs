//! Matchmaking Lobby
//!
//! Per-topic FIFO queues of waiting players. Pairs exactly two players per
//! topic; the pair is handed to the session manager, the lobby itself never
//! notifies anyone.
//!
//! The lobby is a plain owned structure. Callers wrap it in a lock so that
//! each `join` (append + check + drain) is a single critical section.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::catalog::QuestionCatalog;
use crate::core::ids::{ConnectionId, TopicId};
use crate::game::player::Player;

/// Players per match.
pub const PLAYERS_PER_MATCH: usize = 2;

/// Two players drained from a topic queue, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    /// Topic both players asked for.
    pub topic: TopicId,
    /// First to arrive.
    pub first: Player,
    /// Second to arrive.
    pub second: Player,
}

impl MatchedPair {
    /// Players in arrival order.
    pub fn into_players(self) -> Vec<Player> {
        vec![self.first, self.second]
    }

    /// Connection handles in arrival order.
    pub fn connections(&self) -> [ConnectionId; 2] {
        [self.first.connection, self.second.connection]
    }
}

/// Join rejections. None of them change lobby state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// Topic is missing or not in the catalog.
    #[error("Invalid topic")]
    InvalidTopic,

    /// Name is missing or blank.
    #[error("Invalid name")]
    InvalidName,

    /// Connection already waits in some queue.
    #[error("Already waiting for an opponent")]
    AlreadyWaiting,
}

/// Per-topic waiting queues.
pub struct MatchmakingLobby {
    catalog: Arc<QuestionCatalog>,
    queues: BTreeMap<TopicId, VecDeque<Player>>,
}

impl MatchmakingLobby {
    /// Create an empty lobby over a catalog.
    pub fn new(catalog: Arc<QuestionCatalog>) -> Self {
        Self {
            catalog,
            queues: BTreeMap::new(),
        }
    }

    /// Queue a player for a topic.
    ///
    /// Returns the matched pair once two players wait on the same topic.
    /// Anyone queued behind them stays queued.
    pub fn join(
        &mut self,
        topic: TopicId,
        connection: ConnectionId,
        name: &str,
    ) -> Result<Option<MatchedPair>, LobbyError> {
        if self.catalog.topic(topic).is_none() {
            return Err(LobbyError::InvalidTopic);
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(LobbyError::InvalidName);
        }

        if self.is_waiting(&connection) {
            return Err(LobbyError::AlreadyWaiting);
        }

        let queue = self.queues.entry(topic).or_default();
        queue.push_back(Player::new(connection, name));
        debug!("Connection {} waiting on topic {} ({} queued)", connection.short(), topic, queue.len());

        if queue.len() < PLAYERS_PER_MATCH {
            return Ok(None);
        }

        // Length checked above.
        let (Some(first), Some(second)) = (queue.pop_front(), queue.pop_front()) else {
            return Ok(None);
        };
        if queue.is_empty() {
            self.queues.remove(&topic);
        }

        Ok(Some(MatchedPair { topic, first, second }))
    }

    /// Drop a connection from every queue. Returns true if anything was removed.
    pub fn remove_player(&mut self, connection: &ConnectionId) -> bool {
        let mut removed = false;
        for queue in self.queues.values_mut() {
            let before = queue.len();
            queue.retain(|p| &p.connection != connection);
            removed |= queue.len() != before;
        }
        self.queues.retain(|_, q| !q.is_empty());
        removed
    }

    /// Whether the connection waits in any queue.
    pub fn is_waiting(&self, connection: &ConnectionId) -> bool {
        self.queues.values()
            .any(|q| q.iter().any(|p| &p.connection == connection))
    }

    /// Whether anyone waits on a topic.
    pub fn has_waiting_player(&self, topic: TopicId) -> bool {
        self.waiting_count(topic) > 0
    }

    /// Number of players waiting on a topic.
    pub fn waiting_count(&self, topic: TopicId) -> usize {
        self.queues.get(&topic).map(|q| q.len()).unwrap_or(0)
    }

    /// Catalog the lobby validates against.
    pub fn catalog(&self) -> &Arc<QuestionCatalog> {
        &self.catalog
    }
}
