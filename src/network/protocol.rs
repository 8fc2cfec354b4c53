//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object tagged by `"type"`.
//!
//! Inbound fields the engine requires are optional. A
//! missing field must surface as a domain error (`invalid_topic`,
//! `missing_data`, ...) rather than a parse failure.

use serde::{Serialize, Deserialize};

use crate::core::catalog::Question;
use crate::core::ids::{SessionId, TopicId};
use crate::game::player::RosterEntry;
use crate::game::quiz::Feedback;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// List topics with their waiting flags.
    GetTopics,

    /// Queue for a topic.
    JoinGame(JoinRequest),

    /// Answer the current question.
    Answer(AnswerRequest),

    /// Leave the queue and any session, keeping the connection open.
    Leave,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Join request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Requested topic.
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Answer submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Session being answered.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Zero-based chosen option. Any value that is not a valid option,
    /// negative ones included, is scored as incorrect.
    #[serde(default)]
    pub index: Option<i64>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Topic listing.
    Topics {
        /// Every catalog topic, in catalog order.
        topics: Vec<TopicInfo>,
    },

    /// Request failed.
    Error(ServerError),

    /// Session state after pairing or after an answer.
    Game(GameUpdate),

    /// Session finished.
    Over(GameOver),

    /// Pong response.
    Pong {
        /// Client timestamp from the ping.
        timestamp: u64,
        /// Server wall clock, Unix milliseconds.
        server_time: u64,
    },

    /// Server is shutting down.
    Shutdown {
        /// Why the connection is closing.
        reason: String,
    },
}

/// Topic entry in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Topic identifier.
    pub id: TopicId,
    /// Display name.
    pub name: String,
    /// Someone is already waiting on this topic.
    pub has_waiting_player: bool,
}

/// Question as shown to players (no correct index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    /// Ordinal number.
    pub number: u32,
    /// Prompt text.
    pub text: String,
    /// Options in display order.
    pub options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            number: q.number,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// Session update broadcast to every participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    /// Session identifier, echoed back with answers.
    pub session_id: SessionId,
    /// Names and scores.
    pub roster: Vec<RosterEntry>,
    /// Question now being asked.
    pub current_question: QuestionView,
    /// Questions left, including the current one.
    pub remaining_count: usize,
    /// Result of the previous answer. Absent right after pairing.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// Final scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    /// Names and final scores.
    pub final_roster: Vec<RosterEntry>,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown or missing topic.
    InvalidTopic,
    /// Blank or missing name.
    InvalidName,
    /// Already queued.
    AlreadyWaiting,
    /// Already playing.
    AlreadyInSession,
    /// Topic has no questions.
    NoQuestionsForTopic,
    /// Answer lacks a session id or index.
    MissingData,
    /// Session id not tracked.
    SessionNotFound,
    /// Connection is not in that session.
    PlayerNotInSession,
    /// Frame could not be parsed.
    InvalidMessage,
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            code,
            message: message.into(),
        })
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
