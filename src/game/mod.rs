//! Game Logic Module
//!
//! Matchmaking and quiz progression. Nothing here touches the network; the
//! types are plain data guarded by the network layer's locks.
//!
//! ## Module Structure
//!
//! - `player`: Participant identity and score
//! - `lobby`: Per-topic FIFO waiting queues and pairing
//! - `quiz`: Question sequence, scoring, feedback

pub mod player;
pub mod lobby;
pub mod quiz;

// Re-export key types
pub use player::{Player, RosterEntry};
pub use lobby::{LobbyError, MatchedPair, MatchmakingLobby, PLAYERS_PER_MATCH};
pub use quiz::{AnswerOutcome, Feedback, QuizError, QuizPhase, QuizSession};
