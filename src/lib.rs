//! # Quiz Duel Server
//!
//! Realtime two-player trivia. Players pick a topic, wait for an opponent,
//! then answer the topic's questions together; the first answer to each
//! question decides it for both.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    QUIZ DUEL SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Shared primitives                       │
//! │  ├── ids.rs        - Connection, session, topic ids          │
//! │  └── catalog.rs    - Topics and questions (read-only)        │
//! │                                                              │
//! │  game/             - Game logic (no I/O)                     │
//! │  ├── player.rs     - Participant and score                   │
//! │  ├── lobby.rs      - Per-topic FIFO matchmaking              │
//! │  └── quiz.rs       - Question progression and scoring        │
//! │                                                              │
//! │  network/          - Networking                              │
//! │  ├── protocol.rs   - Message types                           │
//! │  ├── notify.rs     - Outbound delivery                       │
//! │  ├── session.rs    - Session table and player registry       │
//! │  ├── coordinator.rs- Event dispatch                          │
//! │  └── server.rs     - WebSocket server                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Locks are always taken in the order lobby, session table, session,
//! player registry. Pairing happens entirely under the lobby lock, and each
//! session's answers are applied one at a time in arrival order.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::catalog::{Question, QuestionCatalog, Topic};
pub use core::ids::{ConnectionId, SessionId, TopicId};
pub use game::lobby::MatchmakingLobby;
pub use game::quiz::QuizSession;
pub use network::coordinator::QuizCoordinator;
pub use network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
