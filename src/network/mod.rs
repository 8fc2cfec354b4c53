//! Network Layer
//!
//! WebSocket gateway, wire protocol, and the session bookkeeping that turns
//! client events into game updates.

pub mod protocol;
pub mod notify;
pub mod session;
pub mod coordinator;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, JoinRequest, AnswerRequest,
    GameUpdate, GameOver, TopicInfo, ErrorCode,
};
pub use notify::{Notifier, Recipients, ChannelNotifier, RecordingNotifier};
pub use session::{SessionManager, SessionError, SessionHandle};
pub use coordinator::QuizCoordinator;
pub use server::{GameServer, ServerConfig, GameServerError};
