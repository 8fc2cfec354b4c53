//! Quiz Session Management
//!
//! Owns every live quiz session and the connection → session registry.
//! Creates sessions from matched pairs, routes answers, and reconciles
//! disconnects.
//!
//! Locking: the session table lock is only held to look up, insert, or remove
//! an `Arc` handle, never while waiting on a session's own mutex. Each session
//! mutex serializes answers for that session in arrival order.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::catalog::QuestionCatalog;
use crate::core::ids::{ConnectionId, SessionId, TopicId};
use crate::game::lobby::{LobbyError, MatchedPair};
use crate::game::player::RosterEntry;
use crate::game::quiz::{AnswerOutcome, QuizError, QuizSession};
use crate::network::notify::{Notifier, Recipients};
use crate::network::protocol::{
    AnswerRequest, ErrorCode, GameOver, GameUpdate, QuestionView, ServerMessage,
};

/// Session errors. Each is reported to the triggering connection only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Join rejected by the lobby.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Connection is already playing.
    #[error("Already in a game")]
    AlreadyInSession,

    /// Topic resolved but has no questions.
    #[error("No questions for topic {0}")]
    NoQuestionsForTopic(TopicId),

    /// Answer lacks a session id or index.
    #[error("Missing required data")]
    MissingData,

    /// Session id is not tracked.
    #[error("Game not found")]
    SessionNotFound,

    /// Connection is not on the session's roster.
    #[error("Player not in game")]
    PlayerNotInSession,
}

impl SessionError {
    /// Wire error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::Lobby(LobbyError::InvalidTopic) => ErrorCode::InvalidTopic,
            SessionError::Lobby(LobbyError::InvalidName) => ErrorCode::InvalidName,
            SessionError::Lobby(LobbyError::AlreadyWaiting) => ErrorCode::AlreadyWaiting,
            SessionError::AlreadyInSession => ErrorCode::AlreadyInSession,
            SessionError::NoQuestionsForTopic(_) => ErrorCode::NoQuestionsForTopic,
            SessionError::MissingData => ErrorCode::MissingData,
            SessionError::SessionNotFound => ErrorCode::SessionNotFound,
            SessionError::PlayerNotInSession => ErrorCode::PlayerNotInSession,
        }
    }

    /// Error notification for the triggering connection.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.code(), self.to_string())
    }
}

impl From<QuizError> for SessionError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::NoQuestions(topic) => SessionError::NoQuestionsForTopic(topic),
            // A completed session is about to be dropped from the table.
            QuizError::SessionCompleted => SessionError::SessionNotFound,
            QuizError::PlayerNotInSession => SessionError::PlayerNotInSession,
        }
    }
}

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<QuizSession>>;

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all live sessions.
pub struct SessionManager {
    /// Question source for new sessions.
    catalog: Arc<QuestionCatalog>,
    /// Outbound capability.
    notifier: Arc<dyn Notifier>,
    /// Live sessions.
    sessions: RwLock<BTreeMap<SessionId, SessionHandle>>,
    /// Player registry: connection to session mapping.
    player_sessions: RwLock<BTreeMap<ConnectionId, SessionId>>,
    /// Sequence for session ids.
    next_seq: AtomicU64,
}

impl SessionManager {
    /// Create a session manager.
    pub fn new(catalog: Arc<QuestionCatalog>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            catalog,
            notifier,
            sessions: RwLock::new(BTreeMap::new()),
            player_sessions: RwLock::new(BTreeMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Start a session for a matched pair and send both players the first question.
    ///
    /// The session id derives from the second player, whose join completed the
    /// pair, and a sequence number that never repeats within this manager.
    /// With no questions the pair is dropped: nobody is notified or re-queued.
    pub async fn create_session(&self, pair: MatchedPair) -> Result<SessionId, SessionError> {
        let topic = pair.topic;
        let questions = self.catalog.questions_for_topic(topic);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = SessionId::for_connection(&pair.second.connection, seq);
        let connections = pair.connections();

        let session = QuizSession::new(id.clone(), topic, pair.into_players(), questions)?;
        let initial = Self::snapshot(&session);

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        }
        {
            let mut player_sessions = self.player_sessions.write().await;
            for connection in connections {
                player_sessions.insert(connection, id.clone());
            }
        }

        info!("Session {} started on topic {}", id, topic);

        if let Some(update) = initial {
            self.notifier.notify(Recipients::Many(connections.to_vec()), ServerMessage::Game(update));
        }

        Ok(id)
    }

    /// Apply an answer and broadcast the outcome to the remaining roster.
    pub async fn submit_answer(
        &self,
        connection: ConnectionId,
        request: &AnswerRequest,
    ) -> Result<(), SessionError> {
        let (Some(session_id), Some(chosen)) = (request.session_id.as_ref(), request.index) else {
            return Err(SessionError::MissingData);
        };

        let session = self.get_session(session_id).await
            .ok_or(SessionError::SessionNotFound)?;

        let completed = {
            let mut guard = session.lock().await;
            let outcome = guard.answer(&connection, chosen)?;
            let recipients = Recipients::Many(guard.connections());

            debug!(
                "Session {} answer from {}: question {}/{}",
                session_id, connection.short(), guard.question_index(), guard.question_count()
            );

            match outcome {
                AnswerOutcome::Next { question, remaining, roster, feedback } => {
                    self.notifier.notify(recipients, ServerMessage::Game(GameUpdate {
                        session_id: session_id.clone(),
                        roster,
                        current_question: QuestionView::from(&question),
                        remaining_count: remaining,
                        feedback: Some(feedback),
                    }));
                    None
                }
                AnswerOutcome::Completed { final_roster, .. } => {
                    info!("Session {} completed: {:?}", session_id, final_roster);
                    self.notifier.notify(recipients, ServerMessage::Over(GameOver { final_roster }));
                    Some(guard.connections())
                }
            }
        };

        if let Some(remaining) = completed {
            self.remove_session(session_id).await;
            let mut player_sessions = self.player_sessions.write().await;
            for connection in remaining {
                if player_sessions.get(&connection) == Some(session_id) {
                    player_sessions.remove(&connection);
                }
            }
        }

        Ok(())
    }

    /// Detach a connection from its session. Idempotent, never fails.
    ///
    /// A session left with one player keeps running; an empty one is dropped
    /// silently.
    pub async fn remove_player(&self, connection: &ConnectionId) {
        let session_id = {
            let mut player_sessions = self.player_sessions.write().await;
            player_sessions.remove(connection)
        };

        let Some(session_id) = session_id else {
            return;
        };

        let Some(session) = self.get_session(&session_id).await else {
            return;
        };

        let now_empty = {
            let mut guard = session.lock().await;
            if guard.remove_player(connection) {
                debug!("Connection {} left session {} ({} remaining)",
                    connection.short(), session_id, guard.player_count());
            }
            guard.player_count() == 0
        };

        if now_empty {
            self.remove_session(&session_id).await;
            info!("Session {} abandoned", session_id);
        }
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &SessionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Session a connection currently plays in.
    pub async fn session_of(&self, connection: &ConnectionId) -> Option<SessionId> {
        let player_sessions = self.player_sessions.read().await;
        player_sessions.get(connection).cloned()
    }

    /// Whether a connection currently plays in a session.
    pub async fn is_in_session(&self, connection: &ConnectionId) -> bool {
        self.session_of(connection).await.is_some()
    }

    /// Current roster of a session.
    pub async fn roster(&self, id: &SessionId) -> Option<Vec<RosterEntry>> {
        let session = self.get_session(id).await?;
        let guard = session.lock().await;
        Some(guard.roster())
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Remove a session.
    async fn remove_session(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Current-question update without feedback.
    fn snapshot(session: &QuizSession) -> Option<GameUpdate> {
        let question = session.current_question()?;
        Some(GameUpdate {
            session_id: session.id().clone(),
            roster: session.roster(),
            current_question: QuestionView::from(question),
            remaining_count: session.remaining_count(),
            feedback: None,
        })
    }
}
