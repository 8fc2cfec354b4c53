//! Event Coordinator
//!
//! Entry point for inbound events. Owns the lobby and the session manager and
//! runs each join, answer, and disconnect as one unit.
//!
//! A join holds the lobby lock until the matched pair's session is
//! registered, so no third joiner can claim a drained waiter and a racing
//! disconnect always finds the player either queued or in a session.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::catalog::QuestionCatalog;
use crate::core::ids::{ConnectionId, SessionId, TopicId};
use crate::game::lobby::{LobbyError, MatchmakingLobby};
use crate::network::notify::{Notifier, Recipients};
use crate::network::protocol::{
    AnswerRequest, ClientMessage, JoinRequest, ServerMessage, TopicInfo,
};
use crate::network::session::{SessionError, SessionManager};

/// Lobby plus sessions behind one event API.
pub struct QuizCoordinator {
    catalog: Arc<QuestionCatalog>,
    notifier: Arc<dyn Notifier>,
    lobby: Mutex<MatchmakingLobby>,
    sessions: SessionManager,
}

impl QuizCoordinator {
    /// Create a coordinator over a catalog and an outbound capability.
    pub fn new(catalog: Arc<QuestionCatalog>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            lobby: Mutex::new(MatchmakingLobby::new(catalog.clone())),
            sessions: SessionManager::new(catalog.clone(), notifier.clone()),
            catalog,
            notifier,
        }
    }

    /// Dispatch an engine-level client message.
    ///
    /// Failures go back to `connection` as an `error` message.
    pub async fn handle_message(&self, connection: ConnectionId, msg: ClientMessage) {
        let result = match msg {
            ClientMessage::GetTopics => {
                let topics = self.list_topics().await;
                self.notifier.notify(Recipients::One(connection), ServerMessage::Topics { topics });
                Ok(())
            }
            ClientMessage::JoinGame(req) => self.join(connection, &req).await.map(|_| ()),
            ClientMessage::Answer(req) => self.answer(connection, &req).await,
            ClientMessage::Leave => {
                self.disconnect(&connection).await;
                Ok(())
            }
            ClientMessage::Ping { timestamp } => {
                self.notifier.notify(Recipients::One(connection), ServerMessage::Pong {
                    timestamp,
                    server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
                });
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!("Request from {} failed: {}", connection.short(), e);
            self.notifier.notify(Recipients::One(connection), e.to_message());
        }
    }

    /// Topics with a flag telling whether someone is waiting.
    pub async fn list_topics(&self) -> Vec<TopicInfo> {
        let lobby = self.lobby.lock().await;
        self.catalog.topics().iter()
            .map(|t| TopicInfo {
                id: t.id,
                name: t.name.clone(),
                has_waiting_player: lobby.has_waiting_player(t.id),
            })
            .collect()
    }

    /// Queue a connection; start a session if this completes a pair.
    ///
    /// Returns the new session id when a session started.
    pub async fn join(
        &self,
        connection: ConnectionId,
        request: &JoinRequest,
    ) -> Result<Option<SessionId>, SessionError> {
        let mut lobby = self.lobby.lock().await;

        if self.sessions.is_in_session(&connection).await {
            return Err(SessionError::AlreadyInSession);
        }

        let topic = request.topic_id.ok_or(LobbyError::InvalidTopic)?;
        let name = request.name.as_deref().ok_or(LobbyError::InvalidName)?;

        let Some(pair) = lobby.join(topic, connection, name)? else {
            info!("Connection {} waiting on topic {}", connection.short(), topic);
            return Ok(None);
        };

        info!("Paired {} and {} on topic {}",
            pair.first.connection.short(), pair.second.connection.short(), topic);

        match self.sessions.create_session(pair).await {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!("Pairing on topic {} dropped: {}", topic, e);
                Err(e)
            }
        }
    }

    /// Route an answer to its session.
    pub async fn answer(
        &self,
        connection: ConnectionId,
        request: &AnswerRequest,
    ) -> Result<(), SessionError> {
        self.sessions.submit_answer(connection, request).await
    }

    /// Forget a connection everywhere. Idempotent.
    pub async fn disconnect(&self, connection: &ConnectionId) {
        {
            let mut lobby = self.lobby.lock().await;
            if lobby.remove_player(connection) {
                debug!("Connection {} left the lobby", connection.short());
            }
        }
        self.sessions.remove_player(connection).await;
    }

    /// Players waiting on a topic.
    pub async fn waiting_count(&self, topic: TopicId) -> usize {
        self.lobby.lock().await.waiting_count(topic)
    }

    /// Session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Question, Topic};
    use crate::network::notify::RecordingNotifier;
    use crate::network::protocol::ErrorCode;

    /// Topic 1 has three questions (correct option 0, 1, 2); topic 2 has none.
    fn catalog() -> Arc<QuestionCatalog> {
        let topics = vec![
            Topic { id: 1, name: "Trivia".into() },
            Topic { id: 2, name: "Blank".into() },
        ];
        let questions = (0..3)
            .map(|i| Question {
                number: i as u32 + 1,
                topic: 1,
                text: format!("Q{}", i + 1),
                options: vec!["a".into(), "b".into(), "c".into()],
                answer: i,
            })
            .collect();
        Arc::new(QuestionCatalog::new(topics, questions).unwrap())
    }

    fn setup() -> (Arc<QuizCoordinator>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        (Arc::new(QuizCoordinator::new(catalog(), notifier.clone())), notifier)
    }

    fn conn(n: u8) -> ConnectionId {
        ConnectionId::new([n; 16])
    }

    fn join_msg(topic: u32, name: &str) -> ClientMessage {
        ClientMessage::JoinGame(JoinRequest { topic_id: Some(topic), name: Some(name.into()) })
    }

    fn answer_msg(id: &SessionId, index: i64) -> ClientMessage {
        ClientMessage::Answer(AnswerRequest { session_id: Some(id.clone()), index: Some(index) })
    }

    fn last_error(notifier: &RecordingNotifier, c: ConnectionId) -> Option<ErrorCode> {
        notifier.take(&c).into_iter().rev().find_map(|m| match m {
            ServerMessage::Error(e) => Some(e.code),
            _ => None,
        })
    }

    async fn start_pair(coord: &QuizCoordinator, notifier: &RecordingNotifier) -> SessionId {
        coord.handle_message(conn(1), join_msg(1, "P1")).await;
        coord.handle_message(conn(2), join_msg(1, "P2")).await;
        let id = coord.sessions().session_of(&conn(1)).await.unwrap();
        notifier.take(&conn(1));
        notifier.take(&conn(2));
        id
    }

    #[tokio::test]
    async fn test_topics_report_waiting_players() {
        let (coord, notifier) = setup();
        coord.handle_message(conn(1), join_msg(2, "P1")).await;
        coord.handle_message(conn(3), ClientMessage::GetTopics).await;

        let msgs = notifier.take(&conn(3));
        match &msgs[..] {
            [ServerMessage::Topics { topics }] => {
                assert_eq!(topics.len(), 2);
                assert!(!topics[0].has_waiting_player);
                assert!(topics[1].has_waiting_player);
                assert_eq!(topics[1].name, "Blank");
            }
            other => panic!("Unexpected messages: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_validation_errors() {
        let (coord, notifier) = setup();

        coord.handle_message(conn(1), join_msg(77, "P1")).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::InvalidTopic));

        coord.handle_message(conn(1), join_msg(1, " ")).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::InvalidName));

        coord.handle_message(conn(1), ClientMessage::JoinGame(JoinRequest::default())).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::InvalidTopic));

        let no_name = JoinRequest { topic_id: Some(1), name: None };
        coord.handle_message(conn(1), ClientMessage::JoinGame(no_name)).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::InvalidName));

        assert_eq!(coord.waiting_count(1).await, 0);
    }

    #[tokio::test]
    async fn test_player_in_session_cannot_join_again() {
        let (coord, notifier) = setup();
        start_pair(&coord, &notifier).await;

        coord.handle_message(conn(1), join_msg(1, "P1")).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::AlreadyInSession));
        assert_eq!(coord.waiting_count(1).await, 0);
    }

    // Scenario A: pairing sends the first question, a correct answer moves both on.
    #[tokio::test]
    async fn test_pairing_and_first_answer() {
        let (coord, notifier) = setup();
        coord.handle_message(conn(1), join_msg(1, "P1")).await;
        assert!(notifier.take(&conn(1)).is_empty());

        coord.handle_message(conn(2), join_msg(1, "P2")).await;
        let id = coord.sessions().session_of(&conn(2)).await.unwrap();
        assert_eq!(coord.sessions().session_of(&conn(1)).await, Some(id.clone()));

        for c in [conn(1), conn(2)] {
            match &notifier.take(&c)[..] {
                [ServerMessage::Game(update)] => {
                    assert_eq!(update.session_id, id);
                    assert_eq!(update.current_question.text, "Q1");
                    assert_eq!(update.remaining_count, 3);
                    assert!(update.feedback.is_none());
                }
                other => panic!("Unexpected messages: {:?}", other),
            }
        }

        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        for c in [conn(1), conn(2)] {
            match &notifier.take(&c)[..] {
                [ServerMessage::Game(update)] => {
                    assert_eq!(update.current_question.text, "Q2");
                    assert_eq!(update.remaining_count, 2);
                    let feedback = update.feedback.unwrap();
                    assert!(feedback.correct);
                    assert_eq!(feedback.correct_display_index, 1);
                    assert_eq!(update.roster[0].score, 1);
                    assert_eq!(update.roster[1].score, 0);
                }
                other => panic!("Unexpected messages: {:?}", other),
            }
        }
    }

    // Scenario B: the last answer ends the session for both.
    #[tokio::test]
    async fn test_completion_sends_over_and_forgets_session() {
        let (coord, notifier) = setup();
        let id = start_pair(&coord, &notifier).await;

        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        coord.handle_message(conn(2), answer_msg(&id, 1)).await;
        coord.handle_message(conn(2), answer_msg(&id, 0)).await;

        for c in [conn(1), conn(2)] {
            match notifier.take(&c).last() {
                Some(ServerMessage::Over(over)) => {
                    assert_eq!(over.final_roster[0].score, 1);
                    assert_eq!(over.final_roster[1].score, 1);
                }
                other => panic!("Unexpected message: {:?}", other),
            }
        }

        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::SessionNotFound));
        assert_eq!(coord.sessions().session_count().await, 0);
    }

    // Scenario C: a topic without questions pairs but never starts.
    #[tokio::test]
    async fn test_topic_without_questions() {
        let (coord, notifier) = setup();
        coord.handle_message(conn(1), join_msg(2, "P1")).await;

        let result = coord.join(conn(2), &JoinRequest { topic_id: Some(2), name: Some("P2".into()) }).await;
        assert_eq!(result, Err(SessionError::NoQuestionsForTopic(2)));

        assert_eq!(coord.waiting_count(2).await, 0);
        assert_eq!(coord.sessions().session_count().await, 0);
        for c in [conn(1), conn(2)] {
            assert!(notifier.take(&c).iter().all(|m| !matches!(m, ServerMessage::Game(_))));
        }
    }

    // Scenario D: the survivor plays on alone and still gets `over`.
    #[tokio::test]
    async fn test_disconnect_mid_session() {
        let (coord, notifier) = setup();
        let id = start_pair(&coord, &notifier).await;

        coord.disconnect(&conn(2)).await;
        coord.disconnect(&conn(2)).await;

        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        match &notifier.take(&conn(1))[..] {
            [ServerMessage::Game(update)] => {
                assert_eq!(update.roster.len(), 1);
                assert_eq!(update.roster[0].score, 1);
                assert_eq!(update.remaining_count, 2);
            }
            other => panic!("Unexpected messages: {:?}", other),
        }

        coord.handle_message(conn(1), answer_msg(&id, 1)).await;
        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        match notifier.take(&conn(1)).last() {
            Some(ServerMessage::Over(over)) => {
                assert_eq!(over.final_roster.len(), 1);
                assert_eq!(over.final_roster[0].score, 2);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert!(notifier.take(&conn(2)).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_while_waiting() {
        let (coord, _notifier) = setup();
        coord.handle_message(conn(1), join_msg(1, "P1")).await;
        coord.disconnect(&conn(1)).await;
        coord.disconnect(&conn(1)).await;
        assert_eq!(coord.waiting_count(1).await, 0);

        assert_eq!(coord.join(conn(2), &JoinRequest { topic_id: Some(1), name: Some("P2".into()) }).await, Ok(None));
    }

    #[tokio::test]
    async fn test_leave_ends_participation() {
        let (coord, notifier) = setup();
        let id = start_pair(&coord, &notifier).await;

        coord.handle_message(conn(1), ClientMessage::Leave).await;
        coord.handle_message(conn(1), answer_msg(&id, 0)).await;
        assert_eq!(last_error(&notifier, conn(1)), Some(ErrorCode::PlayerNotInSession));
        assert_eq!(coord.sessions().session_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejoin_after_leave_starts_a_separate_session() {
        let (coord, notifier) = setup();
        let first = start_pair(&coord, &notifier).await;

        coord.handle_message(conn(2), ClientMessage::Leave).await;
        coord.handle_message(conn(3), join_msg(1, "P3")).await;
        coord.handle_message(conn(2), join_msg(1, "P2")).await;

        let second = coord.sessions().session_of(&conn(2)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(coord.sessions().session_of(&conn(3)).await, Some(second.clone()));
        assert_eq!(coord.sessions().session_of(&conn(1)).await, Some(first.clone()));
        assert_eq!(coord.sessions().session_count().await, 2);

        // The partner left behind still plays its own session.
        notifier.take(&conn(1));
        coord.handle_message(conn(1), answer_msg(&first, 0)).await;
        match &notifier.take(&conn(1))[..] {
            [ServerMessage::Game(update)] => {
                assert_eq!(update.session_id, first);
                assert_eq!(update.roster.len(), 1);
                assert_eq!(update.roster[0].score, 1);
            }
            other => panic!("Unexpected messages: {:?}", other),
        }

        coord.handle_message(conn(2), answer_msg(&second, 0)).await;
        match notifier.take(&conn(3)).last() {
            Some(ServerMessage::Game(update)) => {
                assert_eq!(update.session_id, second);
                assert_eq!(update.roster[1].name, "P2");
                assert_eq!(update.roster[1].score, 1);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let (coord, notifier) = setup();
        coord.handle_message(conn(1), ClientMessage::Ping { timestamp: 42 }).await;
        match &notifier.take(&conn(1))[..] {
            [ServerMessage::Pong { timestamp, server_time }] => {
                assert_eq!(*timestamp, 42);
                assert!(*server_time > 0);
            }
            other => panic!("Unexpected messages: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_pair_everyone_once() {
        let (coord, _notifier) = setup();

        let handles: Vec<_> = (0..20u8)
            .map(|n| {
                let coord = coord.clone();
                tokio::spawn(async move {
                    coord.join(conn(n), &JoinRequest { topic_id: Some(1), name: Some(format!("P{}", n)) }).await
                })
            })
            .collect();

        let mut started = 0;
        for handle in handles {
            if let Ok(Some(_)) = handle.await.unwrap() {
                started += 1;
            }
        }

        assert_eq!(started, 10);
        assert_eq!(coord.sessions().session_count().await, 10);
        assert_eq!(coord.waiting_count(1).await, 0);
        for n in 0..20u8 {
            assert!(coord.sessions().is_in_session(&conn(n)).await);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_answers_advance_once_each() {
        let (coord, _notifier) = setup();
        let id = {
            coord.join(conn(1), &JoinRequest { topic_id: Some(1), name: Some("P1".into()) }).await.unwrap();
            coord.join(conn(2), &JoinRequest { topic_id: Some(1), name: Some("P2".into()) }).await.unwrap().unwrap()
        };

        let a = {
            let coord = coord.clone();
            let req = AnswerRequest { session_id: Some(id.clone()), index: Some(0) };
            tokio::spawn(async move { coord.answer(conn(1), &req).await })
        };
        let b = {
            let coord = coord.clone();
            let req = AnswerRequest { session_id: Some(id.clone()), index: Some(0) };
            tokio::spawn(async move { coord.answer(conn(2), &req).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let session = coord.sessions().get_session(&id).await.unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.question_index(), 2);
        // Only the first processed answer hit question 1 (correct option 0).
        let total = guard.score_of(&conn(1)).unwrap() + guard.score_of(&conn(2)).unwrap();
        assert_eq!(total, 1);
    }
}
