//! Quiz Session State Machine
//!
//! One match: a roster, a snapshot of the topic's questions, and a cursor.
//!
//! ```text
//!   InProgress(index < count) --answer--> InProgress(index + 1 < count)
//!                             --answer--> Completed(index + 1 == count)
//! ```
//!
//! `Completed` is terminal. The session manager discards completed sessions.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::catalog::Question;
use crate::core::ids::{ConnectionId, SessionId, TopicId};
use crate::game::player::{Player, RosterEntry};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Questions remain.
    InProgress,
    /// Every question has been answered.
    Completed,
}

/// Result of a single answer, shown to every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Whether the submitted option was correct.
    pub correct: bool,
    /// One-based position of the correct option.
    pub correct_display_index: usize,
}

/// What the caller should broadcast after an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Session moved on to another question.
    Next {
        /// Question now being asked.
        question: Question,
        /// Questions left, including the current one.
        remaining: usize,
        /// Roster with updated scores.
        roster: Vec<RosterEntry>,
        /// Result of the answer just processed.
        feedback: Feedback,
    },
    /// That was the last question.
    Completed {
        /// Final scores.
        final_roster: Vec<RosterEntry>,
        /// Result of the answer just processed.
        feedback: Feedback,
    },
}

/// Quiz session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Topic had no questions to snapshot.
    #[error("No questions for topic {0}")]
    NoQuestions(TopicId),

    /// Answer arrived after the last question.
    #[error("Session already completed")]
    SessionCompleted,

    /// Connection is not on the roster.
    #[error("Player not in game")]
    PlayerNotInSession,
}

/// A live two-player match.
#[derive(Debug)]
pub struct QuizSession {
    id: SessionId,
    topic: TopicId,
    players: Vec<Player>,
    questions: Vec<Question>,
    index: usize,
}

impl QuizSession {
    /// Start a session at the first question.
    pub fn new(
        id: SessionId,
        topic: TopicId,
        players: Vec<Player>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions(topic));
        }

        Ok(Self {
            id,
            topic,
            players,
            questions,
            index: 0,
        })
    }

    /// Session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Topic being played.
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Current phase.
    pub fn phase(&self) -> QuizPhase {
        if self.index < self.questions.len() {
            QuizPhase::InProgress
        } else {
            QuizPhase::Completed
        }
    }

    /// Question being asked, if any remain.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// Zero-based cursor.
    pub fn question_index(&self) -> usize {
        self.index
    }

    /// Size of the snapshotted question set.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Questions left, including the current one.
    pub fn remaining_count(&self) -> usize {
        self.questions.len() - self.index
    }

    /// Names and scores in join order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players.iter().map(Player::roster_entry).collect()
    }

    /// Connection handles on the roster.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|p| p.connection).collect()
    }

    /// Whether a connection is on the roster.
    pub fn contains(&self, connection: &ConnectionId) -> bool {
        self.players.iter().any(|p| &p.connection == connection)
    }

    /// Score of a participant.
    pub fn score_of(&self, connection: &ConnectionId) -> Option<u32> {
        self.players.iter()
            .find(|p| &p.connection == connection)
            .map(|p| p.score)
    }

    /// Players still attached.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Detach a player. Returns true if they were on the roster.
    pub fn remove_player(&mut self, connection: &ConnectionId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| &p.connection != connection);
        self.players.len() != before
    }

    /// Apply one answer to the current question and advance.
    pub fn answer(
        &mut self,
        connection: &ConnectionId,
        chosen: i64,
    ) -> Result<AnswerOutcome, QuizError> {
        let question = self.questions.get(self.index)
            .ok_or(QuizError::SessionCompleted)?;

        let player = self.players.iter_mut()
            .find(|p| &p.connection == connection)
            .ok_or(QuizError::PlayerNotInSession)?;

        let correct = question.is_correct(chosen);
        let feedback = Feedback {
            correct,
            correct_display_index: question.correct_display_index(),
        };

        if correct {
            player.award_point();
        }

        self.index += 1;

        match self.questions.get(self.index) {
            Some(next) => Ok(AnswerOutcome::Next {
                question: next.clone(),
                remaining: self.remaining_count(),
                roster: self.roster(),
                feedback,
            }),
            None => Ok(AnswerOutcome::Completed {
                final_roster: self.roster(),
                feedback,
            }),
        }
    }
}
