//! Question Catalog
//!
//! Read-only topic and question content, loaded once at startup.
//! Questions keep their catalog order; lookups never mutate.

use std::collections::BTreeSet;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::ids::TopicId;

/// A named category of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique topic identifier.
    pub id: TopicId,
    /// Display name.
    pub name: String,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Ordinal number within the topic.
    pub number: u32,
    /// Owning topic.
    pub topic: TopicId,
    /// Prompt text.
    pub text: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// Zero-based index of the correct option.
    pub answer: usize,
}

impl Question {
    /// Whether `chosen` is the correct option. Negative picks never are.
    #[inline]
    pub fn is_correct(&self, chosen: i64) -> bool {
        usize::try_from(chosen).map_or(false, |c| c == self.answer)
    }

    /// One-based position of the correct option, as shown to players.
    #[inline]
    pub fn correct_display_index(&self) -> usize {
        self.answer + 1
    }
}

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog document is not valid JSON for the expected shape.
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two topics share an id.
    #[error("Duplicate topic id {0}")]
    DuplicateTopic(TopicId),

    /// A question references a topic that does not exist.
    #[error("Question {number} references unknown topic {topic}")]
    UnknownTopic {
        /// Question number.
        number: u32,
        /// Referenced topic.
        topic: TopicId,
    },

    /// A question's correct index is outside its options.
    #[error("Question {number} of topic {topic} has answer {answer} but only {options} options")]
    AnswerOutOfRange {
        /// Question number.
        number: u32,
        /// Owning topic.
        topic: TopicId,
        /// Declared correct index.
        answer: usize,
        /// Number of options.
        options: usize,
    },
}

/// On-disk catalog layout.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    topics: Vec<Topic>,
    #[serde(default)]
    questions: Vec<Question>,
}

/// Immutable topic/question store.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    topics: Vec<Topic>,
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Build a catalog, validating its invariants.
    pub fn new(topics: Vec<Topic>, questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for topic in &topics {
            if !seen.insert(topic.id) {
                return Err(CatalogError::DuplicateTopic(topic.id));
            }
        }

        for q in &questions {
            if !seen.contains(&q.topic) {
                return Err(CatalogError::UnknownTopic { number: q.number, topic: q.topic });
            }
            if q.answer >= q.options.len() {
                return Err(CatalogError::AnswerOutOfRange {
                    number: q.number,
                    topic: q.topic,
                    answer: q.answer,
                    options: q.options.len(),
                });
            }
        }

        Ok(Self { topics, questions })
    }

    /// Parse a JSON catalog document.
    pub fn from_json(s: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(s)?;
        Self::new(doc.topics, doc.questions)
    }

    /// Load a JSON catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// All topics, in catalog order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Resolve a topic by id.
    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Questions for a topic, in catalog order. Empty if none exist.
    pub fn questions_for_topic(&self, id: TopicId) -> Vec<Question> {
        self.questions.iter()
            .filter(|q| q.topic == id)
            .cloned()
            .collect()
    }

    /// Total number of questions across all topics.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Small catalog used when no catalog file is configured.
    pub fn builtin() -> Self {
        fn q(number: u32, topic: TopicId, text: &str, options: &[&str], answer: usize) -> Question {
            Question {
                number,
                topic,
                text: text.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
                answer,
            }
        }

        let topics = vec![
            Topic { id: 1, name: "Geography".to_string() },
            Topic { id: 2, name: "Science".to_string() },
            Topic { id: 3, name: "Programming".to_string() },
        ];

        let questions = vec![
            q(1, 1, "What is the capital of Australia?", &["Sydney", "Canberra", "Melbourne", "Perth"], 1),
            q(2, 1, "Which river is the longest?", &["Amazon", "Yangtze", "Nile", "Mississippi"], 2),
            q(3, 1, "Which country has the most islands?", &["Sweden", "Indonesia", "Philippines", "Canada"], 0),
            q(1, 2, "What is the chemical symbol for gold?", &["Ag", "Go", "Au", "Gd"], 2),
            q(2, 2, "How many planets are in the Solar System?", &["7", "8", "9", "10"], 1),
            q(3, 2, "What particle carries a negative charge?", &["Proton", "Neutron", "Electron", "Photon"], 2),
            q(1, 3, "Which keyword declares an immutable binding in Rust?", &["let", "var", "const mut", "val"], 0),
            q(2, 3, "What does HTTP status 404 mean?", &["Forbidden", "Not Found", "Bad Gateway", "Created"], 1),
            q(3, 3, "Which data structure is FIFO?", &["Stack", "Queue", "Tree", "Heap"], 1),
        ];

        // Built-in content is static and satisfies every invariant.
        Self { topics, questions }
    }
}
