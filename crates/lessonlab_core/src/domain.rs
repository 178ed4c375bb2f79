//! crates/lessonlab_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A lesson as maintained by the course CRUD surface. Read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
}

impl Lesson {
    /// Joins title and content into the text the generator and the chat
    /// responder work from. An empty result means there is nothing to
    /// generate study material about.
    pub fn context_text(&self) -> String {
        let content = self.content.as_deref().unwrap_or("");
        format!("{}\n\n{}", self.title, content).trim().to_string()
    }
}

/// A single question/answer study card inside a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// One multiple-choice quiz question inside a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizItem {
    pub question: String,
    pub choices: Vec<String>,
    /// Zero-based index into `choices`.
    pub correct: usize,
    pub explanation: String,
}

impl QuizItem {
    /// The trusted answer key, or `None` when `correct` does not index
    /// into `choices`. Grading treats a keyless item as unanswerable.
    pub fn answer_key(&self) -> Option<usize> {
        (self.correct < self.choices.len()).then_some(self.correct)
    }
}

/// The cached study material for one lesson. Exactly one bundle exists
/// per `lesson_id` at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAssetBundle {
    pub lesson_id: String,
    pub summary: Option<String>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizItem>,
    /// Set once, when the first generation for the lesson is stored.
    pub generated_at: DateTime<Utc>,
    /// Refreshed on every successful regeneration.
    pub updated_at: DateTime<Utc>,
}

/// A freshly validated bundle on its way to the store. Timestamps are
/// owned by the store, so none appear here.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssetBundle {
    pub lesson_id: String,
    pub summary: Option<String>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizItem>,
}

/// One answer on a submitted quiz sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAnswer {
    pub question_index: usize,
    pub selected: usize,
}

/// An append-only record of one graded quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: String,
    pub answers: Vec<QuizAnswer>,
    /// Percentage 0-100, rounded to 2 decimals.
    pub score: f64,
    pub completed_at: DateTime<Utc>,
}

/// A graded quiz run before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizAttempt {
    pub user_id: Uuid,
    pub lesson_id: String,
    pub answers: Vec<QuizAnswer>,
    pub score: f64,
}

/// The verified caller identity, as vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Scores an answer sheet against a quiz, as the percentage of quiz
/// questions answered correctly, rounded to 2 decimals.
///
/// An answer only counts when the referenced item exists and carries a
/// trusted answer key; selections against a keyless item score as wrong
/// rather than panicking on a bad index.
pub fn score_quiz(quiz: &[QuizItem], answers: &[QuizAnswer]) -> f64 {
    if quiz.is_empty() {
        return 0.0;
    }
    let correct = answers
        .iter()
        .filter(|answer| {
            quiz.get(answer.question_index)
                .and_then(QuizItem::answer_key)
                .is_some_and(|key| key == answer.selected)
        })
        .count();
    (correct as f64 / quiz.len() as f64 * 10_000.0).round() / 100.0
}
