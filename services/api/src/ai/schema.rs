//! services/api/src/ai/schema.rs
//!
//! Output-schema validation for raw generator responses. The generator is
//! untrusted: it may under-deliver on quantity (tolerated and coerced) but
//! never on structure (fatal). Nothing from this module reaches the store
//! until it has passed through `parse_generated`.

use serde::Deserialize;
use tracing::warn;

use lessonlab_core::domain::{Flashcard, QuizItem};
use lessonlab_core::ports::{PortError, PortResult};

/// Number of answer choices every quiz item must carry.
pub const QUIZ_CHOICE_COUNT: usize = 4;

//=========================================================================================
// Draft Structs (the generator's wire shape)
//=========================================================================================

#[derive(Debug, Deserialize)]
struct BundleDraft {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    flashcards: Option<Vec<FlashcardDraft>>,
    #[serde(default)]
    quiz: Option<Vec<QuizItemDraft>>,
}

#[derive(Debug, Deserialize)]
struct FlashcardDraft {
    q: String,
    a: String,
}

#[derive(Debug, Deserialize)]
struct QuizItemDraft {
    question: String,
    choices: Vec<String>,
    correct: i64,
    explanation: String,
}

//=========================================================================================
// The Validated Result
//=========================================================================================

/// A generator response that survived parsing and coercion. Timestamps and
/// persistence are the orchestrator's concern, not this module's.
#[derive(Debug, PartialEq)]
pub struct ParsedBundle {
    pub summary: Option<String>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizItem>,
}

/// Parses and coerces a raw generator response.
///
/// Unparsable JSON is a `MalformedOutput` error and aborts the whole
/// generation attempt. Missing top-level fields coerce to safe defaults.
/// Quiz items whose answer key cannot be trusted (choice count other than
/// [`QUIZ_CHOICE_COUNT`], or `correct` outside the choices) are dropped with
/// a warning: a wrong answer key must never be persisted, while the rest of
/// the bundle is still worth keeping.
pub fn parse_generated(raw: &str) -> PortResult<ParsedBundle> {
    let draft: BundleDraft =
        serde_json::from_str(raw).map_err(|e| PortError::MalformedOutput(e.to_string()))?;

    let flashcards = draft
        .flashcards
        .unwrap_or_default()
        .into_iter()
        .map(|card| Flashcard {
            question: card.q,
            answer: card.a,
        })
        .collect();

    let mut quiz = Vec::new();
    for (index, item) in draft.quiz.unwrap_or_default().into_iter().enumerate() {
        if item.choices.len() != QUIZ_CHOICE_COUNT {
            warn!(
                index,
                choices = item.choices.len(),
                "dropping quiz item with wrong choice count"
            );
            continue;
        }
        let correct = match usize::try_from(item.correct) {
            Ok(value) if value < item.choices.len() => value,
            _ => {
                warn!(
                    index,
                    correct = item.correct,
                    "dropping quiz item with untrusted answer index"
                );
                continue;
            }
        };
        quiz.push(QuizItem {
            question: item.question,
            choices: item.choices,
            correct,
            explanation: item.explanation,
        });
    }

    Ok(ParsedBundle {
        summary: draft.summary,
        flashcards,
        quiz,
    })
}
