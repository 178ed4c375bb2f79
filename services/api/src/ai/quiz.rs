//! services/api/src/ai/quiz.rs
//!
//! Grades a submitted answer sheet against the cached bundle's quiz and
//! appends the attempt. The bundle's answer key is the only authority;
//! grading never regenerates assets.

use std::sync::Arc;

use uuid::Uuid;

use lessonlab_core::domain::{score_quiz, NewQuizAttempt, QuizAnswer, QuizAttempt};
use lessonlab_core::ports::{PortError, PortResult, StoreService};

pub struct QuizService {
    store: Arc<dyn StoreService>,
}

impl QuizService {
    pub fn new(store: Arc<dyn StoreService>) -> Self {
        Self { store }
    }

    /// Scores `answers` against the lesson's cached quiz and appends the
    /// attempt. Attempts are append-only: retakes add rows, never replace.
    pub async fn submit(
        &self,
        user_id: Uuid,
        lesson_id: &str,
        answers: Vec<QuizAnswer>,
    ) -> PortResult<QuizAttempt> {
        if answers.is_empty() {
            return Err(PortError::InvalidInput("answers are required".to_string()));
        }

        let bundle = self
            .store
            .get_assets_for_lesson(lesson_id)
            .await?
            .ok_or_else(|| {
                PortError::NotFound(format!("No generated quiz for lesson {lesson_id}"))
            })?;
        if bundle.quiz.is_empty() {
            return Err(PortError::NotFound(format!(
                "No generated quiz for lesson {lesson_id}"
            )));
        }

        let score = score_quiz(&bundle.quiz, &answers);
        self.store
            .save_quiz_attempt(NewQuizAttempt {
                user_id,
                lesson_id: lesson_id.to_string(),
                answers,
                score,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::testing::{sample_bundle, StubStore};

    fn answers(pairs: &[(usize, usize)]) -> Vec<QuizAnswer> {
        pairs
            .iter()
            .map(|&(question_index, selected)| QuizAnswer {
                question_index,
                selected,
            })
            .collect()
    }

    #[tokio::test]
    async fn grades_against_the_cached_answer_key() {
        let store = Arc::new(StubStore::new().with_bundle(sample_bundle("L1")));
        let service = QuizService::new(store.clone());
        let user_id = Uuid::new_v4();

        // sample_bundle's single quiz item has answer key 0.
        let attempt = service
            .submit(user_id, "L1", answers(&[(0, 0)]))
            .await
            .unwrap();

        assert_eq!(attempt.score, 100.0);
        assert_eq!(attempt.user_id, user_id);
        assert_eq!(store.attempts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retakes_append_rather_than_replace() {
        let store = Arc::new(StubStore::new().with_bundle(sample_bundle("L1")));
        let service = QuizService::new(store.clone());
        let user_id = Uuid::new_v4();

        let first = service
            .submit(user_id, "L1", answers(&[(0, 0)]))
            .await
            .unwrap();
        let second = service
            .submit(user_id, "L1", answers(&[(0, 3)]))
            .await
            .unwrap();

        assert_eq!(first.score, 100.0);
        assert_eq!(second.score, 0.0);
        assert_eq!(store.attempts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_bundle_is_not_found() {
        let service = QuizService::new(Arc::new(StubStore::new()));

        let err = service
            .submit(Uuid::new_v4(), "L1", answers(&[(0, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_sheet_is_invalid_input() {
        let service = QuizService::new(Arc::new(StubStore::new()));

        let err = service.submit(Uuid::new_v4(), "L1", vec![]).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
