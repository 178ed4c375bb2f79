//! services/api/src/adapters/store.rs
//!
//! This module contains the row-store adapter, which is the concrete
//! implementation of the `StoreService` port from the `core` crate. It talks
//! to the hosted store's PostgREST-style REST interface with the service-role
//! key: filtered single-row reads, conflict-key upserts, and plain inserts.
//! Atomicity of the upsert is delegated to the store's own
//! `on_conflict` merge-duplicates resolution; the adapter never retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lessonlab_core::domain::{
    Flashcard, GeneratedAssetBundle, Lesson, NewAssetBundle, NewQuizAttempt, QuizAnswer,
    QuizAttempt, QuizItem,
};
use lessonlab_core::ports::{PortError, PortResult, StoreService};

const LESSONS_TABLE: &str = "lessons";
const ASSETS_TABLE: &str = "ai_generated_assets";
const ATTEMPTS_TABLE: &str = "quiz_attempts";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A row-store adapter that implements the `StoreService` port.
#[derive(Clone)]
pub struct SupabaseStoreAdapter {
    http: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseStoreAdapter {
    /// Creates a new `SupabaseStoreAdapter` for the project at `base_url`.
    pub fn new(http: reqwest::Client, base_url: &str, service_key: String) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            service_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    /// Fetches the first row matching `filters`, or `None` when the filter
    /// matches nothing. Zero matches is an outcome, not an error.
    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        select: &str,
    ) -> PortResult<Option<T>> {
        let mut query: Vec<(&str, String)> = filters.to_vec();
        query.push(("select", select.to_string()));

        let response = self
            .http
            .get(self.table_url(table))
            .query(&query)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;

        let rows: Vec<T> = Self::read_json(response).await?;
        Ok(rows.into_iter().next())
    }

    /// Atomic merge-or-insert keyed on `conflict_column`, returning the row
    /// as persisted.
    async fn upsert_one<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &impl Serialize,
        conflict_column: &str,
    ) -> PortResult<T> {
        let response = self
            .http
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict_column)])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;

        let rows: Vec<T> = Self::read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PortError::Store("upsert returned no representation".to_string()))
    }

    /// Plain insert, returning the row as persisted.
    async fn insert_one<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &impl Serialize,
    ) -> PortResult<T> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Store(e.to_string()))?;

        let rows: Vec<T> = Self::read_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PortError::Store("insert returned no representation".to_string()))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> PortResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StoreErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("row store responded with status {status}"));
            return Err(PortError::Store(message));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Store(e.to_string()))
    }
}

/// The error body PostgREST sends alongside non-success statuses.
#[derive(Deserialize)]
struct StoreErrorBody {
    message: Option<String>,
}

//=========================================================================================
// "Impure" Row Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct LessonRecord {
    id: String,
    title: String,
    content: Option<String>,
}
impl LessonRecord {
    fn to_domain(self) -> Lesson {
        Lesson {
            id: self.id,
            title: self.title,
            content: self.content,
        }
    }
}

/// Flashcards keep the generator's compact `q`/`a` keys on the wire and in
/// the stored jsonb column; the domain type uses full names.
#[derive(Serialize, Deserialize)]
struct FlashcardRecord {
    q: String,
    a: String,
}
impl FlashcardRecord {
    fn to_domain(self) -> Flashcard {
        Flashcard {
            question: self.q,
            answer: self.a,
        }
    }

    fn from_domain(card: Flashcard) -> Self {
        Self {
            q: card.question,
            a: card.answer,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct QuizItemRecord {
    question: String,
    choices: Vec<String>,
    correct: i64,
    explanation: String,
}
impl QuizItemRecord {
    fn to_domain(self) -> QuizItem {
        QuizItem {
            question: self.question,
            choices: self.choices,
            // A stored negative index cannot address any choice; pushing it
            // out of range keeps the answer key untrusted instead of wrong.
            correct: usize::try_from(self.correct).unwrap_or(usize::MAX),
            explanation: self.explanation,
        }
    }

    fn from_domain(item: QuizItem) -> Self {
        Self {
            question: item.question,
            choices: item.choices,
            correct: item.correct as i64,
            explanation: item.explanation,
        }
    }
}

#[derive(Deserialize)]
struct AssetRowRecord {
    lesson_id: String,
    summary: Option<String>,
    flashcards: Option<Vec<FlashcardRecord>>,
    quiz: Option<Vec<QuizItemRecord>>,
    generated_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl AssetRowRecord {
    fn to_domain(self) -> GeneratedAssetBundle {
        GeneratedAssetBundle {
            lesson_id: self.lesson_id,
            summary: self.summary,
            flashcards: self
                .flashcards
                .unwrap_or_default()
                .into_iter()
                .map(FlashcardRecord::to_domain)
                .collect(),
            quiz: self
                .quiz
                .unwrap_or_default()
                .into_iter()
                .map(QuizItemRecord::to_domain)
                .collect(),
            generated_at: self.generated_at,
            updated_at: self.updated_at,
        }
    }
}

/// The upsert payload. `generated_at` is deliberately absent: the store's
/// insert default sets it once and the merge leaves it untouched on
/// regeneration. `updated_at` is stamped here on every write.
#[derive(Serialize)]
struct AssetUpsertBody {
    lesson_id: String,
    summary: Option<String>,
    flashcards: Vec<FlashcardRecord>,
    quiz: Vec<QuizItemRecord>,
    updated_at: DateTime<Utc>,
}
impl AssetUpsertBody {
    fn from_domain(bundle: NewAssetBundle, updated_at: DateTime<Utc>) -> Self {
        Self {
            lesson_id: bundle.lesson_id,
            summary: bundle.summary,
            flashcards: bundle
                .flashcards
                .into_iter()
                .map(FlashcardRecord::from_domain)
                .collect(),
            quiz: bundle
                .quiz
                .into_iter()
                .map(QuizItemRecord::from_domain)
                .collect(),
            updated_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct QuizAnswerRecord {
    question_index: usize,
    selected: usize,
}
impl QuizAnswerRecord {
    fn to_domain(self) -> QuizAnswer {
        QuizAnswer {
            question_index: self.question_index,
            selected: self.selected,
        }
    }

    fn from_domain(answer: QuizAnswer) -> Self {
        Self {
            question_index: answer.question_index,
            selected: answer.selected,
        }
    }
}

#[derive(Deserialize)]
struct QuizAttemptRecord {
    id: Uuid,
    user_id: Uuid,
    lesson_id: String,
    answers: Option<Vec<QuizAnswerRecord>>,
    score: f64,
    completed_at: DateTime<Utc>,
}
impl QuizAttemptRecord {
    fn to_domain(self) -> QuizAttempt {
        QuizAttempt {
            id: self.id,
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            answers: self
                .answers
                .unwrap_or_default()
                .into_iter()
                .map(QuizAnswerRecord::to_domain)
                .collect(),
            score: self.score,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Serialize)]
struct AttemptInsertBody {
    user_id: Uuid,
    lesson_id: String,
    answers: Vec<QuizAnswerRecord>,
    score: f64,
    completed_at: DateTime<Utc>,
}
impl AttemptInsertBody {
    fn from_domain(attempt: NewQuizAttempt, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id: attempt.user_id,
            lesson_id: attempt.lesson_id,
            answers: attempt
                .answers
                .into_iter()
                .map(QuizAnswerRecord::from_domain)
                .collect(),
            score: attempt.score,
            completed_at,
        }
    }
}

//=========================================================================================
// `StoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoreService for SupabaseStoreAdapter {
    async fn get_lesson_by_id(&self, lesson_id: &str) -> PortResult<Lesson> {
        let record: Option<LessonRecord> = self
            .fetch_one(
                LESSONS_TABLE,
                &[("id", format!("eq.{lesson_id}"))],
                "id,title,content",
            )
            .await?;
        record
            .map(LessonRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {lesson_id} not found")))
    }

    async fn get_assets_for_lesson(
        &self,
        lesson_id: &str,
    ) -> PortResult<Option<GeneratedAssetBundle>> {
        let record: Option<AssetRowRecord> = self
            .fetch_one(ASSETS_TABLE, &[("lesson_id", format!("eq.{lesson_id}"))], "*")
            .await?;
        Ok(record.map(AssetRowRecord::to_domain))
    }

    async fn upsert_assets(&self, bundle: NewAssetBundle) -> PortResult<GeneratedAssetBundle> {
        let body = AssetUpsertBody::from_domain(bundle, Utc::now());
        let record: AssetRowRecord = self.upsert_one(ASSETS_TABLE, &body, "lesson_id").await?;
        Ok(record.to_domain())
    }

    async fn save_quiz_attempt(&self, attempt: NewQuizAttempt) -> PortResult<QuizAttempt> {
        let body = AttemptInsertBody::from_domain(attempt, Utc::now());
        let record: QuizAttemptRecord = self.insert_one(ATTEMPTS_TABLE, &body).await?;
        Ok(record.to_domain())
    }
}
