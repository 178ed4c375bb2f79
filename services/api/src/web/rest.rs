//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{extract::State, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;
use lessonlab_core::domain::{
    AuthUser, Flashcard, GeneratedAssetBundle, QuizAnswer, QuizAttempt, QuizItem,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_lesson_assets_handler,
        lesson_chat_handler,
        submit_quiz_handler,
    ),
    components(
        schemas(
            GenerateAssetsRequest,
            GeneratedAssetsResponse,
            FlashcardDto,
            QuizItemDto,
            ChatRequest,
            ChatResponse,
            SubmitQuizRequest,
            QuizAnswerDto,
            QuizAttemptResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "LessonLab AI API", description = "AI study-asset generation, lesson chat, and quiz grading.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request/Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateAssetsRequest {
    pub lesson_id: String,
    /// Skip the cache and regenerate even when a bundle already exists.
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardDto {
    question: String,
    answer: String,
}

impl FlashcardDto {
    fn from_domain(card: Flashcard) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizItemDto {
    question: String,
    choices: Vec<String>,
    correct: usize,
    explanation: String,
}

impl QuizItemDto {
    fn from_domain(item: QuizItem) -> Self {
        Self {
            question: item.question,
            choices: item.choices,
            correct: item.correct,
            explanation: item.explanation,
        }
    }
}

/// The stored bundle, exactly as the cache row holds it.
#[derive(Serialize, ToSchema)]
pub struct GeneratedAssetsResponse {
    lesson_id: String,
    summary: Option<String>,
    flashcards: Vec<FlashcardDto>,
    quiz: Vec<QuizItemDto>,
    generated_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GeneratedAssetsResponse {
    fn from_domain(bundle: GeneratedAssetBundle) -> Self {
        Self {
            lesson_id: bundle.lesson_id,
            summary: bundle.summary,
            flashcards: bundle
                .flashcards
                .into_iter()
                .map(FlashcardDto::from_domain)
                .collect(),
            quiz: bundle.quiz.into_iter().map(QuizItemDto::from_domain).collect(),
            generated_at: bundle.generated_at,
            updated_at: bundle.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub lesson_id: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    reply: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitQuizRequest {
    pub lesson_id: String,
    pub answers: Vec<QuizAnswerDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct QuizAnswerDto {
    question_index: usize,
    selected: usize,
}

impl QuizAnswerDto {
    fn to_domain(&self) -> QuizAnswer {
        QuizAnswer {
            question_index: self.question_index,
            selected: self.selected,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizAttemptResponse {
    id: Uuid,
    lesson_id: String,
    score: f64,
    completed_at: DateTime<Utc>,
}

impl QuizAttemptResponse {
    fn from_domain(attempt: QuizAttempt) -> Self {
        Self {
            id: attempt.id,
            lesson_id: attempt.lesson_id,
            score: attempt.score,
            completed_at: attempt.completed_at,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Return the cached study-asset bundle for a lesson, generating it first
/// when absent or when `force` is set.
#[utoipa::path(
    post,
    path = "/api/ai/generate-lesson-assets",
    request_body = GenerateAssetsRequest,
    responses(
        (status = 200, description = "The stored bundle", body = GeneratedAssetsResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "Lesson not found", body = ErrorBody),
        (status = 500, description = "Generation or persistence failed", body = ErrorBody)
    )
)]
pub async fn generate_lesson_assets_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateAssetsRequest>,
) -> Result<Json<GeneratedAssetsResponse>, ApiError> {
    let bundle = state.assets.get_or_generate(&req.lesson_id, req.force).await?;
    Ok(Json(GeneratedAssetsResponse::from_domain(bundle)))
}

/// Answer one question about one lesson, without server-side history.
#[utoipa::path(
    post,
    path = "/api/ai/lesson-chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The tutor's reply", body = ChatResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "Lesson not found", body = ErrorBody),
        (status = 500, description = "Completion failed", body = ErrorBody)
    )
)]
pub async fn lesson_chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state.chat.answer(&req.lesson_id, &req.message).await?;
    Ok(Json(ChatResponse { reply }))
}

/// Grade a submitted answer sheet against the lesson's cached quiz and
/// record the attempt for the calling user.
#[utoipa::path(
    post,
    path = "/api/ai/submit-quiz",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "The graded attempt", body = QuizAttemptResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "No quiz for the lesson", body = ErrorBody),
        (status = 500, description = "Persistence failed", body = ErrorBody)
    )
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Json<QuizAttemptResponse>, ApiError> {
    let answers = req.answers.iter().map(QuizAnswerDto::to_domain).collect();
    let attempt = state.quiz.submit(user.id, &req.lesson_id, answers).await?;
    Ok(Json(QuizAttemptResponse::from_domain(attempt)))
}
