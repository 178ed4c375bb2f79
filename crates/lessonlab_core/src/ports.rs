//! crates/lessonlab_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the row
//! store or the completion provider.

use async_trait::async_trait;

use crate::domain::{
    AuthUser, GeneratedAssetBundle, Lesson, NewAssetBundle, NewQuizAttempt, QuizAttempt,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// Every failure a service can surface maps onto one of these variants;
/// the gateway is the only place they are turned into HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("lesson has no content to process")]
    EmptyContent,
    #[error("generator error: {0}")]
    Generator(String),
    #[error("generator returned malformed output: {0}")]
    MalformedOutput(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Access to the remote row store.
///
/// Single-row reads return `Option` (an absent cache row is an outcome, not
/// an error); an absent lesson is a `NotFound` error because every caller
/// treats it as one. Upserts are atomic merge-or-insert keyed on the
/// bundle's `lesson_id`, delegated to the store's own conflict resolution.
#[async_trait]
pub trait StoreService: Send + Sync {
    async fn get_lesson_by_id(&self, lesson_id: &str) -> PortResult<Lesson>;

    async fn get_assets_for_lesson(
        &self,
        lesson_id: &str,
    ) -> PortResult<Option<GeneratedAssetBundle>>;

    /// Stores the bundle, replacing any previous bundle for the same
    /// lesson, and returns the row as persisted (canonical timestamps).
    async fn upsert_assets(&self, bundle: NewAssetBundle) -> PortResult<GeneratedAssetBundle>;

    /// Appends a graded attempt and returns it as persisted.
    async fn save_quiz_attempt(&self, attempt: NewQuizAttempt) -> PortResult<QuizAttempt>;
}

/// A single prompt/response exchange with the text-completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    /// Ask the provider to constrain its output to a JSON object.
    pub json_output: bool,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the raw completion text. No retries, no streaming; any
    /// provider failure surfaces as `PortError::Generator`.
    async fn complete(&self, request: CompletionRequest) -> PortResult<String>;
}

/// Delegated bearer-credential verification.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolves a bearer token to the caller it identifies, or
    /// `PortError::Unauthorized` when the provider rejects it.
    async fn verify_token(&self, token: &str) -> PortResult<AuthUser>;
}
