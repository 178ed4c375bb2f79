//! services/api/src/ai/chat.rs
//!
//! Single-turn question answering scoped to one lesson. Stateless by
//! design: each call is a pure function of (lesson content, message), which
//! is what makes the responder trivially parallel-safe. The caller's UI
//! keeps whatever history it wants.

use std::sync::Arc;

use lessonlab_core::ports::{
    CompletionRequest, CompletionService, PortError, PortResult, StoreService,
};

/// The exact sentence the tutor must use for questions the lesson does not
/// cover. Clients match on it, so it is part of the contract.
pub const REFUSAL_SENTENCE: &str = "That is not covered in this lesson.";

/// Slightly higher than asset generation, for natural replies.
const CHAT_TEMPERATURE: f32 = 0.4;

const CHAT_SYSTEM_TEMPLATE: &str = r#"You are a university tutor helping a student understand one specific lesson.

RULES:
- Answer in the language of the lesson text, academic register.
- Use ONLY the provided lesson text.
- If the question is NOT covered by the lesson, reply exactly:
  "{refusal}"
- Do NOT invent information that is not in the text.
- Keep answers clear, concise and precise.

LESSON TEXT:
{lesson_content}"#;

/// Answers one student question against one lesson's content.
pub struct ChatService {
    store: Arc<dyn StoreService>,
    completions: Arc<dyn CompletionService>,
}

impl ChatService {
    pub fn new(store: Arc<dyn StoreService>, completions: Arc<dyn CompletionService>) -> Self {
        Self { store, completions }
    }

    /// Returns the tutor's trimmed reply, which may be the refusal sentence
    /// itself when the question falls outside the lesson.
    pub async fn answer(&self, lesson_id: &str, message: &str) -> PortResult<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PortError::InvalidInput("message is required".to_string()));
        }

        let lesson = self.store.get_lesson_by_id(lesson_id).await?;
        let system_prompt = CHAT_SYSTEM_TEMPLATE
            .replace("{refusal}", REFUSAL_SENTENCE)
            .replace("{lesson_content}", &lesson.context_text());

        let reply = self
            .completions
            .complete(CompletionRequest {
                system_prompt,
                user_prompt: message.to_string(),
                temperature: CHAT_TEMPERATURE,
                json_output: false,
            })
            .await?;

        Ok(reply.trim().to_string())
    }
}
