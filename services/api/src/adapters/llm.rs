//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the text-completion provider.
//! It implements the `CompletionService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;

use lessonlab_core::ports::{CompletionRequest, CompletionService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible
/// LLM. One request, one response; failures propagate immediately with the
/// provider's message when it supplies one.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_prompt)
                .build()
                .map_err(|e| PortError::Generator(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_prompt)
                .build()
                .map_err(|e| PortError::Generator(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .n(1);
        if request.json_output {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let completion_request = builder
            .build()
            .map_err(|e| PortError::Generator(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which
        // respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(completion_request)
            .await
            .map_err(|e: OpenAIError| PortError::Generator(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Generator(
                    "completion response contained no text content".to_string(),
                ))
            }
        } else {
            Err(PortError::Generator(
                "completion returned no choices in its response".to_string(),
            ))
        }
    }
}
