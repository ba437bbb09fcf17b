use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs, EmbeddingInput, Role,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::config::AgentConfig;
use crate::error::{EngineError, Result};
use crate::llm::memory::Speaker;
use crate::providers::traits::{ChatProvider, Completion, CompletionRequest, UsageStats};

/// OpenAI-backed chat and embedding provider.
///
/// Each instance is pinned to one (model, temperature) pair; `with_settings`
/// produces a reconfigured copy sharing the same client credentials.
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    embedding_model: String,
    call_timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base.clone());
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            embedding_model: config.embedding_model.clone(),
            call_timeout: config.request_timeout,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if !request.system.is_empty() {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    role: Role::System,
                    content: request.system.clone(),
                    name: None,
                },
            ));
        }

        for turn in &request.history {
            match turn.speaker {
                Speaker::User => messages.push(ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        role: Role::User,
                        content: ChatCompletionRequestUserMessageContent::Text(turn.text.clone()),
                        name: None,
                    },
                )),
                Speaker::Assistant => messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.text.clone())
                        .build()
                        .map_err(|e| EngineError::GenerationFailure(e.to_string()))?
                        .into(),
                ),
            }
        }

        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                role: Role::User,
                content: ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
                name: None,
            },
        ));

        let api_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages(messages)
            .build()
            .map_err(|e| EngineError::GenerationFailure(e.to_string()))?;

        let response = timeout(self.call_timeout, self.client.chat().create(api_request))
            .await
            .map_err(|_| {
                EngineError::GenerationFailure(format!(
                    "chat completion timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| EngineError::GenerationFailure(e.to_string()))?;

        let usage = response
            .usage
            .map(|u| UsageStats {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| EngineError::GenerationFailure("no response content".to_string()))?;

        Ok(Completion { text, usage })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| EngineError::RetrievalUnavailable(e.to_string()))?;

        let response = timeout(self.call_timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                EngineError::RetrievalUnavailable(format!(
                    "embedding call timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| EngineError::RetrievalUnavailable(e.to_string()))?;

        response
            .data
            .first()
            .map(|embedding| embedding.embedding.clone())
            .ok_or_else(|| EngineError::RetrievalUnavailable("no embedding returned".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = timeout(self.call_timeout, self.client.models().list())
            .await
            .map_err(|_| {
                EngineError::GenerationFailure(format!(
                    "model listing timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| EngineError::GenerationFailure(e.to_string()))?;

        let mut models: Vec<String> = response
            .data
            .into_iter()
            .map(|model| model.id)
            .filter(|id| id.starts_with("gpt"))
            .collect();
        models.sort();

        Ok(models)
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn with_settings(&self, model: String, temperature: f32) -> Arc<dyn ChatProvider> {
        let mut provider = self.clone();
        provider.model = model;
        provider.temperature = temperature;
        Arc::new(provider)
    }
}
