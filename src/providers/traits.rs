use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::llm::memory::Turn;

/// Token accounting for a single backend call.
///
/// Computed per call; the engine never accumulates these across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completed generation call: the model text plus its usage, captured
/// from the same response so accounting cannot race a model swap.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: UsageStats,
}

/// One chat-completion request: a system instruction, prior turns, and the
/// final user prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub history: Vec<Turn>,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn bare(prompt: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            history: Vec::new(),
            prompt: prompt.into(),
        }
    }
}

/// Capability boundary to the model/embedding backend.
///
/// Implementations are immutable snapshots of one (model, temperature)
/// configuration; a model swap builds a new provider via `with_settings`
/// and replaces the engine's Arc, so in-flight calls keep the old one.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one chat completion and return the text with its usage.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Embed text into a fixed-dimension vector for similarity search.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifiers currently offered by the backend.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Active chat model name.
    fn model(&self) -> String;

    /// Active sampling temperature.
    fn temperature(&self) -> f32;

    /// A new provider with the same credentials but different settings.
    fn with_settings(&self, model: String, temperature: f32) -> Arc<dyn ChatProvider>;
}
