use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::{EngineError, Result};
use crate::index::retriever::{Passage, Retriever};
use crate::index::vector_index::VectorIndex;
use crate::llm::condenser::QueryCondenser;
use crate::llm::generator::AnswerGenerator;
use crate::llm::memory::{ConversationMemory, Speaker, Turn};
use crate::providers::traits::{ChatProvider, UsageStats};

/// Everything a front end needs from one successful turn.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub answer: String,
    pub passages: Vec<Passage>,
    pub usage: UsageStats,
}

/// Orchestrates one session's turn-taking: condense, retrieve, generate,
/// then record both turns. Owns the session's memory and the active
/// provider; the host transport owns the engine instance itself (creation,
/// lookup, expiry).
///
/// Callers must serialize `respond` calls per engine instance; memory and
/// provider access inside a single call never holds a lock across an await.
pub struct ConversationEngine {
    session_id: Uuid,
    provider: RwLock<Arc<dyn ChatProvider>>,
    memory: Mutex<ConversationMemory>,
    condenser: QueryCondenser,
    retriever: Retriever,
    generator: AnswerGenerator,
    opening_message: String,
    history_window: usize,
}

impl ConversationEngine {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        index: Arc<VectorIndex>,
        config: &AgentConfig,
    ) -> Self {
        let session_id = Uuid::new_v4();
        log::info!(
            "session {} created (model {}, k {}, {} indexed passages)",
            session_id,
            provider.model(),
            config.top_k,
            index.len()
        );

        Self {
            session_id,
            provider: RwLock::new(provider),
            memory: Mutex::new(ConversationMemory::new()),
            condenser: QueryCondenser::new(),
            retriever: Retriever::new(index, config.top_k),
            generator: AnswerGenerator::new(),
            opening_message: config.opening_message.clone(),
            history_window: config.history_window,
        }
    }

    /// Reset the session and seed it with the opening assistant message.
    /// Idempotent: calling it again yields the same single-turn memory.
    pub fn start_conversation(&self) -> String {
        let mut memory = self.memory.lock();
        memory.clear();
        memory.append(Speaker::Assistant, self.opening_message.clone());
        self.opening_message.clone()
    }

    /// Run the full per-turn pipeline for `user_text`.
    ///
    /// Both turns are appended only after every step succeeded; a failed
    /// turn leaves the conversation history exactly as it was.
    pub async fn respond(&self, user_text: &str) -> Result<EngineResponse> {
        let message = user_text.trim();
        if message.is_empty() {
            return Err(EngineError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        // Snapshot the provider and the history window up front; a
        // concurrent model swap must not affect this turn.
        let provider = self.provider.read().clone();
        let history = self.memory.lock().recent(self.history_window);

        let query = self.condenser.condense(&provider, &history, message).await?;
        log::debug!("session {}: standalone query: {}", self.session_id, query);

        let passages = self.retriever.retrieve(&provider, &query).await?;

        let generation = self
            .generator
            .generate(&provider, &query, &passages, &history)
            .await?;

        let mut memory = self.memory.lock();
        memory.append(Speaker::User, message);
        memory.append(Speaker::Assistant, generation.answer.clone());

        Ok(EngineResponse {
            answer: generation.answer,
            passages,
            usage: generation.usage,
        })
    }

    /// Swap the generation backend for all subsequent turns.
    ///
    /// Validation failures leave the previous backend active; an in-flight
    /// `respond` keeps the snapshot it took and is unaffected either way.
    pub async fn change_model(&self, model: &str, temperature: f32) -> Result<()> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(EngineError::Validation(format!(
                "temperature must be within [0, 2], got {}",
                temperature
            )));
        }

        let current = self.provider.read().clone();
        let available = current.list_models().await?;
        if !available.iter().any(|candidate| candidate == model) {
            return Err(EngineError::Validation(format!(
                "unknown model: {}",
                model
            )));
        }

        let next = current.with_settings(model.to_string(), temperature);
        *self.provider.write() = next;
        log::info!(
            "session {}: switched to model {} (temperature {})",
            self.session_id,
            model,
            temperature
        );

        Ok(())
    }

    /// Discard the conversation; model configuration is untouched.
    pub fn clear_memory(&self) {
        self.memory.lock().clear();
    }

    pub async fn available_models(&self) -> Result<Vec<String>> {
        let provider = self.provider.read().clone();
        provider.list_models().await
    }

    pub fn history(&self) -> Vec<Turn> {
        self.memory.lock().history()
    }

    pub fn model(&self) -> String {
        self.provider.read().model()
    }

    pub fn temperature(&self) -> f32 {
        self.provider.read().temperature()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}
