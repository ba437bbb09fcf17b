//! Deterministic in-process provider for tests: scripted completions,
//! hash-based embeddings, call counters, and failure injection.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{EngineError, Result};
use crate::providers::traits::{ChatProvider, Completion, CompletionRequest, UsageStats};

pub const STUB_DIMENSION: usize = 8;

#[derive(Default)]
struct StubInner {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    completion_calls: AtomicUsize,
    embedding_calls: AtomicUsize,
    fail_completions: AtomicBool,
    fail_embeddings: AtomicBool,
}

/// Scripted provider. When the response queue is empty, `complete` echoes
/// the full rendered request back, so tests can assert on what the backend
/// actually received.
#[derive(Clone)]
pub struct StubProvider {
    inner: Arc<StubInner>,
    model: String,
    temperature: f32,
    models: Vec<String>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StubInner::default()),
            model: "stub-model".to_string(),
            temperature: 0.7,
            models: vec!["stub-model".to_string(), "stub-model-large".to_string()],
        }
    }

    pub fn push_response(&self, text: &str) {
        self.inner.responses.lock().push_back(text.to_string());
    }

    pub fn fail_completions(&self, fail: bool) {
        self.inner.fail_completions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_embeddings(&self, fail: bool) {
        self.inner.fail_embeddings.store(fail, Ordering::SeqCst);
    }

    pub fn completion_calls(&self) -> usize {
        self.inner.completion_calls.load(Ordering::SeqCst)
    }

    pub fn embedding_calls(&self) -> usize {
        self.inner.embedding_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.inner.requests.lock().clone()
    }

    /// Deterministic unit vector derived from a hash of the text, so
    /// identical inputs embed identically without a real model.
    pub fn hash_embedding(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(STUB_DIMENSION);
        for i in 0..STUB_DIMENSION {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }

    fn render(request: &CompletionRequest) -> String {
        let mut rendered = String::new();
        rendered.push_str(&request.system);
        for turn in &request.history {
            rendered.push('\n');
            rendered.push_str(&format!("{}: {}", turn.speaker.as_str(), turn.text));
        }
        rendered.push('\n');
        rendered.push_str(&request.prompt);
        rendered
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.inner.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().push(request.clone());

        if self.inner.fail_completions.load(Ordering::SeqCst) {
            return Err(EngineError::GenerationFailure(
                "stub completion failure".to_string(),
            ));
        }

        let text = self
            .inner
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Self::render(&request));

        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        let completion_tokens = text.split_whitespace().count() as u32;

        Ok(Completion {
            text,
            usage: UsageStats {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embedding_calls.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_embeddings.load(Ordering::SeqCst) {
            return Err(EngineError::RetrievalUnavailable(
                "stub embedding failure".to_string(),
            ));
        }

        Ok(Self::hash_embedding(text))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.models.clone())
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
