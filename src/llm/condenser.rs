use std::sync::Arc;

use crate::error::Result;
use crate::llm::memory::{render_transcript, Turn};
use crate::providers::traits::{ChatProvider, CompletionRequest};

/// Rewrites a context-dependent follow-up question into a standalone
/// search query, resolving pronouns and ellipsis against prior turns.
pub struct QueryCondenser;

impl QueryCondenser {
    pub fn new() -> Self {
        Self
    }

    /// Produce a self-contained query for `question`.
    ///
    /// With no history there is nothing to resolve, so the question is
    /// returned as-is without a backend call. A backend failure always
    /// propagates; the raw question is never substituted for the rewrite.
    pub async fn condense(
        &self,
        provider: &Arc<dyn ChatProvider>,
        history: &[Turn],
        question: &str,
    ) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = format!(
            "Given the following conversation and a follow up question, rephrase the \
             follow up question to be a standalone question.\n\n\
             Chat history:\n{}\n\n\
             Follow up question: {}\n\n\
             Standalone question:",
            render_transcript(history),
            question
        );

        let completion = provider.complete(CompletionRequest::bare(prompt)).await?;

        Ok(completion.text.trim().to_string())
    }
}

impl Default for QueryCondenser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::llm::memory::{ConversationMemory, Speaker};
    use crate::providers::stub::StubProvider;

    fn provider_pair() -> (StubProvider, Arc<dyn ChatProvider>) {
        let stub = StubProvider::new();
        let provider: Arc<dyn ChatProvider> = Arc::new(stub.clone());
        (stub, provider)
    }

    #[tokio::test]
    async fn empty_history_passes_through_without_backend_call() {
        let (stub, provider) = provider_pair();
        let condenser = QueryCondenser::new();

        let query = condenser
            .condense(&provider, &[], "What is a WW benefit?")
            .await
            .unwrap();

        assert_eq!(query, "What is a WW benefit?");
        assert_eq!(stub.completion_calls(), 0);
    }

    #[tokio::test]
    async fn history_is_embedded_in_the_rephrase_prompt() {
        let (stub, provider) = provider_pair();
        stub.push_response("What city does the user live in?");
        let condenser = QueryCondenser::new();

        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "I live in Amsterdam");
        memory.append(Speaker::Assistant, "Noted!");

        let query = condenser
            .condense(&provider, &memory.history(), "What city did I mention?")
            .await
            .unwrap();

        assert_eq!(query, "What city does the user live in?");
        assert_eq!(stub.completion_calls(), 1);

        let requests = stub.requests();
        assert!(requests[0].prompt.contains("I live in Amsterdam"));
        assert!(requests[0].prompt.contains("What city did I mention?"));
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let (stub, provider) = provider_pair();
        stub.fail_completions(true);
        let condenser = QueryCondenser::new();

        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "hello");

        let result = condenser
            .condense(&provider, &memory.history(), "and then?")
            .await;

        assert!(matches!(result, Err(EngineError::GenerationFailure(_))));
    }
}
