use std::sync::Arc;

use crate::error::Result;
use crate::index::retriever::{format_passages, Passage};
use crate::llm::memory::Turn;
use crate::providers::traits::{ChatProvider, CompletionRequest, UsageStats};

/// Persona and grounding rules for every answer. The model must ask for
/// clarification on ambiguous questions, decline and redirect when the
/// retrieved context is insufficient, and keep answers short and scannable.
const SYSTEM_INSTRUCTION: &str = "\
You are a knowledgeable and helpful assistant for an employment benefits agency. \
You answer questions about benefits, allowances, and labour market services clearly and concisely. \
Because the agency offers several kinds of benefits, always check that you have enough \
information before answering. If the question is unclear, or it is not clear which benefit or \
situation the client means, ask a short clarifying question instead of guessing. \
Only answer from the information provided to you; if it does not contain the answer, say so \
honestly and refer the user to the official website or customer service. \
Keep every answer short and structured so it fits in a chat window. Use bullet points \
(- or \u{2022}) to present information. Always print URLs in bold.";

/// The generator's output: the answer text plus the usage captured from
/// the same backend response.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub answer: String,
    pub usage: UsageStats,
}

/// Produces a grounded answer from the condensed query, the retrieved
/// passages, and the conversation so far.
pub struct AnswerGenerator {
    system_instruction: String,
}

impl AnswerGenerator {
    pub fn new() -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub async fn generate(
        &self,
        provider: &Arc<dyn ChatProvider>,
        question: &str,
        passages: &[Passage],
        history: &[Turn],
    ) -> Result<GenerationResult> {
        let system = format!(
            "{}\n\nUse the following information to answer the question:\n{}",
            self.system_instruction,
            format_passages(passages)
        );

        let completion = provider
            .complete(CompletionRequest {
                system,
                history: history.to_vec(),
                prompt: question.to_string(),
            })
            .await?;

        Ok(GenerationResult {
            answer: completion.text,
            usage: completion.usage,
        })
    }
}

impl Default for AnswerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::memory::{Speaker, Turn};
    use crate::providers::stub::StubProvider;

    fn passage(content: &str, source: &str, rank: usize) -> Passage {
        Passage {
            content: content.to_string(),
            source: source.to_string(),
            rank,
        }
    }

    #[tokio::test]
    async fn request_carries_context_history_and_question() {
        let stub = StubProvider::new();
        stub.push_response("- You can apply online.");
        let provider: Arc<dyn ChatProvider> = Arc::new(stub.clone());
        let generator = AnswerGenerator::new();

        let passages = vec![passage(
            "Applications are submitted through the online portal.",
            "https://example.org/apply",
            1,
        )];
        let history = vec![
            Turn::new(Speaker::User, "I lost my job last week"),
            Turn::new(Speaker::Assistant, "Sorry to hear that."),
        ];

        let result = generator
            .generate(&provider, "How do I apply for benefits?", &passages, &history)
            .await
            .unwrap();

        assert_eq!(result.answer, "- You can apply online.");
        assert!(result.usage.total_tokens > 0);

        let request = &stub.requests()[0];
        assert!(request.system.contains("online portal"));
        assert!(request.system.contains("https://example.org/apply"));
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.prompt, "How do I apply for benefits?");
    }

    #[tokio::test]
    async fn usage_comes_from_the_same_call() {
        let stub = StubProvider::new();
        stub.push_response("one two three");
        let provider: Arc<dyn ChatProvider> = Arc::new(stub.clone());
        let generator = AnswerGenerator::new();

        let result = generator
            .generate(&provider, "four words in here", &[], &[])
            .await
            .unwrap();

        assert_eq!(result.usage.completion_tokens, 3);
        assert_eq!(result.usage.prompt_tokens, 4);
        assert_eq!(result.usage.total_tokens, 7);
    }
}
