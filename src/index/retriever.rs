use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::index::vector_index::VectorIndex;
use crate::providers::traits::ChatProvider;

/// A retrieved unit of source text plus its provenance. Produced per query,
/// never persisted beyond the turn's response.
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    pub content: String,
    pub source: String,
    pub rank: usize,
}

/// Wraps the vector index with the fixed top-k policy.
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    /// Embed `query` and return the top-k passages, best first.
    ///
    /// An embedding failure surfaces as `RetrievalUnavailable`; there is
    /// no fallback path, so no answer is ever produced without sources.
    pub async fn retrieve(
        &self,
        provider: &Arc<dyn ChatProvider>,
        query: &str,
    ) -> Result<Vec<Passage>> {
        let embedding = provider.embed(query).await?;
        let hits = self.index.search(&embedding, self.top_k)?;

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(position, hit)| Passage {
                content: hit.content,
                source: hit.source,
                rank: position + 1,
            })
            .collect())
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// Numbered context block handed to the answer generator.
pub fn format_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|passage| format!("{}. {} (Source: {})", passage.rank, passage.content, passage.source))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::index::vector_index::IndexEntry;
    use crate::providers::stub::{StubProvider, STUB_DIMENSION};
    use std::collections::HashMap;

    fn index_with(texts: &[&str]) -> Arc<VectorIndex> {
        let entries = texts
            .iter()
            .map(|text| IndexEntry {
                content: text.to_string(),
                source: format!("https://example.org/{}", text.replace(' ', "-")),
                embedding: StubProvider::hash_embedding(text),
                metadata: HashMap::new(),
            })
            .collect();
        Arc::new(VectorIndex::from_entries(STUB_DIMENSION, entries).unwrap())
    }

    #[tokio::test]
    async fn retrieve_ranks_exact_match_first() {
        let stub = StubProvider::new();
        let provider: Arc<dyn ChatProvider> = Arc::new(stub);
        let retriever = Retriever::new(
            index_with(&["benefit application", "holiday allowance", "sick leave"]),
            3,
        );

        let passages = retriever
            .retrieve(&provider, "benefit application")
            .await
            .unwrap();

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].content, "benefit application");
        assert_eq!(passages[0].rank, 1);
        assert_eq!(passages[2].rank, 3);
    }

    #[tokio::test]
    async fn retrieve_is_bounded_by_top_k() {
        let stub = StubProvider::new();
        let provider: Arc<dyn ChatProvider> = Arc::new(stub);
        let retriever = Retriever::new(index_with(&["a", "b", "c", "d", "e"]), 2);

        let passages = retriever.retrieve(&provider, "a").await.unwrap();
        assert_eq!(passages.len(), 2);
    }

    #[tokio::test]
    async fn embedding_failure_is_retrieval_unavailable() {
        let stub = StubProvider::new();
        stub.fail_embeddings(true);
        let provider: Arc<dyn ChatProvider> = Arc::new(stub);
        let retriever = Retriever::new(index_with(&["a"]), 3);

        let result = retriever.retrieve(&provider, "a").await;
        assert!(matches!(result, Err(EngineError::RetrievalUnavailable(_))));
    }

    #[test]
    fn format_lists_rank_content_and_source() {
        let passages = vec![
            Passage {
                content: "First passage".to_string(),
                source: "https://example.org/1".to_string(),
                rank: 1,
            },
            Passage {
                content: "Second passage".to_string(),
                source: "https://example.org/2".to_string(),
                rank: 2,
            },
        ];

        let formatted = format_passages(&passages);
        assert_eq!(
            formatted,
            "1. First passage (Source: https://example.org/1)\n\
             2. Second passage (Source: https://example.org/2)"
        );
    }
}
