use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One passage in the index artifact: the text, its provenance, and the
/// precomputed embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub content: String,
    pub source: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// On-disk artifact produced by the offline index build.
#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// A nearest-neighbor match, ordered by decreasing cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub content: String,
    pub source: String,
    pub score: f32,
}

/// In-memory vector index over the knowledge base, loaded once at startup
/// and read-only afterwards. Search is brute-force cosine similarity,
/// which is adequate for knowledge bases of this size.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Load the artifact from disk and validate it against the configured
    /// embedding dimension. Any mismatch is a fatal configuration error,
    /// not a retriable one.
    pub fn load(path: &Path, expected_dimension: usize) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!(
                "cannot read vector index artifact {}: {}",
                path.display(),
                e
            ))
        })?;

        let artifact: IndexArtifact = serde_json::from_str(&raw).map_err(|e| {
            EngineError::Configuration(format!(
                "malformed vector index artifact {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_entries(artifact.dimension, artifact.entries).and_then(|index| {
            if index.dimension != expected_dimension {
                return Err(EngineError::Configuration(format!(
                    "vector index dimension {} does not match configured embedding dimension {}",
                    index.dimension, expected_dimension
                )));
            }
            Ok(index)
        })
    }

    /// Build an index directly from entries; every embedding must have the
    /// declared dimension.
    pub fn from_entries(dimension: usize, entries: Vec<IndexEntry>) -> Result<Self> {
        for (position, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimension {
                return Err(EngineError::Configuration(format!(
                    "index entry {} has embedding dimension {} (expected {})",
                    position,
                    entry.embedding.len(),
                    dimension
                )));
            }
        }

        Ok(Self { dimension, entries })
    }

    /// The k nearest entries to `query` by cosine similarity, ordered by
    /// decreasing score. Equal scores keep their insertion order (the sort
    /// is stable), so repeated calls are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        if query.len() != self.dimension {
            return Err(EngineError::Configuration(format!(
                "query embedding dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<ScoredHit> = self
            .entries
            .iter()
            .map(|entry| ScoredHit {
                content: entry.content.clone(),
                source: entry.source.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity; 0.0 for zero-magnitude vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(content: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            content: content.to_string(),
            source: format!("https://example.org/{}", content),
            embedding,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn search_respects_k_limit() {
        let entries = (0..1000)
            .map(|i| entry(&format!("doc{}", i), vec![1.0, 0.0]))
            .collect();
        let index = VectorIndex::from_entries(2, entries).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn search_returns_all_when_index_smaller_than_k() {
        let entries = vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])];
        let index = VectorIndex::from_entries(2, entries).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        // Identical embeddings, so identical similarity scores.
        let entries = vec![
            entry("first", vec![1.0, 0.0]),
            entry("second", vec![1.0, 0.0]),
            entry("third", vec![1.0, 0.0]),
        ];
        let index = VectorIndex::from_entries(2, entries).unwrap();

        for _ in 0..5 {
            let hits = index.search(&[1.0, 0.0], 3).unwrap();
            assert_eq!(hits[0].content, "first");
            assert_eq!(hits[1].content, "second");
            assert_eq!(hits[2].content, "third");
        }
    }

    #[test]
    fn closer_entries_rank_higher() {
        let entries = vec![entry("far", vec![-1.0, 0.0]), entry("near", vec![1.0, 0.0])];
        let index = VectorIndex::from_entries(2, entries).unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].content, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn search_on_empty_index_is_empty() {
        let index = VectorIndex::from_entries(2, Vec::new()).unwrap();
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn entry_dimension_mismatch_is_configuration_error() {
        let result = VectorIndex::from_entries(3, vec![entry("bad", vec![1.0, 0.0])]);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn query_dimension_mismatch_is_configuration_error() {
        let index = VectorIndex::from_entries(2, vec![entry("a", vec![1.0, 0.0])]).unwrap();
        let result = index.search(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn load_missing_artifact_is_configuration_error() {
        let result = VectorIndex::load(Path::new("/nonexistent/index.json"), 2);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn load_round_trips_artifact_json() {
        let artifact = serde_json::json!({
            "dimension": 2,
            "entries": [
                {"content": "doc", "source": "https://example.org/doc", "embedding": [1.0, 0.0]}
            ]
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", artifact).unwrap();

        let index = VectorIndex::load(file.path(), 2).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), 2);
    }

    #[test]
    fn load_rejects_wrong_configured_dimension() {
        let artifact = serde_json::json!({
            "dimension": 2,
            "entries": []
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", artifact).unwrap();

        let result = VectorIndex::load(file.path(), 1536);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
