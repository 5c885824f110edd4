//! Context selection and budgeting.

use super::index::VectorIndex;
use super::intent::QueryIntent;
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use thiserror::Error;

/// Separator placed between chunks in an assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Errors raised while retrieving context for a question.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Similarity search needs a question to embed.
    #[error("Question is required.")]
    EmptyQuestion,
    /// Embedding provider failed to return vectors for the question.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the question")]
    EmptyEmbedding,
    /// Question vector length differs from the indexed vectors.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the indexed vectors.
        expected: usize,
        /// Dimension of the question vector.
        actual: usize,
    },
}

/// How an intent reads the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalPlan {
    /// No retrieval at all.
    Skip,
    /// Insertion-order read of up to `limit` chunks.
    All {
        /// Maximum chunks returned.
        limit: usize,
    },
    /// Nearest-neighbour search for the question.
    Similar {
        /// Neighbours returned.
        top_k: usize,
    },
}

/// Chooses and bounds the chunks that reach the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    /// Chunks read for verbatim questions.
    pub verbatim_limit: usize,
    /// Chunks read for whole-document questions.
    pub summary_limit: usize,
    /// Neighbours retrieved for standard questions.
    pub top_k: usize,
    /// Character budget for the joined context.
    pub max_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            verbatim_limit: 80,
            summary_limit: 50,
            top_k: 8,
            max_chars: 12_000,
        }
    }
}

impl ContextAssembler {
    /// Retrieval strategy for `intent`.
    pub fn plan(&self, intent: QueryIntent) -> RetrievalPlan {
        match intent {
            QueryIntent::Meta => RetrievalPlan::Skip,
            QueryIntent::Verbatim => RetrievalPlan::All {
                limit: self.verbatim_limit,
            },
            QueryIntent::GlobalSummary => RetrievalPlan::All {
                limit: self.summary_limit,
            },
            QueryIntent::Standard(_) => RetrievalPlan::Similar { top_k: self.top_k },
        }
    }

    /// Retrieve the chunk sequence for `intent` from one snapshot of `index`.
    pub async fn assemble(
        &self,
        intent: QueryIntent,
        question: &str,
        index: &VectorIndex,
        embedder: &(dyn EmbeddingClient + Send + Sync),
    ) -> Result<Vec<String>, RetrievalError> {
        let epoch = index.snapshot();
        let plan = self.plan(intent);
        tracing::debug!(%intent, ?plan, epoch = %epoch.id(), records = epoch.len(), "Retrieving context");

        match plan {
            RetrievalPlan::Skip => Ok(Vec::new()),
            RetrievalPlan::All { limit } => Ok(epoch.search_all(limit)),
            RetrievalPlan::Similar { top_k } => {
                let question = question.trim();
                if question.is_empty() {
                    return Err(RetrievalError::EmptyQuestion);
                }
                if epoch.is_empty() {
                    return Ok(Vec::new());
                }
                let vector = embedder
                    .generate_embeddings(vec![question.to_string()])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(RetrievalError::EmptyEmbedding)?;
                if let Some(expected) = epoch.dimension()
                    && expected != vector.len()
                {
                    return Err(RetrievalError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Ok(epoch.search(&vector, top_k, index.metric()))
            }
        }
    }

    /// Join `chunks` within this assembler's character budget.
    pub fn limit(&self, chunks: &[String]) -> BoundedContext {
        limit_context(chunks, self.max_chars)
    }
}

/// Context joined within a character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedContext {
    /// Chunks joined by [`CONTEXT_SEPARATOR`].
    pub text: String,
    /// Number of chunks included.
    pub included: usize,
}

impl BoundedContext {
    /// Whether no chunk fit in the budget.
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }
}

/// Join chunks in order until the next one would push the chunk character total past
/// `max_chars`.
///
/// Only chunk characters count toward the budget, not separators. Chunks are never split, and
/// an oversized first chunk produces an empty context.
pub fn limit_context(chunks: &[String], max_chars: usize) -> BoundedContext {
    let mut total = 0usize;
    let mut collected: Vec<&str> = Vec::new();

    for chunk in chunks {
        let length = chunk.chars().count();
        if total + length > max_chars {
            break;
        }
        collected.push(chunk);
        total += length;
    }

    BoundedContext {
        included: collected.len(),
        text: collected.join(CONTEXT_SEPARATOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;
    use crate::processing::Chunk;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        inner: HashEmbeddingClient,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                inner: HashEmbeddingClient::new(dimension),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate_embeddings(texts).await
        }
    }

    async fn index_with(texts: &[&str], embedder: &CountingEmbedder) -> VectorIndex {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                text: (*text).to_string(),
            })
            .collect();
        let vectors = embedder
            .inner
            .generate_embeddings(chunks.iter().map(|c| c.text.clone()).collect())
            .await
            .expect("vectors");
        let index = VectorIndex::default();
        index.replace(chunks, vectors, None).expect("epoch");
        index
    }

    #[test]
    fn limit_context_keeps_whole_chunks_within_budget() {
        let chunks = vec!["A".repeat(5000), "B".repeat(5000), "C".repeat(5000)];
        let context = limit_context(&chunks, 12_000);
        assert_eq!(context.included, 2);
        assert_eq!(
            context.text,
            format!("{}{}{}", "A".repeat(5000), CONTEXT_SEPARATOR, "B".repeat(5000))
        );
        assert!(!context.text.contains('C'));
    }

    #[test]
    fn limit_context_excludes_oversized_first_chunk() {
        let chunks = vec!["x".repeat(20), "y".repeat(2)];
        let context = limit_context(&chunks, 10);
        assert!(context.is_empty());
        assert_eq!(context.text, "");
    }

    #[test]
    fn limit_context_stops_at_first_overflow() {
        let chunks = vec!["aaaa".to_string(), "bbbbbbbb".to_string(), "cc".to_string()];
        let context = limit_context(&chunks, 7);
        assert_eq!(context.text, "aaaa");
        assert_eq!(context.included, 1);
    }

    #[test]
    fn limit_context_bound_includes_only_separator_overhead() {
        let chunks: Vec<String> = (0..40).map(|i| "z".repeat(100 + i * 7)).collect();
        for budget in [0, 99, 500, 1_234, 12_000] {
            let context = limit_context(&chunks, budget);
            let overhead = context.included.saturating_sub(1) * CONTEXT_SEPARATOR.len();
            assert!(context.text.chars().count() <= budget + overhead);
        }
    }

    #[test]
    fn plan_follows_intent() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.plan(QueryIntent::Meta), RetrievalPlan::Skip);
        assert_eq!(
            assembler.plan(QueryIntent::Verbatim),
            RetrievalPlan::All { limit: 80 }
        );
        assert_eq!(
            assembler.plan(QueryIntent::GlobalSummary),
            RetrievalPlan::All { limit: 50 }
        );
        assert_eq!(
            assembler.plan(QueryIntent::Standard(crate::retrieval::Mode::Bullets)),
            RetrievalPlan::Similar { top_k: 8 }
        );
    }

    #[tokio::test]
    async fn verbatim_reads_in_insertion_order_without_embedding() {
        let embedder = CountingEmbedder::new(16);
        let index = index_with(&["first page", "second page", "third page"], &embedder).await;
        let assembler = ContextAssembler {
            verbatim_limit: 2,
            ..ContextAssembler::default()
        };

        let chunks = assembler
            .assemble(QueryIntent::Verbatim, "exact text", &index, &embedder)
            .await
            .expect("chunks");

        assert_eq!(chunks, vec!["first page", "second page"]);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn standard_intent_embeds_the_question_once() {
        let embedder = CountingEmbedder::new(64);
        let index = index_with(
            &["the mitochondria is the powerhouse", "semester fees are due"],
            &embedder,
        )
        .await;

        let chunks = ContextAssembler::default()
            .assemble(
                QueryIntent::Standard(crate::retrieval::Mode::Qa),
                "semester fees are due",
                &index,
                &embedder,
            )
            .await
            .expect("chunks");

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "semester fees are due");
    }

    #[tokio::test]
    async fn empty_index_short_circuits_before_embedding() {
        let embedder = CountingEmbedder::new(8);
        let index = VectorIndex::default();
        let chunks = ContextAssembler::default()
            .assemble(
                QueryIntent::Standard(crate::retrieval::Mode::Qa),
                "what is X",
                &index,
                &embedder,
            )
            .await
            .expect("chunks");
        assert!(chunks.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_question_is_rejected_for_similarity_search() {
        let embedder = CountingEmbedder::new(8);
        let index = VectorIndex::default();
        let error = ContextAssembler::default()
            .assemble(
                QueryIntent::Standard(crate::retrieval::Mode::Qa),
                "   ",
                &index,
                &embedder,
            )
            .await
            .expect_err("blank question");
        assert!(matches!(error, RetrievalError::EmptyQuestion));
    }

    #[tokio::test]
    async fn question_vector_dimension_must_match_index() {
        let embedder = CountingEmbedder::new(8);
        let index = index_with(&["alpha"], &CountingEmbedder::new(4)).await;
        let error = ContextAssembler::default()
            .assemble(
                QueryIntent::Standard(crate::retrieval::Mode::Qa),
                "alpha",
                &index,
                &embedder,
            )
            .await
            .expect_err("dimension mismatch");
        assert!(matches!(
            error,
            RetrievalError::DimensionMismatch { expected: 4, actual: 8 }
        ));
    }
}
