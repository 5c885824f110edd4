//! In-memory vector index holding exactly one document epoch at a time.
//!
//! The live epoch sits behind an [`ArcSwap`]. Readers take a lock-free `Arc` snapshot, so a
//! question keeps reading the epoch it started with. Writers build a complete replacement epoch
//! first and publish it with a single pointer swap; a failed validation never touches the live
//! epoch.

use crate::config::DistanceMetric;
use crate::processing::Chunk;
use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Errors raised while populating the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Chunk and vector counts differ, or vectors disagree on length.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Chunk paired with its embedding.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Identifier unique within the epoch (`doc_{position}`).
    pub id: String,
    /// Source chunk.
    pub chunk: Chunk,
    /// Embedding produced for the chunk text.
    pub vector: Vec<f32>,
}

impl VectorRecord {
    fn new(position: usize, chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: format!("doc_{position}"),
            chunk,
            vector,
        }
    }
}

/// Provenance of an uploaded epoch.
#[derive(Debug, Clone, Serialize)]
pub struct EpochSource {
    /// Name the upload was stored under.
    pub filename: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub sha256: String,
}

/// Complete record set for the currently loaded document.
#[derive(Debug)]
pub struct Epoch {
    id: Uuid,
    created_at: OffsetDateTime,
    source: Option<EpochSource>,
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

impl Epoch {
    fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            source: None,
            dimension: None,
            records: Vec::new(),
        }
    }

    /// Identifier assigned when the epoch was created.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of records in the epoch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the epoch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Vector length shared by every record, once the first record arrives.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Upload provenance, if the epoch came from an upload.
    pub fn source(&self) -> Option<&EpochSource> {
        self.source.as_ref()
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Up to `top_k` chunk texts nearest to `query_vector`, nearest first.
    ///
    /// Ties keep insertion order. A query whose length differs from the epoch dimension matches
    /// nothing.
    pub fn search(&self, query_vector: &[f32], top_k: usize, metric: DistanceMetric) -> Vec<String> {
        if top_k == 0 || self.records.is_empty() {
            return Vec::new();
        }
        if self.dimension != Some(query_vector.len()) {
            tracing::warn!(
                expected = ?self.dimension,
                actual = query_vector.len(),
                "Query vector length does not match index dimension"
            );
            return Vec::new();
        }

        let mut scored: Vec<(f32, &VectorRecord)> = self
            .records
            .iter()
            .map(|record| (distance(metric, query_vector, &record.vector), record))
            .collect();
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, record)| record.chunk.text.clone())
            .collect()
    }

    /// Up to `limit` chunk texts in insertion order, skipping whitespace-only chunks.
    pub fn search_all(&self, limit: usize) -> Vec<String> {
        self.records
            .iter()
            .map(|record| &record.chunk.text)
            .filter(|text| !text.trim().is_empty())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Copy of this epoch with `chunks` appended after the existing records.
    fn extended(&self, chunks: &[Chunk], vectors: &[Vec<f32>], dimension: Option<usize>) -> Self {
        let offset = self.records.len();
        let mut records = Vec::with_capacity(offset + chunks.len());
        records.extend_from_slice(&self.records);
        records.extend(chunks.iter().zip(vectors).enumerate().map(|(i, (chunk, vector))| {
            VectorRecord::new(offset + i, chunk.clone(), vector.clone())
        }));
        Self {
            id: self.id,
            created_at: self.created_at,
            source: self.source.clone(),
            dimension: dimension.or(self.dimension),
            records,
        }
    }

    fn status(&self) -> IndexStatus {
        IndexStatus {
            epoch_id: self.id.to_string(),
            records: self.records.len(),
            dimension: self.dimension,
            source: self.source.as_ref().map(|source| source.filename.clone()),
            created_at: self
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.created_at.unix_timestamp().to_string()),
        }
    }
}

/// Lightweight view of the loaded document.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// Identifier of the live epoch.
    pub epoch_id: String,
    /// Records in the live epoch.
    pub records: usize,
    /// Vector length shared by the records, once known.
    pub dimension: Option<usize>,
    /// Filename of the loaded document, if any.
    pub source: Option<String>,
    /// RFC3339 creation time of the live epoch.
    pub created_at: String,
}

/// Shared handle to the index owned by the serving component.
pub type IndexHandle = Arc<VectorIndex>;

/// Single-document vector index with atomic epoch replacement.
#[derive(Debug)]
pub struct VectorIndex {
    metric: DistanceMetric,
    current: ArcSwap<Epoch>,
}

impl VectorIndex {
    /// Create an index with an empty epoch.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            current: ArcSwap::from_pointee(Epoch::empty()),
        }
    }

    /// Distance used for similarity search.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Clone a handle to the live epoch.
    pub fn snapshot(&self) -> Arc<Epoch> {
        self.current.load_full()
    }

    /// Append records to the live epoch.
    ///
    /// The extended epoch is published as a whole, so readers see either all or none of the new
    /// records. New ids continue after the existing records. Returns the number of records
    /// appended.
    pub fn add(&self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<usize, IndexError> {
        let mut outcome = Ok(0);
        let previous = self.current.rcu(|current| {
            match validate_batch(&chunks, &vectors, current.dimension) {
                Ok(dimension) => {
                    outcome = Ok(chunks.len());
                    Arc::new(current.extended(&chunks, &vectors, dimension))
                }
                Err(error) => {
                    outcome = Err(error);
                    Arc::clone(current)
                }
            }
        });
        let appended = outcome?;
        tracing::debug!(
            epoch = %previous.id,
            appended,
            total = previous.len() + appended,
            "Appended records"
        );
        Ok(appended)
    }

    /// Build a fresh epoch from `chunks`/`vectors` and publish it in place of the live one.
    ///
    /// On error the live epoch is left untouched.
    pub fn replace(
        &self,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        source: Option<EpochSource>,
    ) -> Result<Arc<Epoch>, IndexError> {
        let dimension = validate_batch(&chunks, &vectors, None)?;
        let records = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(position, (chunk, vector))| VectorRecord::new(position, chunk, vector))
            .collect();
        let epoch = Arc::new(Epoch {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            source,
            dimension,
            records,
        });

        let previous = self.current.swap(Arc::clone(&epoch));
        tracing::info!(
            previous = %previous.id,
            epoch = %epoch.id,
            records = epoch.len(),
            "Published new index epoch"
        );
        Ok(epoch)
    }

    /// Drop the live epoch and start an empty one. Safe on an empty index.
    pub fn reset(&self) -> Uuid {
        let epoch = Arc::new(Epoch::empty());
        let id = epoch.id;
        let previous = self.current.swap(epoch);
        tracing::info!(previous = %previous.id, epoch = %id, "Index reset");
        id
    }

    /// Nearest `top_k` chunk texts for `query_vector` in the live epoch.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Vec<String> {
        self.snapshot().search(query_vector, top_k, self.metric)
    }

    /// Up to `limit` non-blank chunk texts in insertion order.
    pub fn search_all(&self, limit: usize) -> Vec<String> {
        self.snapshot().search_all(limit)
    }

    /// Summary of the live epoch.
    pub fn status(&self) -> IndexStatus {
        self.snapshot().status()
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

/// Check counts and vector lengths; returns the batch dimension when the batch is non-empty.
fn validate_batch(
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    existing: Option<usize>,
) -> Result<Option<usize>, IndexError> {
    if chunks.len() != vectors.len() {
        return Err(IndexError::DimensionMismatch(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )));
    }

    let Some(first) = vectors.first() else {
        return Ok(None);
    };
    let dimension = existing.unwrap_or(first.len());
    if dimension == 0 {
        return Err(IndexError::DimensionMismatch(
            "vectors must not be empty".into(),
        ));
    }
    if let Some((position, vector)) = vectors
        .iter()
        .enumerate()
        .find(|(_, vector)| vector.len() != dimension)
    {
        return Err(IndexError::DimensionMismatch(format!(
            "vector {position} has length {}, expected {dimension}",
            vector.len()
        )));
    }
    Ok(Some(dimension))
}

fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        DistanceMetric::L2 => a
            .iter()
            .zip(b)
            .map(|(x, y)| {
                let delta = f64::from(*x) - f64::from(*y);
                delta * delta
            })
            .sum::<f64>()
            .sqrt() as f32,
    }
}

/// Cosine similarity in `[-1, 1]`; 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                text: (*text).to_string(),
            })
            .collect()
    }

    fn populated() -> VectorIndex {
        let index = VectorIndex::default();
        index
            .replace(
                chunks(&["north", "east", "south", "north-east"]),
                vec![
                    vec![0.0, 1.0],
                    vec![1.0, 0.0],
                    vec![0.0, -1.0],
                    vec![0.7, 0.7],
                ],
                None,
            )
            .expect("valid epoch");
        index
    }

    #[test]
    fn fresh_index_behaves_as_empty_epoch() {
        let index = VectorIndex::default();
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
        assert!(index.search_all(10).is_empty());
        assert_eq!(index.status().records, 0);
    }

    #[test]
    fn search_orders_nearest_first_and_caps_results() {
        let index = populated();
        assert_eq!(index.search(&[0.1, 1.0], 2), vec!["north", "north-east"]);
        assert_eq!(index.search(&[1.0, 0.0], 10).len(), 4);
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn l2_metric_ranks_by_euclidean_distance() {
        let index = VectorIndex::new(DistanceMetric::L2);
        index
            .replace(
                chunks(&["far", "near"]),
                vec![vec![10.0, 10.0], vec![1.0, 1.0]],
                None,
            )
            .expect("valid epoch");
        assert_eq!(index.search(&[0.0, 0.0], 1), vec!["near"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::default();
        index
            .replace(
                chunks(&["first", "second", "third"]),
                vec![vec![1.0, 0.0]; 3],
                None,
            )
            .expect("valid epoch");
        assert_eq!(
            index.search(&[1.0, 0.0], 3),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn search_all_returns_insertion_order_without_blanks() {
        let index = VectorIndex::default();
        index
            .add(
                chunks(&["alpha", "   ", "beta", "\n", "gamma"]),
                vec![vec![1.0]; 5],
            )
            .expect("valid batch");
        assert_eq!(index.search_all(10), vec!["alpha", "beta", "gamma"]);
        assert_eq!(index.search_all(2), vec!["alpha", "beta"]);
    }

    #[test]
    fn reset_empties_the_index_and_is_idempotent() {
        let index = populated();
        let first = index.reset();
        let second = index.reset();
        assert_ne!(first, second);
        for limit in [0, 1, 100] {
            assert!(index.search_all(limit).is_empty());
        }
        assert!(index.search(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn add_rejects_count_mismatch() {
        let index = VectorIndex::default();
        let error = index
            .add(chunks(&["a", "b"]), vec![vec![1.0]])
            .expect_err("mismatch");
        assert!(matches!(error, IndexError::DimensionMismatch(message) if message.contains("2 chunks")));
    }

    #[test]
    fn add_rejects_vectors_with_a_different_dimension() {
        let index = populated();
        let error = index
            .add(chunks(&["extra"]), vec![vec![1.0, 0.0, 0.0]])
            .expect_err("mismatch");
        assert!(matches!(error, IndexError::DimensionMismatch(_)));
        assert_eq!(index.status().records, 4);
    }

    #[test]
    fn failed_replace_keeps_previous_epoch_live() {
        let index = populated();
        let before = index.status().epoch_id;
        let error = index
            .replace(
                chunks(&["x", "y"]),
                vec![vec![1.0, 0.0], vec![1.0]],
                None,
            )
            .expect_err("ragged vectors");
        assert!(matches!(error, IndexError::DimensionMismatch(_)));
        assert_eq!(index.status().epoch_id, before);
        assert_eq!(index.search_all(10).len(), 4);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_replacement() {
        let index = populated();
        let snapshot = index.snapshot();
        index
            .replace(chunks(&["only"]), vec![vec![1.0, 0.0]], None)
            .expect("valid epoch");
        assert_eq!(snapshot.len(), 4);
        assert_eq!(index.search_all(10), vec!["only"]);
    }

    #[test]
    fn appended_batches_get_ids_unique_within_the_epoch() {
        let index = VectorIndex::default();
        let first = crate::processing::chunk_text("alpha beta", 5, 0).expect("chunks");
        let second = crate::processing::chunk_text("gamma delta", 5, 0).expect("chunks");
        let (first_len, second_len) = (first.len(), second.len());
        index.add(first, vec![vec![1.0, 0.0]; first_len]).expect("first batch");
        index.add(second, vec![vec![0.0, 1.0]; second_len]).expect("second batch");

        let snapshot = index.snapshot();
        let mut ids: Vec<_> = snapshot.records().iter().map(|record| record.id.clone()).collect();
        assert_eq!(ids.len(), first_len + second_len);
        assert_eq!(ids[first_len], format!("doc_{first_len}"));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first_len + second_len);
    }

    #[test]
    fn add_keeps_the_epoch_identity() {
        let index = populated();
        let before = index.status().epoch_id;
        index
            .add(chunks(&["extra"]), vec![vec![0.5, 0.5]])
            .expect("valid batch");
        let status = index.status();
        assert_eq!(status.epoch_id, before);
        assert_eq!(status.records, 5);
    }

    #[test]
    fn record_ids_follow_epoch_position() {
        let index = populated();
        let ids: Vec<_> = index
            .snapshot()
            .records()
            .iter()
            .map(|record| record.id.clone())
            .collect();
        assert_eq!(ids, vec!["doc_0", "doc_1", "doc_2", "doc_3"]);
    }

    #[test]
    fn mismatched_query_dimension_matches_nothing() {
        let index = populated();
        assert!(index.search(&[1.0, 0.0, 0.0], 3).is_empty());
    }

    #[test]
    fn cosine_known_values() {
        assert!((cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]) - 0.7071).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
