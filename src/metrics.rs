use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload and question activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_uploaded: AtomicU64,
    chunks_indexed: AtomicU64,
    last_chunk_count: AtomicU64,
    questions_answered: AtomicU64,
    empty_retrievals: AtomicU64,
    generation_calls: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published upload and the number of chunks it produced.
    pub fn record_upload(&self, chunk_count: u64) {
        self.documents_uploaded.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record an answered question; `generated` is false for canned answers.
    pub fn record_question(&self, generated: bool) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        if !generated {
            self.empty_retrievals.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request sent to the generation provider, whether or not it succeeds.
    pub fn record_generation_call(&self) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_uploaded = self.documents_uploaded.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_uploaded,
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            last_chunk_count: (documents_uploaded > 0)
                .then(|| self.last_chunk_count.load(Ordering::Relaxed)),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            empty_retrievals: self.empty_retrievals.load(Ordering::Relaxed),
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents published to the index since startup.
    pub documents_uploaded: u64,
    /// Total chunk count across all published uploads.
    pub chunks_indexed: u64,
    /// Chunk count of the most recent upload, if any.
    pub last_chunk_count: Option<u64>,
    /// Questions answered, including canned answers.
    pub questions_answered: u64,
    /// Questions short-circuited because retrieval returned nothing.
    pub empty_retrievals: u64,
    /// Requests sent to the generation provider, failed ones included.
    pub generation_calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_uploads_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_upload(2);
        metrics.record_upload(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_uploaded, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.last_chunk_count, Some(3));
    }

    #[test]
    fn canned_answers_count_as_empty_retrievals() {
        let metrics = PipelineMetrics::new();
        metrics.record_generation_call();
        metrics.record_question(true);
        metrics.record_question(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.questions_answered, 2);
        assert_eq!(snapshot.generation_calls, 1);
        assert_eq!(snapshot.empty_retrievals, 1);
        assert_eq!(snapshot.last_chunk_count, None);
    }

    #[test]
    fn failed_generation_still_counts_as_a_call() {
        let metrics = PipelineMetrics::new();
        metrics.record_generation_call();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.generation_calls, 1);
        assert_eq!(snapshot.questions_answered, 0);
    }
}
