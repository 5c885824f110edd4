//! Document service coordinating extraction, chunking, embedding, retrieval and generation.

use crate::{
    config::{Config, get_config},
    embedding::{EmbeddingClient, get_embedding_client},
    extraction::{DocumentExtractor, DocumentKind},
    generation::{GenerationClient, get_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::Chunker,
        sanitize::sanitize_filename,
        types::{AskError, AskOutcome, AskRequest, ServiceInitError, UploadError, UploadOutcome},
    },
    retrieval::{
        ContextAssembler, EpochSource, IndexHandle, IndexStatus, Mode, NO_RELEVANT_INFORMATION,
        PromptBuilder, QueryClassifier, QueryIntent, RetrievalError, VectorIndex, annotate_answer,
    },
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Owns the live index and every collaborator of the question-answering pipeline.
///
/// Both the HTTP surface and the MCP tools share one instance through an `Arc`. The index is an
/// explicit [`IndexHandle`]; uploads build a new epoch aside and publish it with a single swap,
/// so concurrent questions keep reading the epoch they started with.
pub struct DocumentService {
    index: IndexHandle,
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    generation_client: Box<dyn GenerationClient + Send + Sync>,
    classifier: QueryClassifier,
    assembler: ContextAssembler,
    chunker: Chunker,
    extractor: DocumentExtractor,
    upload_dir: PathBuf,
    max_upload_bytes: u64,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, MCP).
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Store, extract, chunk, embed and publish a document as the new live epoch.
    async fn upload(&self, bytes: Vec<u8>, filename: String)
    -> Result<UploadOutcome, UploadError>;

    /// Answer a question from the live epoch.
    async fn ask(&self, request: AskRequest) -> Result<AskOutcome, AskError>;

    /// Raw nearest chunks for `query`, for debugging retrieval.
    async fn recall(
        &self,
        query: String,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, RetrievalError>;

    /// Drop the loaded document.
    fn reset(&self) -> IndexStatus;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Description of the live epoch.
    fn index_status(&self) -> IndexStatus;
}

impl DocumentService {
    /// Build the service from the global configuration.
    pub fn new() -> Result<Self, ServiceInitError> {
        let config = get_config();
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedding_client = get_embedding_client(config)?;
        tracing::info!(provider = ?config.generation_provider, "Initializing generation client");
        let generation_client = get_generation_client(config)?;
        Self::with_clients(config, embedding_client, generation_client)
    }

    /// Build the service around explicit clients; everything else comes from `config`.
    pub fn with_clients(
        config: &Config,
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        generation_client: Box<dyn GenerationClient + Send + Sync>,
    ) -> Result<Self, ServiceInitError> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let assembler = ContextAssembler {
            verbatim_limit: config.verbatim_chunk_limit,
            summary_limit: config.summary_chunk_limit,
            top_k: config.search_top_k,
            max_chars: config.context_max_chars,
        };
        tracing::debug!(
            chunk_size = chunker.chunk_size(),
            overlap = chunker.overlap(),
            ?assembler,
            metric = ?config.distance_metric,
            "Document service configured"
        );

        Ok(Self {
            index: Arc::new(VectorIndex::new(config.distance_metric)),
            embedding_client,
            generation_client,
            classifier: QueryClassifier::default(),
            assembler,
            chunker,
            extractor: DocumentExtractor::new(config.enable_ocr, config.ocr_min_chars)
                .with_ocr_timeout(Duration::from_secs(config.ocr_timeout_secs)),
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes as u64,
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    /// Replace the classification rules.
    pub fn with_classifier(mut self, classifier: QueryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Shared handle to the live index.
    pub fn index(&self) -> IndexHandle {
        Arc::clone(&self.index)
    }

    /// Upload a document; on any failure the previously loaded document stays live.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadOutcome, UploadError> {
        let size = bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let filename = sanitize_filename(filename);
        DocumentKind::from_path(Path::new(&filename))?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        tracing::info!(%filename, bytes = size, %sha256, "Processing upload");

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let stored = self
            .upload_dir
            .join(format!("{}-{filename}", Uuid::new_v4().simple()));
        tokio::fs::write(&stored, &bytes).await?;

        let extracted = self.extractor.extract_text(&stored).await;
        if let Err(error) = tokio::fs::remove_file(&stored).await {
            tracing::debug!(path = %stored.display(), %error, "Failed to remove stored upload");
        }
        let text = extracted?;
        let char_count = text.chars().count();

        let chunks = self.chunker.chunk(&text);
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedding_client.generate_embeddings(texts).await?
        };

        let epoch = self.index.replace(
            chunks,
            vectors,
            Some(EpochSource {
                filename: filename.clone(),
                sha256: sha256.clone(),
            }),
        )?;
        let chunk_count = epoch.len();
        self.metrics.record_upload(chunk_count as u64);
        tracing::info!(
            %filename,
            chars = char_count,
            chunks = chunk_count,
            epoch = %epoch.id(),
            "Document indexed"
        );

        Ok(UploadOutcome {
            filename,
            char_count,
            chunk_count,
            epoch_id: epoch.id().to_string(),
            sha256,
        })
    }

    /// Upload a file already on local disk.
    pub async fn upload_path(&self, path: &Path) -> Result<UploadOutcome, UploadError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        DocumentKind::from_path(path)?;
        let size = tokio::fs::metadata(path).await?.len();
        if size > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        let bytes = tokio::fs::read(path).await?;
        self.upload(bytes, &filename).await
    }

    /// Classify, retrieve, budget, prompt and generate.
    pub async fn ask(&self, request: AskRequest) -> Result<AskOutcome, AskError> {
        let AskRequest {
            question,
            mode,
            language,
        } = request;
        let question = question.trim().to_string();
        let intent = self.classifier.classify(&question, mode);
        tracing::info!(%intent, %mode, %language, "Answering question");

        let chunks = self
            .assembler
            .assemble(
                intent,
                &question,
                &self.index,
                self.embedding_client.as_ref(),
            )
            .await?;

        let context = self.assembler.limit(&chunks);
        if intent != QueryIntent::Meta && context.is_empty() {
            tracing::info!(%intent, retrieved = chunks.len(), "No context for question");
            self.metrics.record_question(false);
            return Ok(AskOutcome {
                question,
                mode,
                language,
                intent,
                answer: NO_RELEVANT_INFORMATION.to_string(),
                context_chunks: 0,
                generated: false,
            });
        }

        let prompt = PromptBuilder::build(intent, mode, language, &context.text, &question);
        tracing::debug!(
            %intent,
            retrieved = chunks.len(),
            included = context.included,
            prompt_chars = prompt.chars().count(),
            "Prompt assembled"
        );
        self.metrics.record_generation_call();
        let raw = self.generation_client.generate(&prompt).await?;
        self.metrics.record_question(true);

        Ok(AskOutcome {
            answer: annotate_answer(intent, &raw),
            question,
            mode,
            language,
            intent,
            context_chunks: context.included,
            generated: true,
        })
    }

    /// Nearest chunks for `query` without generating.
    pub async fn recall(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, RetrievalError> {
        let assembler = ContextAssembler {
            top_k: top_k.unwrap_or(self.assembler.top_k),
            ..self.assembler
        };
        assembler
            .assemble(
                QueryIntent::Standard(Mode::Qa),
                query,
                &self.index,
                self.embedding_client.as_ref(),
            )
            .await
    }

    /// Publish an empty epoch.
    pub fn reset(&self) -> IndexStatus {
        let epoch_id = self.index.reset();
        tracing::info!(epoch = %epoch_id, "Vector memory cleared");
        self.index.status()
    }

    /// Retrieve a snapshot of the pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Describe the live epoch.
    pub fn index_status(&self) -> IndexStatus {
        self.index.status()
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> Result<UploadOutcome, UploadError> {
        DocumentService::upload(self, bytes, &filename).await
    }

    async fn ask(&self, request: AskRequest) -> Result<AskOutcome, AskError> {
        DocumentService::ask(self, request).await
    }

    async fn recall(
        &self,
        query: String,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, RetrievalError> {
        DocumentService::recall(self, &query, top_k).await
    }

    fn reset(&self) -> IndexStatus {
        DocumentService::reset(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }

    fn index_status(&self) -> IndexStatus {
        DocumentService::index_status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::embedding::HashEmbeddingClient;
    use crate::extraction::ExtractionError;
    use crate::generation::GenerationError;
    use crate::retrieval::{Language, VERBATIM_DISCLAIMER};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingGenerator {
        prompts: Arc<Mutex<Vec<String>>>,
        reply: String,
    }

    impl RecordingGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                prompts: Arc::default(),
                reply: reply.to_string(),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("prompts lock").clone()
        }
    }

    #[async_trait]
    impl GenerationClient for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn service_with(
        dimension: usize,
        generator: RecordingGenerator,
    ) -> (DocumentService, tempfile::TempDir) {
        let uploads = tempfile::tempdir().expect("uploads");
        let mut config = test_config();
        config.upload_dir = uploads.path().to_path_buf();
        let service = DocumentService::with_clients(
            &config,
            Box::new(HashEmbeddingClient::new(dimension)),
            Box::new(generator),
        )
        .expect("service");
        (service, uploads)
    }

    #[tokio::test]
    async fn upload_indexes_text_and_reports_counts() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("ok"));
        let text = "Operating systems schedule processes. ".repeat(40);

        let outcome = service
            .upload(text.clone().into_bytes(), "os notes.txt")
            .await
            .expect("upload");

        assert_eq!(outcome.filename, "os_notes.txt");
        assert_eq!(outcome.char_count, text.trim().chars().count());
        assert!(outcome.chunk_count > 1);
        assert_eq!(outcome.sha256.len(), 64);
        let status = service.index_status();
        assert_eq!(status.records, outcome.chunk_count);
        assert_eq!(status.epoch_id, outcome.epoch_id);
        assert_eq!(status.source.as_deref(), Some("os_notes.txt"));
        assert_eq!(service.metrics_snapshot().documents_uploaded, 1);
    }

    #[tokio::test]
    async fn second_upload_replaces_the_first() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("ok"));
        service
            .upload(b"first document about graphs".to_vec(), "a.txt")
            .await
            .expect("first");
        service
            .upload(b"second document about trees".to_vec(), "b.txt")
            .await
            .expect("second");

        let everything = service.index().search_all(100);
        assert_eq!(everything, vec!["second document about trees"]);
    }

    #[tokio::test]
    async fn failed_upload_keeps_previous_document() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("ok"));
        let first = service
            .upload(b"kept document".to_vec(), "keep.txt")
            .await
            .expect("first");

        let unsupported = service
            .upload(b"binary".to_vec(), "slides.pptx")
            .await
            .expect_err("unsupported");
        assert!(matches!(
            unsupported,
            UploadError::Extraction(ExtractionError::UnsupportedFileType { .. })
        ));
        let blank = service
            .upload(b"   \n\n ".to_vec(), "blank.txt")
            .await
            .expect_err("blank");
        assert!(matches!(
            blank,
            UploadError::Extraction(ExtractionError::NoExtractableText)
        ));

        assert_eq!(service.index_status().epoch_id, first.epoch_id);
        assert_eq!(service.index().search_all(10), vec!["kept document"]);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("ok"));
        let error = service
            .upload(vec![b'a'; 2 * 1024 * 1024], "big.txt")
            .await
            .expect_err("too large");
        assert!(matches!(error, UploadError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn verbatim_question_reads_whole_document_and_adds_disclaimer() {
        let generator = RecordingGenerator::replying("I hereby declare that this work is mine.");
        let (service, _uploads) = service_with(32, generator.clone());
        service
            .upload(
                b"Candidate Declaration\nI hereby declare that this work is mine.".to_vec(),
                "thesis.txt",
            )
            .await
            .expect("upload");

        let outcome = service
            .ask(AskRequest::from_labels(
                "exact text of declaration page",
                "qa",
                "english",
            ))
            .await
            .expect("answer");

        assert_eq!(outcome.intent, QueryIntent::Verbatim);
        assert!(outcome.answer.starts_with(VERBATIM_DISCLAIMER));
        assert!(outcome.answer.ends_with("this work is mine."));
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Reproduce the following document text EXACTLY"));
        assert!(prompts[0].contains("I hereby declare"));
    }

    #[tokio::test]
    async fn meta_question_skips_retrieval_but_generates_guidance() {
        let generator = RecordingGenerator::replying("Pick one: A, B or C?");
        let (service, _uploads) = service_with(32, generator.clone());
        service
            .upload(b"Section A: algebra. Section B: calculus.".to_vec(), "paper.txt")
            .await
            .expect("upload");

        let outcome = service
            .ask(AskRequest {
                question: "help me understand this paper".into(),
                mode: Mode::Qa,
                language: Language::Hinglish,
            })
            .await
            .expect("answer");

        assert_eq!(outcome.intent, QueryIntent::Meta);
        assert_eq!(outcome.context_chunks, 0);
        assert!(outcome.generated);
        let prompts = generator.prompts();
        assert!(prompts[0].contains("Offer 2–3 clear options"));
        assert!(!prompts[0].contains("algebra"));
    }

    #[tokio::test]
    async fn empty_index_returns_canned_answer_without_generation() {
        let generator = RecordingGenerator::replying("should not be used");
        let (service, _uploads) = service_with(32, generator.clone());

        let outcome = service
            .ask(AskRequest::from_labels("what is X", "qa", "english"))
            .await
            .expect("answer");

        assert_eq!(outcome.answer, NO_RELEVANT_INFORMATION);
        assert!(!outcome.generated);
        assert!(generator.prompts().is_empty());
        let metrics = service.metrics_snapshot();
        assert_eq!(metrics.empty_retrievals, 1);
        assert_eq!(metrics.generation_calls, 0);
    }

    #[tokio::test]
    async fn standard_question_uses_mode_template() {
        let generator = RecordingGenerator::replying("- point");
        let (service, _uploads) = service_with(32, generator.clone());
        service
            .upload(b"Stacks are LIFO. Queues are FIFO.".to_vec(), "ds.txt")
            .await
            .expect("upload");

        let outcome = service
            .ask(AskRequest::from_labels("stacks and queues", "bullets", "hindi"))
            .await
            .expect("answer");

        assert_eq!(outcome.intent, QueryIntent::Standard(Mode::Bullets));
        assert_eq!(outcome.answer, "- point");
        let prompt = &generator.prompts()[0];
        assert!(prompt.starts_with("Convert the content into clean bullet points."));
        assert!(prompt.contains(Language::Hindi.instruction()));
        assert!(prompt.contains("Stacks are LIFO."));
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("x"));
        let error = service
            .ask(AskRequest::from_labels("   ", "qa", "english"))
            .await
            .expect_err("blank");
        assert!(matches!(
            error,
            AskError::Retrieval(RetrievalError::EmptyQuestion)
        ));
    }

    #[tokio::test]
    async fn reset_clears_document_and_recall_returns_nothing() {
        let (service, _uploads) = service_with(32, RecordingGenerator::replying("x"));
        service
            .upload(b"Graphs have vertices and edges.".to_vec(), "g.txt")
            .await
            .expect("upload");
        assert_eq!(
            service.recall("vertices", Some(3)).await.expect("recall").len(),
            1
        );

        let status = service.reset();
        assert_eq!(status.records, 0);
        assert!(service.recall("vertices", None).await.expect("recall").is_empty());
        let _ = service.reset();
        assert_eq!(service.index_status().records, 0);
    }
}
