use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docqa server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Embedding provider used to vectorize chunks and questions.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime shared by embedding and generation clients.
    pub ollama_url: String,
    /// Provider that turns assembled prompts into answers.
    pub generation_provider: GenerationProvider,
    /// Generation model identifier.
    pub generation_model: String,
    /// Optional base URL for OpenAI-compatible generation endpoints.
    pub generation_base_url: Option<String>,
    /// Optional bearer token for OpenAI-compatible generation endpoints.
    pub generation_api_key: Option<String>,
    /// Sampling temperature forwarded to the generation provider.
    pub generation_temperature: f32,
    /// Upper bound on a single generation request.
    pub generation_timeout_secs: u64,
    /// Characters per chunk window.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunk windows.
    pub chunk_overlap: usize,
    /// Character budget for the context handed to generation.
    pub context_max_chars: usize,
    /// Nearest neighbours retrieved for standard questions.
    pub search_top_k: usize,
    /// Chunks pulled in insertion order for verbatim questions.
    pub verbatim_chunk_limit: usize,
    /// Chunks pulled in insertion order for whole-document questions.
    pub summary_chunk_limit: usize,
    /// Distance used to rank chunks against a question vector.
    pub distance_metric: DistanceMetric,
    /// Whether scanned PDFs may be re-read through OCR.
    pub enable_ocr: bool,
    /// Primary PDF text shorter than this triggers the OCR fallback.
    pub ocr_min_chars: usize,
    /// Deadline for each `pdftoppm`/`tesseract` invocation.
    pub ocr_timeout_secs: u64,
    /// Directory receiving uploaded files before extraction.
    pub upload_dir: PathBuf,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic byte-hash embeddings; no network required.
    Hash,
    /// Local Ollama runtime.
    Ollama,
}

/// Supported generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Local Ollama runtime (`/api/generate`).
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint (OpenAI, Groq, vLLM, ...).
    OpenAI,
}

/// Vector distance used by the in-memory index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine distance (`1 - cosine similarity`).
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            embedding_provider: parse_or("EMBEDDING_PROVIDER", EmbeddingProvider::Hash)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "all-minilm".to_string()),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", 384)?,
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            generation_provider: parse_or("GENERATION_PROVIDER", GenerationProvider::Ollama)?,
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| "llama3.1".to_string()),
            generation_base_url: load_env_optional("GENERATION_BASE_URL"),
            generation_api_key: load_env_optional("GENERATION_API_KEY")
                .or_else(|| load_env_optional("GROQ_API_KEY")),
            generation_temperature: parse_or("GENERATION_TEMPERATURE", 0.3)?,
            generation_timeout_secs: parse_or("GENERATION_TIMEOUT_SECS", 120)?,
            chunk_size: parse_or("CHUNK_SIZE", 500)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", 80)?,
            context_max_chars: parse_or("CONTEXT_MAX_CHARS", 12_000)?,
            search_top_k: parse_or("SEARCH_TOP_K", 8)?,
            verbatim_chunk_limit: parse_or("VERBATIM_CHUNK_LIMIT", 80)?,
            summary_chunk_limit: parse_or("SUMMARY_CHUNK_LIMIT", 50)?,
            distance_metric: parse_or("DISTANCE_METRIC", DistanceMetric::Cosine)?,
            enable_ocr: load_env_optional("ENABLE_OCR")
                .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
                .unwrap_or(false),
            ocr_min_chars: parse_or("OCR_MIN_CHARS", 500)?,
            ocr_timeout_secs: parse_or("OCR_TIMEOUT_SECS", 120)?,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/uploads")),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "CHUNK_SIZE must be greater than zero".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue(
                "CHUNK_OVERLAP must be smaller than CHUNK_SIZE".into(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue(
                "EMBEDDING_DIMENSION must be greater than zero".into(),
            ));
        }
        if self.generation_provider == GenerationProvider::OpenAI
            && self.generation_api_key.is_none()
        {
            return Err(ConfigError::MissingVariable(
                "GENERATION_API_KEY (or GROQ_API_KEY)".into(),
            ));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "groq" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        generation_provider = ?config.generation_provider,
        generation_model = %config.generation_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        enable_ocr = config.enable_ocr,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        embedding_provider: EmbeddingProvider::Hash,
        embedding_model: "test-model".into(),
        embedding_dimension: 32,
        ollama_url: "http://127.0.0.1:11434".into(),
        generation_provider: GenerationProvider::Ollama,
        generation_model: "test-llm".into(),
        generation_base_url: None,
        generation_api_key: None,
        generation_temperature: 0.3,
        generation_timeout_secs: 5,
        chunk_size: 500,
        chunk_overlap: 80,
        context_max_chars: 12_000,
        search_top_k: 8,
        verbatim_chunk_limit: 80,
        summary_chunk_limit: 50,
        distance_metric: DistanceMetric::Cosine,
        enable_ocr: false,
        ocr_min_chars: 500,
        ocr_timeout_secs: 120,
        upload_dir: std::env::temp_dir().join("docqa-test-uploads"),
        max_upload_bytes: 1024 * 1024,
        server_port: None,
    }
}
