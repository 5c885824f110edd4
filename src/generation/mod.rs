//! Generation clients that turn an assembled prompt into an answer.
//!
//! Two adapters ship: Ollama's `/api/generate` and any OpenAI-compatible
//! `/chat/completions` endpoint (OpenAI, Groq, vLLM). Both issue a single non-streaming request
//! and carry the same system prompt. Dropping the returned future cancels the request; nothing
//! here touches index state.

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Behavioural rules sent as the system message with every prompt.
pub const SYSTEM_PROMPT: &str = "\
You are a careful academic assistant answering questions about one uploaded document.

Rules:
- Answer the question directly; do not ask follow-up questions or offer menus unless told to.
- Never repeat content and stop once the answer is complete.
- For question papers, questions come from the document but answers may need standard academic \
knowledge; match exam-appropriate depth.
- For notes, books and reports, treat the document content as the primary source and do not \
invent sections, parts or structure.
- For counts, lists and identification, give exact results.
- When code is requested, write complete, correct code in the requested language without asking \
questions; default to C/C++ for data structures and Python otherwise.
- Be concise but complete, calm and exam-safe. Never dump whole documents unless explicitly asked.";

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider was unreachable or timed out.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate free text for `prompt` in a single blocking round trip.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build a generation client based on configuration.
pub fn get_generation_client(
    config: &Config,
) -> Result<Box<dyn GenerationClient + Send + Sync>, GenerationError> {
    let http = build_http_client(config.generation_timeout_secs)?;
    match config.generation_provider {
        GenerationProvider::Ollama => Ok(Box::new(OllamaGenerationClient {
            http,
            base_url: config.ollama_url.clone(),
            model: config.generation_model.clone(),
            temperature: config.generation_temperature,
        })),
        GenerationProvider::OpenAI => {
            let api_key = config.generation_api_key.clone().ok_or_else(|| {
                GenerationError::ProviderUnavailable("missing API key".to_string())
            })?;
            Ok(Box::new(OpenAiGenerationClient {
                http,
                base_url: config
                    .generation_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                api_key,
                model: config.generation_model.clone(),
                temperature: config.generation_temperature,
            }))
        }
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client, GenerationError> {
    Client::builder()
        .user_agent("docqa/generate")
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| GenerationError::ProviderUnavailable(error.to_string()))
}

fn request_error(base_url: &str, error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::ProviderUnavailable(format!("request to {base_url} timed out"))
    } else {
        GenerationError::ProviderUnavailable(format!("failed to reach {base_url}: {error}"))
    }
}

struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerationClient {
    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "system": SYSTEM_PROMPT,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| request_error(&self.base_url, error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

struct OpenAiGenerationClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerationClient {
    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| request_error(&self.base_url, error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "chat completion returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode completion: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerationError::InvalidResponse("completion had no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn ollama_client(base_url: String) -> OllamaGenerationClient {
        OllamaGenerationClient {
            http: build_http_client(5).expect("client"),
            base_url,
            model: "llama".into(),
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"stream\":false");
                then.status(200).json_body(json!({
                    "response": "  Answer text \n",
                    "done": true
                }));
            })
            .await;

        let answer = ollama_client(server.base_url())
            .generate("What is X?")
            .await
            .expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "Answer text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = ollama_client(server.base_url())
            .generate("What is X?")
            .await
            .expect_err("error response");

        assert!(
            matches!(error, GenerationError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn openai_client_sends_system_prompt_and_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer secret")
                    .body_contains("careful academic assistant");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": " Done. " } }]
                }));
            })
            .await;

        let client = OpenAiGenerationClient {
            http: build_http_client(5).expect("client"),
            base_url: server.base_url(),
            api_key: "secret".into(),
            model: "llama-3.1-8b-instant".into(),
            temperature: 0.3,
        };

        let answer = client.generate("prompt").await.expect("answer");
        mock.assert_async().await;
        assert_eq!(answer, "Done.");
    }

    #[tokio::test]
    async fn openai_client_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = OpenAiGenerationClient {
            http: build_http_client(5).expect("client"),
            base_url: server.base_url(),
            api_key: "secret".into(),
            model: "m".into(),
            temperature: 0.3,
        };

        let error = client.generate("prompt").await.expect_err("no choices");
        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }
}
