use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{LlmClient, ReasoningError};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ReasoningError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReasoningError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> ReasoningError {
        if e.is_timeout() {
            ReasoningError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ReasoningError::Connection(self.base_url.clone())
        } else {
            ReasoningError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'static str,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn backend(&self) -> &'static str {
        "ollama"
    }

    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReasoningError::from_status(status.as_u16(), body));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| ReasoningError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn list_models(&self) -> Result<Vec<String>, ReasoningError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReasoningError::from_status(status.as_u16(), body));
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| ReasoningError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}
