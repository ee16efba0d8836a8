//! Google Gemini `generateContent` REST client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{LlmClient, ReasoningError};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Generation settings sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 2000,
        }
    }
}

pub struct GeminiClient {
    base_url: String,
    api_key: String,
    settings: GeminiSettings,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        settings: GeminiSettings,
        timeout_secs: u64,
    ) -> Result<Self, ReasoningError> {
        if api_key.trim().is_empty() {
            return Err(ReasoningError::NotConfigured);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReasoningError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            settings,
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

/// Concatenated text of the first candidate.
fn candidate_text(response: GenerateResponse) -> Result<String, ReasoningError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ReasoningError::MalformedResponse(
            "Gemini returned no candidate text".into(),
        ));
    }
    Ok(text)
}

impl LlmClient for GeminiClient {
    fn backend(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ReasoningError> {
        let model = model.trim_start_matches("models/");
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReasoningError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ReasoningError::ResponseParsing(e.to_string()))?;
        candidate_text(parsed)
    }

    fn list_models(&self) -> Result<Vec<String>, ReasoningError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReasoningError::from_status(status.as_u16(), body));
        }

        let parsed: ModelsResponse = response
            .json()
            .map_err(|e| ReasoningError::ResponseParsing(e.to_string()))?;
        Ok(parsed
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}
