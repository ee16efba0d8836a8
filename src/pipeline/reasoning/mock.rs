use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::types::{LlmClient, ReasoningError};

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fail as if the service returned this HTTP status.
    Status(u16),
    /// Fail as if the HTTP client timed out.
    Timeout,
}

/// Mock LLM client for testing. Returns a configurable reply, optionally
/// after sleeping, and counts calls.
pub struct MockLlmClient {
    reply: MockReply,
    delay: Option<Duration>,
    models: Option<Vec<String>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_reply(MockReply::Text(response.to_string()))
    }

    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            models: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Sleep this long inside every `generate` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Models advertised by `list_models`. Without this, listing fails.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|guard| guard.clone())
    }
}

impl LlmClient for MockLlmClient {
    fn backend(&self) -> &'static str {
        "mock"
    }

    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: &str,
    ) -> Result<String, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_prompt.lock() {
            *guard = Some(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Status(status) => Err(ReasoningError::from_status(*status, String::new())),
            MockReply::Timeout => Err(ReasoningError::Timeout(0)),
        }
    }

    fn list_models(&self) -> Result<Vec<String>, ReasoningError> {
        self.models
            .clone()
            .ok_or_else(|| ReasoningError::from_status(500, "listing unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        let result = client.generate("model", "prompt", "system").unwrap();
        assert_eq!(result, "test response");
        assert_eq!(client.calls(), 1);
        assert_eq!(client.last_prompt().as_deref(), Some("prompt"));
    }

    #[test]
    fn mock_client_lists_models() {
        let client = MockLlmClient::new("").with_models(vec![
            "medgemma:latest".into(),
            "llama3:8b".into(),
        ]);
        assert_eq!(client.list_models().unwrap().len(), 2);
        assert!(client.is_model_available("medgemma").unwrap());
        assert!(!client.is_model_available("mistral").unwrap());
    }

    #[test]
    fn mock_client_without_models_fails_listing() {
        assert!(MockLlmClient::new("").list_models().is_err());
    }
}
