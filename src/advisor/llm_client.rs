use crate::error::UpstreamError;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, warn};

use super::messages::{ChatCompletionBody, ChatCompletionResponse, CompletionRequest, ResponseFormat};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const RETRY_BASE_DELAY_MS: u64 = 1_000;

pub trait CompletionClient: Send + Sync {
    /// Sends one request and returns the text of the first choice.
    fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompletionClient {
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
    max_attempts: u32,
    http: HttpClient,
}

impl OpenAiCompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("kein API-Schlüssel konfiguriert (secrets.toml oder OPENAI_API_KEY)");
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("HTTP-Client für den KI-Dienst konnte nicht erstellt werden")?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            timeout_secs,
            max_attempts: 1,
            http,
        })
    }

    /// Total attempts per request; 1 disables retrying.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn send_once(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .http
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.timeout_secs)
                } else {
                    UpstreamError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate(&body, 400),
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;

        parsed.first_content().ok_or(UpstreamError::NoChoices)
    }
}

impl CompletionClient for OpenAiCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let mut attempt = 1;
        loop {
            match self.send_once(request) {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), model = %request.model, "Antwort erhalten");
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * u64::from(attempt));
                    warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "neuer Versuch");
                    sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

/// Replays queued answers in order and records every request it receives.
#[derive(Clone, Default)]
pub struct MockCompletionClient {
    responses: Arc<Mutex<VecDeque<Result<String, UpstreamError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletionClient {
    pub fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().push_back(Ok(text.into()));
    }

    pub fn push_error(&self, error: UpstreamError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(UpstreamError::NoChoices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::messages::ChatMessage;

    #[test]
    fn rejects_missing_api_key() {
        assert!(OpenAiCompletionClient::new(DEFAULT_ENDPOINT, "  ", 30).is_err());
    }

    #[test]
    fn builds_chat_completions_url() {
        let client = OpenAiCompletionClient::new("http://localhost:8080/v1/", "sk-test", 5).unwrap();
        assert_eq!(client.url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn unreachable_endpoint_is_upstream_error() {
        let client = OpenAiCompletionClient::new("http://127.0.0.1:9", "sk-test", 2).unwrap();
        let request = CompletionRequest::new("gpt-4o", 0.5, vec![ChatMessage::user("hallo")]);
        let err = client.complete(&request).unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Unreachable(_) | UpstreamError::Timeout(_)
        ));
    }

    #[test]
    fn mock_replays_in_order_then_fails() {
        let mock = MockCompletionClient::default();
        mock.push_response("eins");
        mock.push_error(UpstreamError::Timeout(3));
        let request = CompletionRequest::new("m", 0.1, vec![]);

        assert_eq!(mock.complete(&request).unwrap(), "eins");
        assert!(matches!(mock.complete(&request), Err(UpstreamError::Timeout(3))));
        assert!(matches!(mock.complete(&request), Err(UpstreamError::NoChoices)));
        assert_eq!(mock.requests().len(), 3);
    }

    #[test]
    fn truncates_long_bodies() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
