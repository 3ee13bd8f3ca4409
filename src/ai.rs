use std::time::Duration;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model is disabled")]
    Disabled,
    #[error("language model network error: {0}")]
    Network(String),
    #[error("language model returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Clone, Deserialize)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    ///
    /// Upper bound on a whole request, connect to last byte. A call that
    /// runs past it fails like any other network error.
    ///
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

fn default_timeout_s() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

///
/// A text-completion endpoint of an external language model. Scoring and
/// narration build their own prompts and parse the returned text.
///
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError>;
}

///
/// Client which always fails, used when no API key is configured so every
/// caller goes straight to its deterministic fallback
///
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn complete(&self, _messages: Vec<Message>) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

///
/// Messages-API client over blocking `ureq`, run on the blocking pool
///
pub struct HttpLlmClient {
    api_key: String,
    settings: LlmSettings,
    agent: ureq::Agent,
}

impl HttpLlmClient {
    pub fn new(api_key: String, settings: LlmSettings) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_s)))
            .build()
            .into();
        Self { api_key, settings, agent }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let api_key = self.api_key.clone();
        let agent = self.agent.clone();
        let url = format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'));

        // The messages API takes the system prompt as a separate field
        let system: Option<String> = messages.iter().find(|m| m.role == "system").map(|m| m.content.clone());
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "messages": turns,
        });
        if let Some(system) = system {
            body["system"] = serde_json::Value::String(system);
        }

        tokio::task::spawn_blocking(move || {
            let response = agent
                .post(&url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .send_json(body)
                .map_err(|e| LlmError::Network(e.to_string()))?;

            let json: serde_json::Value = response
                .into_body()
                .read_json()
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

            json["content"]
                .as_array()
                .and_then(|parts| parts.first())
                .and_then(|part| part["text"].as_str())
                .map(|text| text.to_string())
                .ok_or_else(|| LlmError::InvalidResponse("no text content".to_string()))
        })
        .await
        .map_err(|e| LlmError::Network(format!("task join error: {e}")))?
    }
}

///
/// Strips a surrounding markdown code fence, if the model added one
///
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        return rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    trimmed
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    ///
    /// Pops queued responses in order; errors once the queue runs dry
    ///
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<String, LlmError>>>,
        pub calls: Mutex<Vec<Vec<Message>>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self { responses: Mutex::new(responses), calls: Mutex::new(Vec::new()) }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(messages);
            let mut queue = self.responses.lock().unwrap();
            if queue.is_empty() {
                return Err(LlmError::Network("mock queue exhausted".to_string()));
            }
            queue.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    fn settings(base_url: String, timeout_s: u64) -> LlmSettings {
        LlmSettings { enabled: true, base_url, model: "test".to_string(), max_tokens: 16, timeout_s }
    }

    #[test]
    fn timeout_defaults_when_omitted() {
        let parsed: LlmSettings = serde_json::from_str(
            r#"{ "enabled": true, "base_url": "http://localhost", "model": "m", "max_tokens": 8 }"#,
        )
        .unwrap();
        assert_eq!(parsed.timeout_s, 30);
    }

    #[tokio::test]
    async fn silent_endpoint_times_out_as_network_error() {
        // Accepts connections into the backlog but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = HttpLlmClient::new("key".to_string(), settings(format!("http://{}", listener.local_addr().unwrap()), 1));

        let res = tokio::time::timeout(Duration::from_secs(10), client.complete(vec![Message::user("hi")]))
            .await
            .expect("request outlived its timeout");
        assert!(matches!(res, Err(LlmError::Network(_))));
        drop(listener);
    }

    #[tokio::test]
    async fn disabled_client_always_errors() {
        let res = DisabledLlmClient.complete(vec![Message::user("hi")]).await;
        assert!(matches!(res, Err(LlmError::Disabled)));
    }
}
