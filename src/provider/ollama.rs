//! Ollama backend (native `/api/chat`)
//!
//! Local models need no credential. Output is newline-delimited JSON, each
//! line optionally carrying `{"message": {"content": "..."}}`. Reasoning
//! models write `<think>...</think>` into the content; newer servers may also
//! split it out into `message.thinking`.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stream::line_stream;
use super::{Backend, BackendError, ChunkStream, StreamChunk, check_status};
use crate::session::{Message, Role};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const REASONING_SYSTEM_PROMPT: &str = "You are a helpful assistant that thinks step by step. \
Format your response as: <think>your step by step reasoning</think> and stop immediately \
after closing the think tag.";

const RESPONSE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides clear and concise answers.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
}

/// Local Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http: HttpClient,
    base_url: String,
    reasoning_model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, reasoning_model: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reasoning_model: reasoning_model.into(),
        }
    }

    async fn stream(&self, request: &ChatRequest<'_>) -> Result<ChunkStream, BackendError> {
        debug!(
            "ollama request: model={}, {} messages",
            request.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        let response = check_status("ollama", response).await?;
        Ok(line_stream("ollama", response, parse_ndjson_line))
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn stream_reasoning(&self, history: &[Message]) -> Result<ChunkStream, BackendError> {
        self.stream(&ChatRequest {
            model: &self.reasoning_model,
            messages: reasoning_messages(history),
            stream: true,
        })
        .await
    }

    async fn stream_response(
        &self,
        model: &str,
        history: &[Message],
    ) -> Result<ChunkStream, BackendError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::new(Role::System, RESPONSE_SYSTEM_PROMPT));
        messages.extend_from_slice(history);

        self.stream(&ChatRequest {
            model,
            messages,
            stream: true,
        })
        .await
    }
}

/// System prompt + history, with the latest user turn framed as a request
/// to analyze step by step
fn reasoning_messages(history: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::new(Role::System, REASONING_SYSTEM_PROMPT));
    messages.extend_from_slice(history);

    if let Some(last) = messages.iter_mut().rev().find(|m| m.role == Role::User) {
        *last = Message::new(
            Role::User,
            format!("Analyze this request step by step:\n{}", last.content),
        );
    }
    messages
}

/// Parse one NDJSON line into chunks
///
/// Undecodable lines yield nothing; an `error` field fails the stream.
fn parse_ndjson_line(line: &str) -> Result<Vec<StreamChunk>, String> {
    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            debug!("Skipping undecodable Ollama line: {}", e);
            return Ok(Vec::new());
        }
    };

    if let Some(error) = chunk.error {
        return Err(error);
    }

    let Some(message) = chunk.message else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    if let Some(thinking) = message.thinking.filter(|t| !t.is_empty()) {
        out.push(StreamChunk::Reasoning(thinking));
    }
    if !message.content.is_empty() {
        out.push(StreamChunk::Text(message.content));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_messages_frame_last_user_turn() {
        let history = vec![
            Message::new(Role::User, "first"),
            Message::new(Role::Assistant, "answer"),
            Message::new(Role::User, "explain X"),
        ];

        let messages = reasoning_messages(&history);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("<think>"));
        assert_eq!(messages[1].content, "first");
        assert_eq!(messages[3].content, "Analyze this request step by step:\nexplain X");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "deepseek-r1:14b",
            messages: vec![Message::new(Role::User, "hi")],
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-r1:14b");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_parse_content_line() {
        let line = r#"{"message":{"role":"assistant","content":"<th"},"done":false}"#;
        assert_eq!(
            parse_ndjson_line(line),
            Ok(vec![StreamChunk::Text("<th".into())])
        );
    }

    #[test]
    fn test_parse_thinking_line() {
        let line = r#"{"message":{"role":"assistant","content":"","thinking":"hmm"},"done":false}"#;
        assert_eq!(
            parse_ndjson_line(line),
            Ok(vec![StreamChunk::Reasoning("hmm".into())])
        );
    }

    #[test]
    fn test_parse_skips_noise() {
        assert_eq!(parse_ndjson_line(r#"{"done":true,"total_duration":123}"#), Ok(vec![]));
        assert_eq!(parse_ndjson_line("not json"), Ok(vec![]));
    }

    #[test]
    fn test_parse_error_line_fails() {
        assert_eq!(
            parse_ndjson_line(r#"{"error":"llama runner process has terminated"}"#),
            Err("llama runner process has terminated".to_string())
        );
    }
}
