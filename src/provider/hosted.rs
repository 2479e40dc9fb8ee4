//! Hosted backend (OpenAI-compatible Chat Completions API)
//!
//! Serves both hosted roles with one client:
//! - DeepSeek (`deepseek-reasoner`) for the reasoning pass, which streams its
//!   chain of thought in `delta.reasoning_content`
//! - OpenRouter for the response pass
//!
//! Responses are SSE; each `data:` line carries one completion chunk.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stream::line_stream;
use super::{Backend, BackendError, ChunkStream, StreamChunk, check_status};
use crate::session::Message;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// The reasoner's answer is thrown away; `reasoning_content` is not capped
/// by `max_tokens`, so one token is enough.
const REASONING_MAX_TOKENS: u32 = 1;

/// Chat completion request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// One SSE chunk
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

/// Mid-stream error object (OpenRouter sends these after a 200)
#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

/// Hosted chat completions backend
pub struct HostedBackend {
    http: HttpClient,
    name: &'static str,
    base_url: String,
    api_key: String,
    reasoning_model: String,
}

impl HostedBackend {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        reasoning_model: impl Into<String>,
    ) -> Self {
        Self {
            http: HttpClient::new(),
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            reasoning_model: reasoning_model.into(),
        }
    }

    /// DeepSeek reasoning endpoint
    pub fn deepseek(
        api_key: impl Into<String>,
        base_url: Option<String>,
        reasoning_model: impl Into<String>,
    ) -> Self {
        Self::new(
            "deepseek",
            base_url.unwrap_or_else(|| DEEPSEEK_BASE_URL.into()),
            api_key,
            reasoning_model,
        )
    }

    /// OpenRouter response endpoint
    pub fn openrouter(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self::new(
            "openrouter",
            base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.into()),
            api_key,
            String::new(),
        )
    }

    async fn stream(&self, request: &CompletionRequest<'_>) -> Result<ChunkStream, BackendError> {
        debug!(
            "{} request: model={}, {} messages",
            self.name,
            request.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = check_status(self.name, response).await?;
        Ok(line_stream(self.name, response, parse_sse_line))
    }
}

#[async_trait]
impl Backend for HostedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn stream_reasoning(&self, history: &[Message]) -> Result<ChunkStream, BackendError> {
        self.stream(&CompletionRequest {
            model: &self.reasoning_model,
            messages: history,
            stream: true,
            max_tokens: Some(REASONING_MAX_TOKENS),
        })
        .await
    }

    async fn stream_response(
        &self,
        model: &str,
        history: &[Message],
    ) -> Result<ChunkStream, BackendError> {
        self.stream(&CompletionRequest {
            model,
            messages: history,
            stream: true,
            max_tokens: None,
        })
        .await
    }
}

/// Parse one SSE line into chunks
///
/// Comments, `[DONE]` and undecodable payloads yield nothing. An `error`
/// object fails the stream.
fn parse_sse_line(line: &str) -> Result<Vec<StreamChunk>, String> {
    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
        return Ok(Vec::new());
    };
    if data.is_empty() || data == "[DONE]" {
        return Ok(Vec::new());
    }

    let chunk: CompletionChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => {
            debug!("Skipping undecodable SSE payload: {}", e);
            return Ok(Vec::new());
        }
    };

    if let Some(error) = chunk.error {
        return Err(error.message);
    }

    let mut out = Vec::new();
    for choice in chunk.choices {
        if let Some(reasoning) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
            out.push(StreamChunk::Reasoning(reasoning));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            out.push(StreamChunk::Text(content));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_request_serialization() {
        let history = vec![Message::new(Role::User, "Hello")];
        let request = CompletionRequest {
            model: "deepseek-reasoner",
            messages: &history,
            stream: true,
            max_tokens: Some(REASONING_MAX_TOKENS),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-reasoner");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 1);
    }

    #[test]
    fn test_response_request_omits_max_tokens() {
        let request = CompletionRequest {
            model: "openai/gpt-4o-mini",
            messages: &[],
            stream: true,
            max_tokens: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn test_parse_reasoning_delta() {
        let line = r#"data: {"choices":[{"delta":{"reasoning_content":"Let me think"}}]}"#;
        assert_eq!(
            parse_sse_line(line),
            Ok(vec![StreamChunk::Reasoning("Let me think".into())])
        );
    }

    #[test]
    fn test_parse_content_delta() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"}}]}"#;
        assert_eq!(parse_sse_line(line), Ok(vec![StreamChunk::Text("Hi".into())]));
    }

    #[test]
    fn test_parse_skips_noise() {
        let empty: Result<Vec<StreamChunk>, String> = Ok(vec![]);
        assert_eq!(parse_sse_line("data: [DONE]"), empty);
        assert_eq!(parse_sse_line(": OPENROUTER PROCESSING"), empty);
        assert_eq!(parse_sse_line("event: message"), empty);
        assert_eq!(parse_sse_line("data: {not json"), empty);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            empty
        );
    }

    #[test]
    fn test_parse_error_object_fails() {
        let line = r#"data: {"error":{"code":502,"message":"Provider returned error"}}"#;
        assert_eq!(parse_sse_line(line), Err("Provider returned error".to_string()));
    }
}
