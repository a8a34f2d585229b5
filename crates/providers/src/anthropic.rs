//! Anthropic native provider implementation.
//!
//! Uses the Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native `tool_use` / `tool_result` content blocks
//! - Streaming via SSE, surfaced as raw [`StreamEvent`]s for the agent to
//!   reassemble

use std::collections::HashSet;

use agentgate_core::error::ProviderError;
use agentgate_core::message::{ContentBlock, Message, Role, StopReason};
use agentgate_core::provider::{
    BlockDelta, BlockKind, EventStream, Provider, ProviderRequest, ProviderResponse, StreamEvent,
    Usage,
};
use agentgate_core::tool::ToolDescriptor;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert history to API messages. Tool-use input is sent as parsed
    /// JSON; input that does not parse is sent as an empty object.
    /// Empty text blocks are dropped, and so is any message left with no
    /// content; the API rejects both.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .filter_map(|msg| {
                let content: Vec<ApiBlock> = msg
                    .content
                    .iter()
                    .filter(|b| !matches!(b, ContentBlock::Text { text } if text.is_empty()))
                    .map(ApiBlock::from_block)
                    .collect();
                if content.is_empty() {
                    return None;
                }
                Some(ApiMessage {
                    role: match msg.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content,
                })
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDescriptor]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        if let Some(ref sys) = request.system {
            body["system"] = serde_json::json!(sys);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        if stream {
            body["stream"] = Value::Bool(true);
        }
        body
    }

    async fn send(&self, body: &Value, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Anthropic API error");
        Err(status_error(status, retry_after, error_body))
    }

    /// Convert an API response to our ProviderResponse.
    fn to_provider_response(resp: ApiResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                    id,
                    name,
                    input: input.to_string(),
                }),
                ResponseBlock::Other => None,
            })
            .collect();

        let mut message = Message::assistant_blocks(
            content,
            resp.stop_reason.as_deref().map(StopReason::from_wire),
        );
        message.id = resp.id;

        ProviderResponse {
            message,
            usage: Some(Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

/// Map a non-200 status to a provider error.
fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 | 403 => ProviderError::AuthenticationFailed("Invalid Anthropic API key".into()),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = "anthropic", model = %request.model, "Sending completion request");
        let body = Self::request_body(&request, false);
        let response = self.send(&body, false).await?;

        let api_resp: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Anthropic response: {e}"),
        })?;

        Ok(Self::to_provider_response(api_resp))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<EventStream, ProviderError> {
        debug!(provider = "anthropic", model = %request.model, "Sending streaming request");
        let body = Self::request_body(&request, true);
        let response = self.send(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut parser = SseParser::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for item in parser.feed(&bytes) {
                    let stop = matches!(item, Ok(StreamEvent::MessageStop) | Err(_));
                    if tx.send(item).await.is_err() || stop {
                        return;
                    }
                }
            }
            // Dropping `tx` here lets the consumer notice a missing
            // message_stop and report the stream as interrupted.
        });

        Ok(rx)
    }
}

/// Incremental decoder from SSE bytes to [`StreamEvent`]s.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly. Blocks of
/// kinds we do not model (e.g. thinking) are skipped along with their
/// deltas and stop.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    skipped: HashSet<usize>,
    input_tokens: u32,
}

impl SseParser {
    /// Feed raw bytes, returning every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamEvent, ProviderError>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    out.push(Err(ProviderError::MalformedStream(format!(
                        "invalid UTF-8 in event stream: {e}"
                    ))));
                    continue;
                }
            };

            // `event:` lines repeat the `type` field of the data payload.
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(data) {
                Ok(event) => {
                    if let Some(item) = self.decode(&event) {
                        out.push(item);
                    }
                }
                Err(e) => trace!(error = %e, data = %data, "Ignoring unparseable Anthropic SSE"),
            }
        }
        out
    }

    fn decode(&mut self, event: &Value) -> Option<Result<StreamEvent, ProviderError>> {
        let index = || event["index"].as_u64().map(|i| i as usize);

        let decoded = match event["type"].as_str().unwrap_or("") {
            "message_start" => {
                let message = &event["message"];
                self.input_tokens = token_count(&message["usage"]["input_tokens"]);
                StreamEvent::MessageStart {
                    id: message["id"].as_str().unwrap_or_default().to_string(),
                    model: message["model"].as_str().unwrap_or_default().to_string(),
                }
            }
            "content_block_start" => {
                let index = index()?;
                let block = &event["content_block"];
                let kind = match block["type"].as_str() {
                    Some("text") => BlockKind::Text,
                    Some("tool_use") => BlockKind::ToolUse {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                    },
                    other => {
                        trace!(index, kind = ?other, "Skipping unsupported content block");
                        self.skipped.insert(index);
                        return None;
                    }
                };
                StreamEvent::BlockStart { index, kind }
            }
            "content_block_delta" => {
                let index = index()?;
                if self.skipped.contains(&index) {
                    return None;
                }
                let delta = &event["delta"];
                let delta = match delta["type"].as_str() {
                    Some("text_delta") => BlockDelta::Text(delta["text"].as_str()?.to_string()),
                    Some("input_json_delta") => {
                        BlockDelta::InputJson(delta["partial_json"].as_str()?.to_string())
                    }
                    other => {
                        trace!(index, kind = ?other, "Skipping unsupported delta");
                        return None;
                    }
                };
                StreamEvent::BlockDelta { index, delta }
            }
            "content_block_stop" => {
                let index = index()?;
                if self.skipped.contains(&index) {
                    return None;
                }
                StreamEvent::BlockStop { index }
            }
            "message_delta" => {
                let usage = event.get("usage").map(|u| Usage {
                    input_tokens: u
                        .get("input_tokens")
                        .map(token_count)
                        .unwrap_or(self.input_tokens),
                    output_tokens: token_count(&u["output_tokens"]),
                });
                StreamEvent::MessageDelta {
                    stop_reason: event["delta"]["stop_reason"]
                        .as_str()
                        .map(StopReason::from_wire),
                    usage,
                }
            }
            "message_stop" => StreamEvent::MessageStop,
            "error" => {
                let error = &event["error"];
                return Some(Err(ProviderError::StreamInterrupted(format!(
                    "{}: {}",
                    error["type"].as_str().unwrap_or("error"),
                    error["message"].as_str().unwrap_or_default()
                ))));
            }
            _ => return None,
        };
        Some(Ok(decoded))
    }
}

fn token_count(v: &Value) -> u32 {
    v.as_u64().map(|n| n as u32).unwrap_or(0)
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ApiBlock {
    fn from_block(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => Self::Text { text: text.clone() },
            ContentBlock::ToolUse { id, name, input } => Self::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: serde_json::from_str(input)
                    .unwrap_or_else(|_| Value::Object(Default::default())),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Self::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: *is_error,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: String,
    model: String,
    content: Vec<ResponseBlock>,
    usage: ApiUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_01\",\"model\":\"claude-test\",\"usage\":{\"input_tokens\":42}}}\n\n",
        "event: ping\n",
        "data: {\"type\":\"ping\"}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"hmm\"}}\n\n",
        "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "data: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Schreibe Datei ✓\"}}\n\n",
        "data: {\"type\":\"content_block_stop\",\"index\":1}\n\n",
        "data: {\"type\":\"content_block_start\",\"index\":2,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"file_write\",\"input\":{}}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":2,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"path\\\":\"}}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":2,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"\\\"a.txt\\\"}\"}}\n\n",
        "data: {\"type\":\"content_block_stop\",\"index\":2}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"},\"usage\":{\"output_tokens\":17}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    fn expected_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::MessageStart {
                id: "msg_01".into(),
                model: "claude-test".into(),
            },
            StreamEvent::BlockStart {
                index: 1,
                kind: BlockKind::Text,
            },
            StreamEvent::BlockDelta {
                index: 1,
                delta: BlockDelta::Text("Schreibe Datei ✓".into()),
            },
            StreamEvent::BlockStop { index: 1 },
            StreamEvent::BlockStart {
                index: 2,
                kind: BlockKind::ToolUse {
                    id: "toolu_1".into(),
                    name: "file_write".into(),
                },
            },
            StreamEvent::BlockDelta {
                index: 2,
                delta: BlockDelta::InputJson("{\"path\":".into()),
            },
            StreamEvent::BlockDelta {
                index: 2,
                delta: BlockDelta::InputJson("\"a.txt\"}".into()),
            },
            StreamEvent::BlockStop { index: 2 },
            StreamEvent::MessageDelta {
                stop_reason: Some(StopReason::ToolUse),
                usage: Some(Usage {
                    input_tokens: 42,
                    output_tokens: 17,
                }),
            },
            StreamEvent::MessageStop,
        ]
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test")
            .unwrap()
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn sse_transcript_decodes_in_one_piece() {
        let events: Vec<StreamEvent> = SseParser::default()
            .feed(TRANSCRIPT.as_bytes())
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(events, expected_events());
    }

    #[test]
    fn sse_transcript_decodes_across_any_chunking() {
        let bytes = TRANSCRIPT.as_bytes();
        for chunk_size in [1, 2, 3, 5, 7, 13, 64] {
            let mut parser = SseParser::default();
            let mut events = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                events.extend(parser.feed(chunk).into_iter().map(Result::unwrap));
            }
            assert_eq!(events, expected_events(), "chunk size {chunk_size}");
        }
    }

    #[test]
    fn sse_error_event_is_surfaced() {
        let items = SseParser::default().feed(
            b"data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n",
        );
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(ProviderError::StreamInterrupted(msg)) => assert!(msg.contains("overloaded_error")),
            other => panic!("expected interruption, got {other:?}"),
        }
    }

    #[test]
    fn sse_ignores_comments_and_garbage() {
        let items = SseParser::default().feed(b": keep-alive\ndata: {not json}\n\ndata: {\"type\":\"message_stop\"}\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &StreamEvent::MessageStop);
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(429, Some(30), String::new()),
            ProviderError::RateLimited { retry_after_secs: 30 }
        ));
        assert!(matches!(
            status_error(429, None, String::new()),
            ProviderError::RateLimited {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            }
        ));
        assert!(matches!(
            status_error(401, None, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(529, None, "overloaded".into()),
            ProviderError::ApiError { status_code: 529, .. }
        ));
    }

    #[test]
    fn message_conversion_with_tool_blocks() {
        let messages = vec![
            Message::user("write a.txt"),
            Message::assistant_blocks(
                vec![
                    ContentBlock::text("Writing"),
                    ContentBlock::ToolUse {
                        id: "toolu_1".into(),
                        name: "file_write".into(),
                        input: r#"{"path":"a.txt"}"#.into(),
                    },
                ],
                Some(StopReason::ToolUse),
            ),
            Message::tool_results(vec![
                ContentBlock::ToolResult {
                    tool_use_id: "toolu_1".into(),
                    content: "ok".into(),
                    is_error: false,
                },
                ContentBlock::text("validate now"),
            ]),
        ];
        let json = serde_json::to_value(AnthropicProvider::to_api_messages(&messages)).unwrap();

        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["content"][1]["type"], "tool_use");
        assert_eq!(json[1]["content"][1]["input"]["path"], "a.txt");
        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"][0]["type"], "tool_result");
        assert!(json[2]["content"][0].get("is_error").is_none());
        assert_eq!(json[2]["content"][1]["text"], "validate now");
    }

    #[test]
    fn empty_text_blocks_are_not_sent() {
        let messages = vec![
            Message::user("Write a.txt"),
            Message::assistant_blocks(
                vec![
                    ContentBlock::text(""),
                    ContentBlock::ToolUse {
                        id: "toolu_1".into(),
                        name: "file_write".into(),
                        input: r#"{"path":"a.txt"}"#.into(),
                    },
                ],
                Some(StopReason::ToolUse),
            ),
            Message::assistant(""),
        ];
        let json = serde_json::to_value(AnthropicProvider::to_api_messages(&messages)).unwrap();

        let sent = json.as_array().unwrap();
        assert_eq!(sent.len(), 2);
        let blocks = sent[1]["content"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["type"], "tool_use");
    }

    #[test]
    fn unparsable_tool_input_is_sent_as_empty_object() {
        let block = ApiBlock::from_block(&ContentBlock::ToolUse {
            id: "t".into(),
            name: "n".into(),
            input: String::new(),
        });
        let json = serde_json::to_value(block).unwrap();
        assert_eq!(json["input"], serde_json::json!({}));
    }

    #[test]
    fn request_body_shape() {
        let request = ProviderRequest {
            model: "claude-test".into(),
            system: Some("Be terse".into()),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            max_tokens: 512,
            tools: vec![ToolDescriptor {
                name: "run_check".into(),
                description: "Validate".into(),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            }],
        };
        let body = AnthropicProvider::request_body(&request, true);
        assert_eq!(body["system"], "Be terse");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], true);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");

        let body = AnthropicProvider::request_body(&request, false);
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "thinking", "thinking": "considering"},
                    {"type": "text", "text": "Let me check"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "run_check", "input": {}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::to_provider_response(resp);
        assert_eq!(pr.message.id, "msg_02");
        assert_eq!(pr.message.text(), "Let me check");
        assert!(pr.message.wants_tools());
        let uses: Vec<_> = pr.message.tool_uses().collect();
        assert_eq!(uses, vec![("toolu_abc", "run_check", "{}")]);
        assert_eq!(pr.usage.unwrap().total(), 30);
    }

    #[test]
    fn parse_end_turn_response() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{
                "id": "msg_03",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();
        let pr = AnthropicProvider::to_provider_response(resp);
        assert_eq!(pr.message.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(pr.message.text(), "Hello!");
    }
}
