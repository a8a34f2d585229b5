//! Provider trait: the abstraction over generation backends.
//!
//! A Provider knows how to send a conversation to a model and get a response
//! back, either as a complete message or as an ordered stream of incremental
//! [`StreamEvent`]s that the agent reassembles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::{ContentBlock, Message, StopReason};
use crate::tool::ToolDescriptor;

/// Receiving half of a streamed response.
pub type EventStream = mpsc::Receiver<std::result::Result<StreamEvent, ProviderError>>;

/// One request to the backend: full history plus system instructions and
/// the tool catalog as it stands right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// System instructions, sent out-of-band from the message list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message, stop reason included
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Kind of a content block announced by `BlockStart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    ToolUse { id: String, name: String },
}

/// A fragment routed into one block's accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fragment", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Decoded text, safe to show as it arrives.
    Text(String),
    /// A slice of tool-argument JSON; meaningless until the block stops.
    InputJson(String),
}

/// Incremental generation events for exactly one message, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { id: String, model: String },
    BlockStart { index: usize, kind: BlockKind },
    BlockDelta { index: usize, delta: BlockDelta },
    BlockStop { index: usize },
    MessageDelta {
        stop_reason: Option<StopReason>,
        usage: Option<Usage>,
    },
    MessageStop,
}

/// Replay a finished message as the event sequence a streaming backend
/// would have produced for it. `usage` rides on the closing message delta.
pub fn events_for_message(
    message: &Message,
    model: &str,
    usage: Option<Usage>,
) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::MessageStart {
        id: message.id.clone(),
        model: model.to_string(),
    }];

    let blocks = message.content.iter().filter_map(|block| match block {
        ContentBlock::Text { text } => Some((BlockKind::Text, BlockDelta::Text(text.clone()))),
        ContentBlock::ToolUse { id, name, input } => Some((
            BlockKind::ToolUse {
                id: id.clone(),
                name: name.clone(),
            },
            BlockDelta::InputJson(input.clone()),
        )),
        ContentBlock::ToolResult { .. } => None,
    });

    for (index, (kind, delta)) in blocks.enumerate() {
        events.push(StreamEvent::BlockStart { index, kind });
        events.push(StreamEvent::BlockDelta { index, delta });
        events.push(StreamEvent::BlockStop { index });
    }

    events.push(StreamEvent::MessageDelta {
        stop_reason: message.stop_reason.clone(),
        usage,
    });
    events.push(StreamEvent::MessageStop);
    events
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` or `stream()` without knowing which
/// backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get an ordered stream of generation events.
    ///
    /// Default implementation calls `complete()` and replays the result.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<EventStream, ProviderError> {
        let response = self.complete(request).await?;
        let events = events_for_message(&response.message, &response.model, response.usage);
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this never waits.
            let _ = tx.send(Ok(event)).await;
        }
        Ok(rx)
    }
}
