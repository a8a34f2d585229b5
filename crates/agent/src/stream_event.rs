//! Agent-level live events.
//!
//! `AgentStreamEvent` lifts provider fragments and loop milestones into
//! events a front end can render as they happen.

use agentgate_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted by the conversation loop while it runs.
///
/// - `chunk`       partial text from the model
/// - `tool_call`   the model asked for a tool
/// - `tool_result` a tool finished
/// - `gate_veto`   the completion gate refused to finish
/// - `done`        the run ended cleanly
/// - `error`       the run ended with an error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text token from the model.
    Chunk { content: String },

    /// The agent is calling a tool. `input` is the raw argument text.
    ToolCall {
        id: String,
        name: String,
        input: String,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },

    /// The gate sent the model back to work.
    GateVeto { reason: String },

    /// The run is complete.
    Done {
        conversation_id: String,
        usage: Option<Usage>,
        turns: u32,
        tool_calls: u32,
        gate_vetoes: u32,
    },

    /// The run failed.
    Error { message: String },
}

impl AgentStreamEvent {
    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::GateVeto { .. } => "gate_veto",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}
