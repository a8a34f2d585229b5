//! # agentgate core
//!
//! Domain types, traits, and error definitions for the agentgate runtime.
//! This crate has no framework dependencies beyond serde and tokio's sync
//! primitives; every other crate depends inward on it.
//!
//! - [`message`]: messages, content blocks, stop reasons
//! - [`provider`]: the generation backend trait and its stream events
//! - [`tool`]: the tool trait and the shared [`ToolRegistry`]
//! - [`event`]: domain events for observing a run

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{ContentBlock, ConversationId, Message, Role, StopReason};
pub use provider::{
    BlockDelta, BlockKind, EventStream, Provider, ProviderRequest, ProviderResponse, StreamEvent,
    Usage,
};
pub use tool::{FnTool, Tool, ToolCall, ToolDescriptor, ToolRegistry, ToolResult};
