//! Generation backends for agentgate.
//!
//! All providers implement the `agentgate_core::Provider` trait.

pub mod anthropic;

pub use anthropic::{AnthropicProvider, SseParser};
