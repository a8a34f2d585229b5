//! # agentgate protocol
//!
//! Exposes a [`ToolRegistry`](agentgate_core::ToolRegistry) over
//! newline-delimited JSON-RPC 2.0: `initialize`, `tools/list`, `tools/call`
//! and the `notifications/initialized` notification.

pub mod dispatcher;
pub mod jsonrpc;
pub mod server;

pub use dispatcher::Dispatcher;
pub use jsonrpc::{Request, Response, RpcError, ServerInfo, ToolCallResult};
pub use server::{DEFAULT_MAX_LINE_BYTES, LineServer, ProtocolError, ServeStats};
