//! Built-in tool implementations for AgentGate.
//!
//! File tools are confined to the configured workspace root. `run_check`
//! is the validation step the completion gate watches for, and `echo` is
//! there for smoke-testing a server.

pub mod check;
pub mod echo;
pub mod file_read;
pub mod file_write;
pub mod workspace;

use std::time::Duration;

use agentgate_config::ToolsConfig;
use agentgate_core::tool::ToolRegistry;

pub use check::RunCheckTool;
pub use echo::EchoTool;
pub use file_read::FileReadTool;
pub use file_write::FileWriteTool;
pub use workspace::{PathError, Workspace};

/// Create a registry holding every built-in tool, configured from `config`.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let registry = ToolRegistry::new();
    let workspace = Workspace::new(config.workspace_root.clone());

    registry.register(FileReadTool::new(workspace.clone()));
    registry.register(FileWriteTool::new(workspace));
    registry.register(RunCheckTool::new(
        config.check_command.clone(),
        config.workspace_root.clone(),
        Duration::from_secs(config.check_timeout_secs),
    ));
    registry.register(EchoTool);

    tracing::debug!(tools = registry.len(), "Built-in tools registered");
    registry
}
