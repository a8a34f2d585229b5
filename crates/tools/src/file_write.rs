//! File write tool: create or overwrite a file inside the workspace.

use agentgate_core::error::ToolError;
use agentgate_core::tool::Tool;
use async_trait::async_trait;
use tracing::debug;

use crate::workspace::Workspace;

pub struct FileWriteTool {
    workspace: Workspace,
}

impl FileWriteTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file in the workspace. Creates the file and any missing parent directories, overwrites if it exists."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "file_write".into(),
                reason: e.to_string(),
            })?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::failed("file_write", format!("Failed to create directory: {e}"))
            })?;
        }

        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| ToolError::failed("file_write", format!("Failed to write {path}: {e}")))?;

        debug!(path = %resolved.display(), bytes = content.len(), "Wrote file");
        Ok(format!("Successfully wrote {} bytes to {path}", content.len()))
    }
}
