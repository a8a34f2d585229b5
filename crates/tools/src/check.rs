//! Check tool: run the configured validation command.
//!
//! The command runs through `sh -c` in the workspace root. A zero exit is a
//! pass; anything else, including a timeout, is reported as a tool failure
//! so the completion gate records the check as failed.

use std::path::PathBuf;
use std::time::Duration;

use agentgate_core::error::ToolError;
use agentgate_core::tool::Tool;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct RunCheckTool {
    command: String,
    cwd: PathBuf,
    timeout: Duration,
}

impl RunCheckTool {
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Tool for RunCheckTool {
    fn name(&self) -> &str {
        "run_check"
    }

    fn description(&self) -> &str {
        "Validate the workspace by running the project's check command. Reports pass or fail with the command output."
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        debug!(command = %self.command, cwd = %self.cwd.display(), "Running check");

        let child = if cfg!(target_os = "windows") {
            Command::new("cmd")
                .args(["/C", &self.command])
                .current_dir(&self.cwd)
                .kill_on_drop(true)
                .output()
        } else {
            Command::new("sh")
                .args(["-c", &self.command])
                .current_dir(&self.cwd)
                .kill_on_drop(true)
                .output()
        };

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                ToolError::failed(
                    "run_check",
                    format!("check timed out after {}s", self.timeout.as_secs()),
                )
            })?
            .map_err(|e| ToolError::failed("run_check", e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{stdout}\n{stderr}").trim().to_string();

        if output.status.success() {
            Ok(if combined.is_empty() {
                "Check passed".to_string()
            } else {
                format!("Check passed\n{combined}")
            })
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %self.command, exit_code = code, "Check failed");
            Err(ToolError::failed(
                "run_check",
                format!("[exit code: {code}]\n{combined}"),
            ))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn tool(command: &str) -> RunCheckTool {
        RunCheckTool::new(command, std::env::temp_dir(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn passing_check() {
        let output = tool("echo all good").execute(serde_json::json!({})).await.unwrap();
        assert!(output.starts_with("Check passed"));
        assert!(output.contains("all good"));
    }

    #[tokio::test]
    async fn failing_check_is_tool_error() {
        let err = tool("echo broken >&2; exit 3")
            .execute(serde_json::json!({}))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit code: 3"));
        assert!(msg.contains("broken"));
    }

    #[tokio::test]
    async fn runs_in_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let tool = RunCheckTool::new("test -f marker", dir.path(), Duration::from_secs(10));
        assert!(tool.execute(serde_json::json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn timeout_is_failure() {
        let tool = RunCheckTool::new("sleep 5", std::env::temp_dir(), Duration::from_millis(100));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
