//! Configuration loading and validation for agentgate.
//!
//! Loads configuration from `~/.agentgate/config.toml` with environment
//! variable overrides. Every field has a default, so an absent file or a
//! partial one is fine. Validated once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentgate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the Messages API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System instructions sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_api_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("agent", &self.agent)
            .field("gate", &self.gate)
            .field("protocol", &self.protocol)
            .field("tools", &self.tools)
            .finish()
    }
}

/// Conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Request streamed responses and forward text as it arrives
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Upper bound on backend requests per run; 0 disables the limit
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Name of the reserved tool routed to the question responder
    #[serde(default = "default_question_tool")]
    pub question_tool: String,
}

fn default_max_turns() -> u32 {
    50
}
fn default_question_tool() -> String {
    "ask_user".into()
}

impl AgentConfig {
    pub fn turn_limit(&self) -> Option<u32> {
        (self.max_turns > 0).then_some(self.max_turns)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            max_turns: default_max_turns(),
            question_tool: default_question_tool(),
        }
    }
}

/// Which tools count as writes and which count as validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_write_tools")]
    pub write_tools: Vec<String>,

    #[serde(default = "default_check_tools")]
    pub check_tools: Vec<String>,
}

fn default_write_tools() -> Vec<String> {
    vec!["file_write".into()]
}
fn default_check_tools() -> Vec<String> {
    vec!["run_check".into()]
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            write_tools: default_write_tools(),
            check_tools: default_check_tools(),
        }
    }
}

/// JSON-RPC server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Longest accepted frame in bytes
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Name reported by `initialize`
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

fn default_max_line_bytes() -> usize {
    1024 * 1024
}
fn default_server_name() -> String {
    "agentgate".into()
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            server_name: default_server_name(),
        }
    }
}

/// Built-in tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory the file tools are confined to
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Shell command run by the check tool
    #[serde(default = "default_check_command")]
    pub check_command: String,

    /// Seconds before the check command is killed
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_check_command() -> String {
    "cargo check --quiet".into()
}
fn default_check_timeout_secs() -> u64 {
    300
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            check_command: default_check_command(),
            check_timeout_secs: default_check_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentgate/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides:
    /// - `AGENTGATE_API_KEY`, then `ANTHROPIC_API_KEY`, when no key is configured
    /// - `AGENTGATE_MODEL`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("AGENTGATE_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY"));
        }
        if let Some(model) = lookup("AGENTGATE_MODEL") {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.protocol.max_line_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "protocol.max_line_bytes must be > 0".into(),
            ));
        }

        if let Some(name) = self
            .gate
            .write_tools
            .iter()
            .find(|t| self.gate.check_tools.contains(t))
        {
            return Err(ConfigError::ValidationError(format!(
                "tool '{name}' cannot be both a write tool and a check tool"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render the defaults as TOML.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            agent: AgentConfig::default(),
            gate: GateConfig::default(),
            protocol: ProtocolConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.agent.streaming);
        assert_eq!(config.agent.question_tool, "ask_user");
        assert_eq!(config.protocol.max_line_bytes, 1024 * 1024);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gate.write_tools, config.gate.write_tools);
        assert_eq!(parsed.agent.turn_limit(), Some(50));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"claude-test\"\n[gate]\ncheck_tools = [\"run_check\", \"lint\"]\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.gate.check_tools, vec!["run_check", "lint"]);
        assert_eq!(config.gate.write_tools, vec!["file_write"]);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn zero_max_turns_means_unbounded() {
        let config: AppConfig = toml::from_str("[agent]\nmax_turns = 0\n").unwrap();
        assert_eq!(config.agent.turn_limit(), None);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_limits_rejected() {
        let config = AppConfig {
            max_tokens: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.protocol.max_line_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlapping_gate_tools_rejected() {
        let mut config = AppConfig::default();
        config.gate.check_tools.push("file_write".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("file_write"));
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, default_model());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-ant-fallback"),
            ("AGENTGATE_MODEL", "claude-override"),
        ]
        .into();
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-fallback"));
        assert_eq!(config.model, "claude-override");

        // A configured key wins over the environment.
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret-value".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("claude-sonnet-4"));
        assert!(toml_str.contains("[gate]"));
        assert!(toml_str.contains("run_check"));
    }
}
