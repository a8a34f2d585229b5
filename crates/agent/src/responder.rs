//! Optional collaborators a run can be wired to.

use agentgate_core::error::{Error, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::loop_runner::RunOutcome;
use crate::session::Session;

/// A question the model wants a human to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Answers questions routed from the reserved question tool.
#[async_trait]
pub trait QuestionResponder: Send + Sync {
    async fn ask(&self, question: &Question) -> Result<String, ToolError>;
}

/// Receives a finished session. Failures are logged, not fatal.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn record(&self, session: &Session, outcome: &RunOutcome) -> Result<(), Error>;
}
