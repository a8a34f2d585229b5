//! Per-run conversation state.

use std::sync::Arc;

use agentgate_core::message::{ConversationId, Message, Role};
use agentgate_core::tool::ToolRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::GateState;

/// One question the model asked and the answer it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub answer: String,
}

/// History, tool catalog and gate state for one run.
///
/// History is append-only: messages are pushed, never edited or removed.
pub struct Session {
    id: ConversationId,
    messages: Vec<Message>,
    registry: Arc<ToolRegistry>,
    pub(crate) gate: GateState,
    pub(crate) questions: Vec<QuestionRecord>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            registry,
            gate: GateState::default(),
            questions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Session seeded with the user's opening prompt.
    pub fn with_prompt(registry: Arc<ToolRegistry>, prompt: impl Into<String>) -> Self {
        let mut session = Self::new(registry);
        session.push(Message::user(prompt));
        session
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &GateState {
        &self.gate
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Text of the most recent assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(Message::text)
    }
}
