//! The conversation loop.
//!
//! `Requesting → (ToolDispatch | GateCheck) → Requesting | Done`, with
//! cancellation honoured before every request. A `tool_use` stop dispatches
//! the turn's calls in order and loops; any other stop reason goes to the
//! completion gate, which either sends the model back with an enforcement
//! message or lets the run finish.

use std::sync::Arc;
use std::time::Instant;

use agentgate_core::error::{Error, ToolError};
use agentgate_core::event::{DomainEvent, EventBus};
use agentgate_core::message::{ContentBlock, Message};
use agentgate_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use agentgate_core::tool::{ToolCall, ToolDescriptor, ToolResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gate::{CompletionGate, GateCall, GateVerdict, per_turn_reminder};
use crate::responder::{Question, QuestionResponder, SessionSink};
use crate::session::{QuestionRecord, Session};
use crate::stream::StreamReconstructor;
use crate::stream_event::AgentStreamEvent;

/// Default name of the reserved question tool.
pub const DEFAULT_QUESTION_TOOL: &str = "ask_user";

/// Statistics for a run that reached Done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub conversation_id: String,
    pub turns: u32,
    pub tool_calls: u32,
    pub gate_vetoes: u32,
    pub usage: Usage,
    /// Text of the final assistant message.
    pub final_text: String,
}

/// Drives one session from its opening prompt to an approved finish.
pub struct ConversationLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: Option<String>,
    streaming: bool,
    max_turns: Option<u32>,
    gate: CompletionGate,
    question_tool: String,
    responder: Option<Arc<dyn QuestionResponder>>,
    session_sink: Option<Arc<dyn SessionSink>>,
    event_bus: Arc<EventBus>,
    live: Option<mpsc::UnboundedSender<AgentStreamEvent>>,
}

impl ConversationLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
            streaming: true,
            max_turns: None,
            gate: CompletionGate::default(),
            question_tool: DEFAULT_QUESTION_TOOL.to_string(),
            responder: None,
            session_sink: None,
            event_bus,
            live: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Use the provider's event stream (default) or its one-shot completion.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_max_turns(mut self, max: Option<u32>) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_gate(mut self, gate: CompletionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_question_tool(mut self, name: impl Into<String>) -> Self {
        self.question_tool = name.into();
        self
    }

    pub fn with_responder(mut self, responder: Arc<dyn QuestionResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn with_session_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.session_sink = Some(sink);
        self
    }

    /// Forward live [`AgentStreamEvent`]s to `tx`.
    pub fn with_live_events(mut self, tx: mpsc::UnboundedSender<AgentStreamEvent>) -> Self {
        self.live = Some(tx);
        self
    }

    /// Run until the gate approves, the caller cancels, or an error occurs.
    pub async fn run(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, Error> {
        info!(
            conversation_id = %session.id(),
            model = %self.model,
            streaming = self.streaming,
            "Starting run"
        );

        let mut outcome = RunOutcome {
            conversation_id: session.id().to_string(),
            ..RunOutcome::default()
        };

        let result = self.drive(session, cancel, &mut outcome).await;
        match &result {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                info!(conversation_id = %session.id(), turns = outcome.turns, "Run cancelled");
            }
            Err(e) => {
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("conversation {}", session.id()),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.emit(AgentStreamEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        result?;

        outcome.gate_vetoes = session.gate().vetoes;
        outcome.final_text = session.last_assistant_text().unwrap_or_default();

        if let Some(sink) = &self.session_sink
            && let Err(e) = sink.record(session, &outcome).await
        {
            warn!(error = %e, "Session sink failed");
        }

        self.event_bus.publish(DomainEvent::RunFinished {
            conversation_id: outcome.conversation_id.clone(),
            turns: outcome.turns,
            gate_vetoes: outcome.gate_vetoes,
            timestamp: Utc::now(),
        });
        self.emit(AgentStreamEvent::Done {
            conversation_id: outcome.conversation_id.clone(),
            usage: Some(outcome.usage),
            turns: outcome.turns,
            tool_calls: outcome.tool_calls,
            gate_vetoes: outcome.gate_vetoes,
        });
        info!(
            conversation_id = %outcome.conversation_id,
            turns = outcome.turns,
            tool_calls = outcome.tool_calls,
            gate_vetoes = outcome.gate_vetoes,
            "Run finished"
        );
        Ok(outcome)
    }

    async fn drive(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
        outcome: &mut RunOutcome,
    ) -> Result<(), Error> {
        loop {
            // ── Requesting ──
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(limit) = self.max_turns
                && outcome.turns >= limit
            {
                warn!(conversation_id = %session.id(), limit, "Turn limit reached");
                return Err(Error::TurnLimitExceeded { limit });
            }
            outcome.turns += 1;
            debug!(conversation_id = %session.id(), turn = outcome.turns, "Requesting");

            let request = self.build_request(session);
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                response = self.request(request) => response?,
            };

            if let Some(usage) = response.usage {
                outcome.usage.input_tokens += usage.input_tokens;
                outcome.usage.output_tokens += usage.output_tokens;
            }
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: session.id().to_string(),
                model: response.model.clone(),
                tokens_used: response.usage.map(|u| u.total()).unwrap_or(0),
                timestamp: Utc::now(),
            });

            let message = response.message;
            let calls: Vec<ToolCall> = message
                .tool_uses()
                .map(|(id, name, input)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: input.to_string(),
                })
                .collect();
            let dispatch = message.wants_tools() && !calls.is_empty();
            let text = message.text();
            session.push(message);

            if dispatch {
                // ── ToolDispatch ──
                debug!(tool_count = calls.len(), "Executing tool calls");
                self.dispatch_turn(session, &calls).await;
                outcome.tool_calls += calls.len() as u32;
                continue;
            }

            // ── GateCheck ──
            match self.gate.evaluate(&mut session.gate, &text) {
                GateVerdict::Approve => return Ok(()),
                GateVerdict::Veto(reason) => {
                    warn!(conversation_id = %session.id(), reason, "Completion vetoed");
                    self.event_bus.publish(DomainEvent::GateVetoed {
                        conversation_id: session.id().to_string(),
                        reason: reason.to_string(),
                        timestamp: Utc::now(),
                    });
                    self.emit(AgentStreamEvent::GateVeto {
                        reason: reason.to_string(),
                    });
                    session.push(Message::user(reason));
                }
            }
        }
    }

    fn build_request(&self, session: &Session) -> ProviderRequest {
        let mut tools = session.registry().list_tools();
        if self.responder.is_some() && !tools.iter().any(|t| t.name == self.question_tool) {
            tools.push(question_tool_descriptor(&self.question_tool));
        }

        ProviderRequest {
            model: self.model.clone(),
            system: self.system_prompt.clone(),
            messages: session.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
        }
    }

    async fn request(&self, request: ProviderRequest) -> Result<ProviderResponse, Error> {
        if !self.streaming {
            return Ok(self.provider.complete(request).await?);
        }

        let events = self.provider.stream(request).await?;
        let mut forward = |text: &str| {
            self.emit(AgentStreamEvent::Chunk {
                content: text.to_string(),
            })
        };
        Ok(StreamReconstructor::collect(events, &mut forward).await?)
    }

    /// Run every call in order, append one results message, then fold the
    /// turn into gate state.
    async fn dispatch_turn(&self, session: &mut Session, calls: &[ToolCall]) {
        let mut results = Vec::with_capacity(calls.len());
        let mut decoded = Vec::with_capacity(calls.len());

        for call in calls {
            self.emit(AgentStreamEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            });

            let start = Instant::now();
            let (arguments, result) = match decode_arguments(&call.arguments) {
                Ok(arguments) => {
                    let result = self.execute_call(session, call, arguments.clone()).await;
                    (arguments, result)
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Malformed tool arguments");
                    (
                        Value::Null,
                        ToolResult::error(
                            &call.id,
                            format!("Invalid JSON arguments for {}: {e}", call.name),
                        ),
                    )
                }
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            if result.is_error {
                warn!(tool = %call.name, output = %result.content, "Tool call failed");
            }
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: !result.is_error,
                duration_ms,
                timestamp: Utc::now(),
            });
            self.emit(AgentStreamEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                output: result.content.clone(),
                is_error: result.is_error,
            });

            decoded.push(arguments);
            results.push(result);
        }

        let gate_calls: Vec<GateCall<'_>> = calls
            .iter()
            .zip(&decoded)
            .zip(&results)
            .map(|((call, arguments), result)| GateCall {
                name: &call.name,
                arguments,
                is_error: result.is_error,
            })
            .collect();
        let activity = self.gate.record_turn(&mut session.gate, &gate_calls);

        let mut blocks: Vec<ContentBlock> = results.into_iter().map(ContentBlock::from).collect();
        if let Some(reminder) = per_turn_reminder(activity) {
            debug!("Write without validation this turn, appending reminder");
            blocks.push(ContentBlock::text(reminder));
        }
        session.push(Message::tool_results(blocks));
    }

    async fn execute_call(
        &self,
        session: &mut Session,
        call: &ToolCall,
        arguments: Value,
    ) -> ToolResult {
        if call.name == self.question_tool
            && let Some(responder) = &self.responder
        {
            return match ask(responder.as_ref(), arguments).await {
                Ok(record) => {
                    let answer = record.answer.clone();
                    session.questions.push(record);
                    ToolResult::ok(&call.id, answer)
                }
                Err(e) => ToolResult::error(&call.id, e.to_string()),
            };
        }

        let outcome = session.registry().execute(&call.name, arguments).await;
        ToolResult::from_outcome(&call.id, outcome)
    }

    fn emit(&self, event: AgentStreamEvent) {
        if let Some(tx) = &self.live {
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(event);
        }
    }
}

/// Empty input means "no arguments"; anything else must be valid JSON.
fn decode_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

async fn ask(
    responder: &dyn QuestionResponder,
    arguments: Value,
) -> Result<QuestionRecord, ToolError> {
    let question: Question = serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("question tool: {e}")))?;
    let answer = responder.ask(&question).await?;
    Ok(QuestionRecord {
        question: question.question,
        options: question.options,
        answer,
    })
}

fn question_tool_descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: "Ask the user a question and wait for the answer.".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "options": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["question"]
        }),
    }
}
