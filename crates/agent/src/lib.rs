//! The agent side of agentgate.
//!
//! A run follows a **Request → Dispatch → Gate** cycle:
//!
//! 1. **Request** a message from the provider, reassembling it from the
//!    event stream when streaming is on
//! 2. **Dispatch** any tool calls in order and feed the results back
//! 3. **Gate** the finish: the model may only stop once its work has been
//!    validated, otherwise it is sent back with an enforcement message
//!
//! The loop ends when the gate approves, the caller cancels, or the
//! provider fails.

pub mod gate;
pub mod loop_runner;
pub mod responder;
pub mod session;
pub mod stream;
pub mod stream_event;

pub use gate::{CompletionGate, GateState, GateVerdict};
pub use loop_runner::{ConversationLoop, DEFAULT_QUESTION_TOOL, RunOutcome};
pub use responder::{Question, QuestionResponder, SessionSink};
pub use session::{QuestionRecord, Session};
pub use stream::StreamReconstructor;
pub use stream_event::AgentStreamEvent;
