//! Terminal front end for a run: answers questions from stdin and renders
//! live events.

use std::io::Write;

use agentgate_agent::{AgentStreamEvent, Question, QuestionResponder};
use agentgate_core::error::ToolError;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Asks the person at the terminal.
pub struct ConsoleResponder {
    tool_name: String,
}

impl ConsoleResponder {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
        }
    }
}

#[async_trait]
impl QuestionResponder for ConsoleResponder {
    async fn ask(&self, question: &Question) -> Result<String, ToolError> {
        eprintln!();
        eprintln!("  ❓ {}", question.question);
        for (i, option) in question.options.iter().enumerate() {
            eprintln!("     {}. {option}", i + 1);
        }
        eprint!("  > ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| ToolError::failed(&self.tool_name, e.to_string()))?;
        if read == 0 {
            return Err(ToolError::failed(&self.tool_name, "no answer: stdin is closed"));
        }

        Ok(resolve_answer(question, &line))
    }
}

/// A bare option number picks that option; anything else is taken verbatim.
pub fn resolve_answer(question: &Question, input: &str) -> String {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i))
        .cloned()
        .unwrap_or_else(|| input.to_string())
}

/// Render one live event. Returns true when model text reached stdout.
pub fn render(event: &AgentStreamEvent) -> bool {
    match event {
        AgentStreamEvent::Chunk { content } => {
            print!("{content}");
            let _ = std::io::stdout().flush();
            return true;
        }
        AgentStreamEvent::ToolCall { name, input, .. } => {
            eprintln!();
            eprintln!("  → {name} {}", preview(input, 120));
        }
        AgentStreamEvent::ToolResult {
            name,
            output,
            is_error,
            ..
        } => {
            let mark = if *is_error { "✗" } else { "✓" };
            eprintln!("  {mark} {name}: {}", preview(output, 200));
        }
        AgentStreamEvent::GateVeto { reason } => {
            eprintln!();
            eprintln!("  ✋ gate: {reason}");
        }
        AgentStreamEvent::Done {
            turns,
            tool_calls,
            gate_vetoes,
            usage,
            ..
        } => {
            eprintln!();
            let tokens = usage.map(|u| u.total()).unwrap_or(0);
            eprintln!(
                "  Done: {turns} turns, {tool_calls} tool calls, {gate_vetoes} vetoes, {tokens} tokens"
            );
        }
        AgentStreamEvent::Error { message } => {
            eprintln!();
            eprintln!("  [Error] {message}");
        }
    }
    false
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
