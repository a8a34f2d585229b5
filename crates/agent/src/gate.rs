//! Completion gate: the agent may not finish until its work is validated.
//!
//! Two rules run at different points of a turn:
//!
//! - the **per-turn rule**, after tool dispatch: writing without validating
//!   in the same turn earns a reminder appended to the tool results;
//! - the **end-turn rule**, when the model stops asking for tools: if there
//!   is anything to validate (or the model claims to be finished), it must
//!   have validated at least once, nothing may have changed since, and the
//!   last validation must have passed.
//!
//! The rules are pure functions over [`GateState`]; [`CompletionGate`] adds
//! the tool classification needed to fold a turn's calls into that state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const VALIDATE_BEFORE_CONTINUING: &str =
    "You changed files this turn without validating them. Run the check tool before doing anything else.";

pub const MUST_VALIDATE: &str =
    "You must validate your work at least once before finishing. Run the check tool now.";

pub const VALIDATE_AGAIN: &str =
    "Files changed since the last validation. Run the check tool again before finishing.";

pub const UNRESOLVED_ISSUES: &str =
    "The last validation found unresolved issues. Fix them and validate again before finishing.";

/// Phrases that signal the model believes it is finished.
pub const COMPLETION_PHRASES: [&str; 5] = ["done", "complete", "finished", "that's it", "all set"];

/// Validation state carried by a session across turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    /// At least one check has run.
    pub checked: bool,
    /// The most recent check succeeded.
    pub check_passed: bool,
    /// Something was written after the most recent check.
    pub pending_check: bool,
    /// How many times the end-turn rule refused completion.
    pub vetoes: u32,
    /// Paths (or tool names) touched by write tools, first-write order.
    pub artifacts: Vec<String>,
}

/// What one turn's tool calls did, as seen by the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnActivity {
    pub wrote: bool,
    pub ran_check: bool,
}

/// Outcome of the end-turn rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Approve,
    Veto(&'static str),
}

/// A dispatched call as the gate needs to see it.
#[derive(Debug, Clone, Copy)]
pub struct GateCall<'a> {
    pub name: &'a str,
    pub arguments: &'a Value,
    pub is_error: bool,
}

/// Per-turn rule.
pub fn per_turn_reminder(activity: TurnActivity) -> Option<&'static str> {
    (activity.wrote && !activity.ran_check).then_some(VALIDATE_BEFORE_CONTINUING)
}

/// Case-insensitive substring match against [`COMPLETION_PHRASES`].
pub fn claims_completion(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMPLETION_PHRASES.iter().any(|p| lower.contains(p))
}

/// End-turn rule. Checks run in a fixed order and the first failure wins.
pub fn end_turn_verdict(state: &GateState, assistant_text: &str) -> GateVerdict {
    if state.artifacts.is_empty() && !claims_completion(assistant_text) {
        return GateVerdict::Approve;
    }
    if !state.checked {
        return GateVerdict::Veto(MUST_VALIDATE);
    }
    if state.pending_check {
        return GateVerdict::Veto(VALIDATE_AGAIN);
    }
    if !state.check_passed {
        return GateVerdict::Veto(UNRESOLVED_ISSUES);
    }
    GateVerdict::Approve
}

/// Tool classification plus the stateful side of the rules.
#[derive(Debug, Clone)]
pub struct CompletionGate {
    write_tools: BTreeSet<String>,
    check_tools: BTreeSet<String>,
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new(["file_write"], ["run_check"])
    }
}

impl CompletionGate {
    pub fn new<W, C>(write_tools: W, check_tools: C) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            write_tools: write_tools.into_iter().map(Into::into).collect(),
            check_tools: check_tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_write_tool(&self, name: &str) -> bool {
        self.write_tools.contains(name)
    }

    pub fn is_check_tool(&self, name: &str) -> bool {
        self.check_tools.contains(name)
    }

    /// Fold one turn's dispatched calls into `state`, in call order.
    pub fn record_turn(&self, state: &mut GateState, calls: &[GateCall<'_>]) -> TurnActivity {
        let mut activity = TurnActivity::default();
        for call in calls {
            if self.is_write_tool(call.name) {
                activity.wrote = true;
                state.pending_check = true;
                let artifact = call
                    .arguments
                    .get("path")
                    .and_then(Value::as_str)
                    .unwrap_or(call.name);
                if !state.artifacts.iter().any(|a| a == artifact) {
                    state.artifacts.push(artifact.to_string());
                }
            } else if self.is_check_tool(call.name) {
                activity.ran_check = true;
                state.checked = true;
                state.pending_check = false;
                state.check_passed = !call.is_error;
            }
        }
        activity
    }

    /// Apply the end-turn rule, counting a veto when one is issued.
    pub fn evaluate(&self, state: &mut GateState, assistant_text: &str) -> GateVerdict {
        let verdict = end_turn_verdict(state, assistant_text);
        if matches!(verdict, GateVerdict::Veto(_)) {
            state.vetoes += 1;
        }
        verdict
    }
}
