//! Reassembles a streamed response into one complete [`Message`].
//!
//! Each content block gets its own accumulator, keyed by the wire index and
//! typed by the kind announced at `BlockStart`. Text fragments are forwarded
//! to the caller as they arrive; tool-argument JSON is only buffered, since a
//! partial JSON document means nothing on its own.
//!
//! One reconstructor handles exactly one message and expects events in
//! order from a single producer.

use std::collections::HashMap;

use agentgate_core::error::ProviderError;
use agentgate_core::message::{ContentBlock, Message, StopReason};
use agentgate_core::provider::{
    BlockDelta, BlockKind, EventStream, ProviderResponse, StreamEvent, Usage,
};
use tracing::{trace, warn};

enum Accumulator {
    Text(String),
    ToolUse { id: String, name: String, json: String },
}

struct Slot {
    acc: Accumulator,
    closed: bool,
}

impl Slot {
    fn freeze(self) -> ContentBlock {
        match self.acc {
            Accumulator::Text(text) => ContentBlock::Text { text },
            Accumulator::ToolUse { id, name, json } => ContentBlock::ToolUse {
                id,
                name,
                input: json,
            },
        }
    }
}

/// Incremental assembler for one streamed message.
#[derive(Default)]
pub struct StreamReconstructor {
    message_id: Option<String>,
    model: String,
    /// Blocks in arrival order, which is generation order.
    slots: Vec<Slot>,
    /// Wire index → position in `slots`.
    positions: HashMap<usize, usize>,
    stop_reason: Option<StopReason>,
    usage: Option<Usage>,
    saw_message_delta: bool,
    stopped: bool,
}

impl StreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a provider stream into a finished response, forwarding text
    /// fragments to `on_text` as they arrive.
    pub async fn collect(
        mut events: EventStream,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ProviderResponse, ProviderError> {
        let mut reconstructor = Self::new();
        while let Some(event) = events.recv().await {
            if reconstructor.apply(event?, on_text)? {
                break;
            }
        }
        reconstructor.finish()
    }

    /// Apply one event. Returns `true` once the message is complete.
    pub fn apply(
        &mut self,
        event: StreamEvent,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> Result<bool, ProviderError> {
        if self.stopped {
            trace!("Ignoring event after message stop");
            return Ok(true);
        }

        match event {
            StreamEvent::MessageStart { id, model } => {
                self.message_id = Some(id);
                self.model = model;
            }
            StreamEvent::BlockStart { index, kind } => {
                if self.positions.contains_key(&index) {
                    return Err(ProviderError::MalformedStream(format!(
                        "block {index} started twice"
                    )));
                }
                let acc = match kind {
                    BlockKind::Text => Accumulator::Text(String::new()),
                    BlockKind::ToolUse { id, name } => Accumulator::ToolUse {
                        id,
                        name,
                        json: String::new(),
                    },
                };
                self.positions.insert(index, self.slots.len());
                self.slots.push(Slot { acc, closed: false });
            }
            StreamEvent::BlockDelta { index, delta } => {
                let slot = self.slot_mut(index)?;
                if slot.closed {
                    return Err(ProviderError::MalformedStream(format!(
                        "delta for block {index} after it stopped"
                    )));
                }
                match (&mut slot.acc, delta) {
                    (Accumulator::Text(text), BlockDelta::Text(fragment)) => {
                        text.push_str(&fragment);
                        on_text(&fragment);
                    }
                    (Accumulator::ToolUse { json, .. }, BlockDelta::InputJson(fragment)) => {
                        json.push_str(&fragment);
                    }
                    (_, delta) => {
                        warn!(index, ?delta, "Delta kind does not match block kind, dropped");
                    }
                }
            }
            StreamEvent::BlockStop { index } => {
                self.slot_mut(index)?.closed = true;
            }
            StreamEvent::MessageDelta { stop_reason, usage } => {
                self.saw_message_delta = true;
                if stop_reason.is_some() {
                    self.stop_reason = stop_reason;
                }
                if usage.is_some() {
                    self.usage = usage;
                }
            }
            StreamEvent::MessageStop => {
                self.stopped = true;
            }
        }
        Ok(self.stopped)
    }

    /// Freeze every block and produce the message.
    ///
    /// Blocks that never saw a `BlockStop` are frozen from whatever they
    /// accumulated. A stream that ended before any message-level completion
    /// signal is treated as interrupted.
    pub fn finish(self) -> Result<ProviderResponse, ProviderError> {
        if !self.stopped && !self.saw_message_delta {
            return Err(ProviderError::StreamInterrupted(
                "stream ended before the message completed".into(),
            ));
        }

        let blocks = self.slots.into_iter().map(Slot::freeze).collect();
        let mut message = Message::assistant_blocks(blocks, self.stop_reason);
        if let Some(id) = self.message_id {
            message.id = id;
        }

        Ok(ProviderResponse {
            message,
            usage: self.usage,
            model: self.model,
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Slot, ProviderError> {
        let position = *self.positions.get(&index).ok_or_else(|| {
            ProviderError::MalformedStream(format!("event for unknown block {index}"))
        })?;
        Ok(&mut self.slots[position])
    }
}
