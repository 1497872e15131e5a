//! Front-end side of the bridge: turns inbound messages into queued commands.

use crate::{
    BridgeError, BridgeResult, FrameStats, FrameStatsSnapshot, InputPorts, PendingPayloadStore,
};
use bridge_protocol::{parse, Command, InputDevice, Message, Port};
use std::sync::Arc;
use transport::CommandRing;

/// What a handled message did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The command was pushed to the engine.
    Queued(Command),
    /// A port assignment was applied in place.
    Connected {
        port: Port,
        device: InputDevice,
        changed: bool,
    },
}

/// Sole producer of the command ring.
///
/// Not `Clone`: holding the only `FrontEnd` is what makes the ring
/// single-producer.
pub struct FrontEnd {
    ring: Arc<CommandRing>,
    payloads: Arc<PendingPayloadStore>,
    ports: Arc<InputPorts>,
    stats: Arc<FrameStats>,
    max_message_len: usize,
}

impl FrontEnd {
    pub(crate) fn new(
        ring: Arc<CommandRing>,
        payloads: Arc<PendingPayloadStore>,
        ports: Arc<InputPorts>,
        stats: Arc<FrameStats>,
        max_message_len: usize,
    ) -> Self {
        Self {
            ring,
            payloads,
            ports,
            stats,
            max_message_len,
        }
    }

    /// Parses one text message and applies it.
    ///
    /// A [`BridgeError::Protocol`] leaves every piece of shared state
    /// untouched. A payload is stored before its command is pushed.
    pub fn handle_message(&mut self, raw: &str) -> BridgeResult<Delivery> {
        let text = clip(raw, self.max_message_len);
        tracing::debug!(raw = text, "front-end message");

        match parse(text)? {
            Message::Connect { port, device } => {
                let changed = self.ports.connect(port, device);
                Ok(Delivery::Connected {
                    port,
                    device,
                    changed,
                })
            }
            Message::Queued { command, payload } => {
                if let Some(payload) = payload {
                    self.payloads.set(payload.slot, payload.value);
                }
                self.send(command)?;
                Ok(Delivery::Queued(command))
            }
        }
    }

    /// Pushes a command directly, bypassing the text grammar.
    pub fn send(&mut self, command: Command) -> BridgeResult<()> {
        let words = command.encode();
        self.ring.push_words(&words).map_err(|err| {
            tracing::error!(?command, %err, "command queue overflow");
            BridgeError::from(err)
        })
    }

    /// Stores a payload and pushes its command, for callers that already hold
    /// typed values.
    pub fn send_with_payload(
        &mut self,
        command: Command,
        value: impl Into<String>,
    ) -> BridgeResult<()> {
        if let Some(slot) = command.payload_slot() {
            self.payloads.set(slot, value);
        }
        self.send(command)
    }

    pub fn input_ports(&self) -> &InputPorts {
        &self.ports
    }

    pub fn frame_stats(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    /// Words waiting for the engine.
    pub fn queued_words(&self) -> usize {
        self.ring.len()
    }
}

fn clip(raw: &str, max_len: usize) -> &str {
    if raw.len() <= max_len {
        return raw;
    }
    let mut end = max_len;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    tracing::debug!(len = raw.len(), max_len, "front-end message truncated");
    &raw[..end]
}
