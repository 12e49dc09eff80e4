use super::InputMessage;
use crate::math::Vec2;
use crate::Tick;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Buffers client inputs keyed by the tick they are due on.
///
/// Remembers the last sequence consumed per client: anything at or below it
/// is rejected on arrival and skipped on drain, so an older input can never
/// override a newer one and a re-sent input is never applied twice.
#[derive(Clone, Debug, Default)]
pub struct InputQueue {
    pending: BTreeMap<Tick, Vec<InputMessage>>,

    /// Highest sequence applied per client
    consumed: BTreeMap<String, u64>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an input relative to the last completed tick.
    ///
    /// Inputs intended for a tick that was already processed land on the next
    /// tick. Returns the due tick, or `None` when the same (client, sequence)
    /// pair is already pending or the sequence was already superseded.
    pub fn queue(&mut self, mut input: InputMessage, current_tick: Tick) -> Option<Tick> {
        if self.is_superseded(&input) {
            warn!(
                client_id = %input.client_id,
                sequence = input.sequence,
                last_consumed = self.last_consumed(&input.client_id),
                "Ignoring superseded input"
            );
            return None;
        }
        if self.contains(&input.client_id, input.sequence) {
            warn!(
                client_id = %input.client_id,
                sequence = input.sequence,
                "Ignoring duplicate input"
            );
            return None;
        }

        if !input.movement.is_finite() {
            warn!(
                client_id = %input.client_id,
                sequence = input.sequence,
                "Non-finite movement replaced with zero"
            );
            input.movement = Vec2::ZERO;
        }

        let due = input.intended_server_tick.max(current_tick + 1);
        if due != input.intended_server_tick {
            debug!(
                client_id = %input.client_id,
                sequence = input.sequence,
                intended = input.intended_server_tick,
                due,
                "Stale input shifted to next tick"
            );
        }

        self.pending.entry(due).or_default().push(input);
        Some(due)
    }

    /// Remove and return the inputs due on `tick`, ordered by
    /// (sequence, client id).
    ///
    /// Inputs whose sequence was superseded by one consumed on an earlier
    /// tick are dropped.
    pub fn drain(&mut self, tick: Tick) -> Vec<InputMessage> {
        let mut inputs = self.pending.remove(&tick).unwrap_or_default();
        inputs.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });

        inputs.retain(|input| {
            if self.is_superseded(input) {
                debug!(
                    tick,
                    client_id = %input.client_id,
                    sequence = input.sequence,
                    "Dropping superseded input"
                );
                return false;
            }
            true
        });
        for input in &inputs {
            self.consumed.insert(input.client_id.clone(), input.sequence);
        }
        inputs
    }

    fn is_superseded(&self, input: &InputMessage) -> bool {
        self.last_consumed(&input.client_id)
            .map_or(false, |last| input.sequence <= last)
    }

    /// Highest sequence consumed from `client_id`
    pub fn last_consumed(&self, client_id: &str) -> Option<u64> {
        self.consumed.get(client_id).copied()
    }

    /// Highest consumed sequence per client (captured in mementos)
    pub fn consumed_sequences(&self) -> &BTreeMap<String, u64> {
        &self.consumed
    }

    /// Replace the consumed sequences, e.g. with a restored memento's
    pub fn restore_sequences(&mut self, consumed: BTreeMap<String, u64>) {
        self.consumed = consumed;
    }

    /// True when the (client, sequence) pair is pending on any tick
    pub fn contains(&self, client_id: &str, sequence: u64) -> bool {
        self.pending
            .values()
            .flatten()
            .any(|m| m.sequence == sequence && m.client_id == client_id)
    }

    /// Number of pending inputs across all ticks
    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest tick with pending inputs
    pub fn next_due(&self) -> Option<Tick> {
        self.pending.keys().next().copied()
    }

    /// Drop pending inputs; consumed sequences are kept
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
