use crate::entity::EntityId;
use crate::math::Vec2;
use crate::Tick;
use serde::{Deserialize, Serialize};

mod queue;
#[cfg(test)]
mod tests;

pub use queue::InputQueue;

/// InputMessage is one client command, consumed at a single tick.
///
/// Sequence numbers are strictly increasing per client. Messages may arrive
/// out of order; the queue orders them by sequence, never by arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMessage {
    /// Submitting client (matches entity `ownerId`)
    pub client_id: String,

    /// Per-client sequence number
    pub sequence: u64,

    /// Client's local tick at submission
    pub client_tick: Tick,

    /// Server tick the client wants this input applied on
    pub intended_server_tick: Tick,

    /// Desired movement direction; clamped to unit length when applied
    pub movement: Vec2,

    /// Ordered character actions
    #[serde(default)]
    pub actions: Vec<InputAction>,

    /// Unix epoch milliseconds (client time, informational)
    #[serde(default)]
    pub timestamp: i64,
}

impl InputMessage {
    pub fn new(client_id: &str, sequence: u64, intended_server_tick: Tick, movement: Vec2) -> Self {
        Self {
            client_id: client_id.to_string(),
            sequence,
            client_tick: intended_server_tick,
            intended_server_tick,
            movement,
            actions: Vec::new(),
            timestamp: 0,
        }
    }

    pub fn with_action(mut self, action: InputAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Character action carried by an input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputAction {
    /// Use attack `attack` (index into the actor's attack list) on `target`
    Attack { attack: usize, target: EntityId },

    /// Cast spell `spell` on `target`, or on the caster when omitted
    Cast {
        spell: usize,
        #[serde(default)]
        target: Option<EntityId>,
    },

    /// Consume one charge of consumable `item`
    Use { item: EntityId },
}
