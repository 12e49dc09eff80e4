use crate::entity::{EntityId, EntityType};
use crate::math::Vec2;
use crate::Tick;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod bus;
#[cfg(test)]
mod tests;

pub use bus::{EventBus, HandlerOutcome, SubscriptionToken};

/// Canonical event topics
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    EntitySpawn,
    EntityMove,
    EntityDamage,
    EntityDeath,
    EntityCollision,
    EntityCorrection,
    TickComplete,
    Snapshot,
    PhysicsContact,
    ColliderTrigger,
    ActionIntent,
    ActionResolved,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::EntitySpawn,
        Topic::EntityMove,
        Topic::EntityDamage,
        Topic::EntityDeath,
        Topic::EntityCollision,
        Topic::EntityCorrection,
        Topic::TickComplete,
        Topic::Snapshot,
        Topic::PhysicsContact,
        Topic::ColliderTrigger,
        Topic::ActionIntent,
        Topic::ActionResolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::EntitySpawn => "entity:spawn",
            Topic::EntityMove => "entity:move",
            Topic::EntityDamage => "entity:damage",
            Topic::EntityDeath => "entity:death",
            Topic::EntityCollision => "entity:collision",
            Topic::EntityCorrection => "entity:correction",
            Topic::TickComplete => "tick:complete",
            Topic::Snapshot => "snapshot",
            Topic::PhysicsContact => "physics:contact",
            Topic::ColliderTrigger => "collider:trigger",
            Topic::ActionIntent => "action:intent",
            Topic::ActionResolved => "action:resolved",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| EventError::UnknownTopic(s.to_string()))
    }
}

/// Dynamic event path errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown topic '{0}'")]
    UnknownTopic(String),

    #[error("payload does not match '{topic}' schema: {source}")]
    InvalidPayload {
        topic: Topic,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntitySpawnEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub pos: Vec2,
    pub owner_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityMoveEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityDamageEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub damage: i32,
    /// `None` for environmental damage (effects without a caster)
    pub attacker_id: Option<EntityId>,
    pub new_hp: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityDeathEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub killer_id: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityCollisionEvent {
    pub tick: Tick,
    pub entity_id_a: EntityId,
    pub entity_id_b: EntityId,
    pub contact_point: Vec2,
    /// Unit normal pointing from A towards B
    pub normal: Vec2,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityCorrectionEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub corrected_pos: Vec2,
    pub corrected_vel: Vec2,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TickCompleteEvent {
    pub tick: Tick,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnapshotEvent {
    pub tick: Tick,
    /// Memento as JSON
    pub serialized_state: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PhysicsContactEvent {
    pub tick: Tick,
    pub entity_id_a: EntityId,
    pub entity_id_b: EntityId,
    pub contact_point: Vec2,
    pub normal: Vec2,
    /// Penetration depth resolved along the normal
    pub impulse: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColliderTriggerEvent {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub collider_id: EntityId,
    pub trigger_pos: Vec2,
}

/// Action kinds carried by inputs and AI
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Attack,
    Cast,
    Use,
}

/// Why an action was not carried out
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    ActorUnavailable,
    Stunned,
    UnknownAction,
    OnCooldown,
    TargetUnavailable,
    OutOfRange,
    NoCharges,
}

/// Result of a resolved action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ActionOutcome {
    /// Attack landed
    Hit { damage: i32, critical: bool },
    /// Spell or timed consumable spawned an effect entity
    EffectApplied { effect: EntityId },
    /// Instant consumable applied `amount` hit points (heal positive)
    Consumed { amount: i32 },
    Rejected { reason: RejectReason },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionIntentEvent {
    pub tick: Tick,
    pub actor_id: EntityId,
    pub action_type: ActionType,
    pub target: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActionResolvedEvent {
    pub tick: Tick,
    pub actor_id: EntityId,
    pub action_type: ActionType,
    pub result: ActionOutcome,
}

/// Domain event emitted during a tick
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    EntitySpawn(EntitySpawnEvent),
    EntityMove(EntityMoveEvent),
    EntityDamage(EntityDamageEvent),
    EntityDeath(EntityDeathEvent),
    EntityCollision(EntityCollisionEvent),
    EntityCorrection(EntityCorrectionEvent),
    TickComplete(TickCompleteEvent),
    Snapshot(SnapshotEvent),
    PhysicsContact(PhysicsContactEvent),
    ColliderTrigger(ColliderTriggerEvent),
    ActionIntent(ActionIntentEvent),
    ActionResolved(ActionResolvedEvent),
}

/// Payload type bound to exactly one topic
pub trait TopicPayload: Clone + Serialize + 'static {
    const TOPIC: Topic;

    fn from_event(event: &GameEvent) -> Option<&Self>;
}

macro_rules! topic_payloads {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl TopicPayload for $payload {
                const TOPIC: Topic = Topic::$variant;

                fn from_event(event: &GameEvent) -> Option<&Self> {
                    match event {
                        GameEvent::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }

            impl From<$payload> for GameEvent {
                fn from(payload: $payload) -> Self {
                    GameEvent::$variant(payload)
                }
            }
        )*

        impl GameEvent {
            pub fn topic(&self) -> Topic {
                match self {
                    $(GameEvent::$variant(_) => Topic::$variant,)*
                }
            }

            pub fn tick(&self) -> Tick {
                match self {
                    $(GameEvent::$variant(payload) => payload.tick,)*
                }
            }

            /// camelCase JSON payload, as seen by dynamic subscribers
            pub fn payload_json(&self) -> serde_json::Result<Value> {
                match self {
                    $(GameEvent::$variant(payload) => serde_json::to_value(payload),)*
                }
            }

            /// Shape-check a JSON payload against the topic's schema
            pub fn from_json(topic: Topic, payload: Value) -> Result<GameEvent, EventError> {
                let event = match topic {
                    $(Topic::$variant => serde_json::from_value::<$payload>(payload)
                        .map(GameEvent::$variant),)*
                };
                event.map_err(|source| EventError::InvalidPayload { topic, source })
            }
        }
    };
}

topic_payloads! {
    EntitySpawn => EntitySpawnEvent,
    EntityMove => EntityMoveEvent,
    EntityDamage => EntityDamageEvent,
    EntityDeath => EntityDeathEvent,
    EntityCollision => EntityCollisionEvent,
    EntityCorrection => EntityCorrectionEvent,
    TickComplete => TickCompleteEvent,
    Snapshot => SnapshotEvent,
    PhysicsContact => PhysicsContactEvent,
    ColliderTrigger => ColliderTriggerEvent,
    ActionIntent => ActionIntentEvent,
    ActionResolved => ActionResolvedEvent,
}
