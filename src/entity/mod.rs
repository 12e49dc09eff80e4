use crate::math::Vec2;
use crate::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod spec;

pub use spec::{build_entity, EntitySpec, SpecError};

/// Stable entity identifier, allocated monotonically by the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity variant tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Character,
    Consumable,
    Effect,
    Collider,
    Generic,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Consumable => "consumable",
            EntityType::Effect => "effect",
            EntityType::Collider => "collider",
            EntityType::Generic => "generic",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned collider extent, centered on the entity position
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn half(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Effect vocabulary shared by effects, spells and consumables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Damage per tick (intensity rounded to whole hit points)
    Damage,
    /// Healing per tick
    Heal,
    /// Movement speed multiplied by `1 - intensity`
    Slow,
    /// No movement, AI or actions
    Stun,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Damage => "damage",
            EffectKind::Heal => "heal",
            EffectKind::Slow => "slow",
            EffectKind::Stun => "stun",
        }
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "damage" => Ok(EffectKind::Damage),
            "heal" => Ok(EffectKind::Heal),
            "slow" => Ok(EffectKind::Slow),
            "stun" => Ok(EffectKind::Stun),
            other => Err(format!("unknown effect '{}'", other)),
        }
    }
}

/// AI behaviour selected by a character's profile identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProfile {
    Idle,
    Wander,
    Chase,
    Aggressive,
}

impl AiProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProfile::Idle => "idle",
            AiProfile::Wander => "wander",
            AiProfile::Chase => "chase",
            AiProfile::Aggressive => "aggressive",
        }
    }
}

impl FromStr for AiProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AiProfile::Idle),
            "wander" => Ok(AiProfile::Wander),
            "chase" => Ok(AiProfile::Chase),
            "aggressive" => Ok(AiProfile::Aggressive),
            other => Err(format!("unknown ai profile '{}'", other)),
        }
    }
}

/// Character stat block
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub power: i32,
    pub armor: i32,
    /// Movement speed multiplier
    pub speed: f32,
    /// Spell cooldown divisor
    pub cast_speed: f32,
}

impl Stats {
    pub fn new(power: i32, armor: i32, speed: f32, cast_speed: f32) -> Self {
        Self {
            power,
            armor,
            speed,
            cast_speed,
        }
    }
}

/// Melee/ranged attack definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackDef {
    pub name: String,
    pub damage: i32,
    pub range: f32,
    #[serde(default)]
    pub cooldown_ticks: u64,
    #[serde(default)]
    pub crit_chance: f32,
    /// First tick at which the attack may be used again
    #[serde(default)]
    pub ready_at: Tick,
}

impl AttackDef {
    pub fn new(name: &str, damage: i32, range: f32, cooldown_ticks: u64) -> Self {
        Self {
            name: name.to_string(),
            damage,
            range,
            cooldown_ticks,
            crit_chance: 0.0,
            ready_at: 0,
        }
    }

    pub fn with_crit_chance(mut self, crit_chance: f32) -> Self {
        self.crit_chance = crit_chance;
        self
    }
}

/// Spell definition; casting spawns an effect entity on the target
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellDef {
    pub name: String,
    pub effect: EffectKind,
    pub intensity: f32,
    pub duration_ticks: u64,
    pub range: f32,
    #[serde(default)]
    pub cooldown_ticks: u64,
    #[serde(default)]
    pub ready_at: Tick,
}

impl SpellDef {
    pub fn new(
        name: &str,
        effect: EffectKind,
        intensity: f32,
        duration_ticks: u64,
        range: f32,
        cooldown_ticks: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            effect,
            intensity,
            duration_ticks,
            range,
            cooldown_ticks,
            ready_at: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    pub hp: i32,
    pub max_hp: i32,
    pub level: u32,
    pub stats: Stats,
    pub attacks: Vec<AttackDef>,
    pub spells: Vec<SpellDef>,
    pub ai_profile: Option<AiProfile>,
    /// Source of the most recent damage, reported as killer on death
    pub last_attacker: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumableState {
    pub effect_id: EffectKind,
    pub consumable_type: String,
    pub duration_ticks: u64,
    pub stackable: bool,
    pub charges: u32,
    /// Charges per unit, restored when a stacked unit is opened
    pub max_charges: u32,
    pub use_range: f32,
    pub quantity: u32,
    pub effect_value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectState {
    pub effect_type: EffectKind,
    pub intensity: f32,
    pub target_id: EntityId,
    pub caster_id: Option<EntityId>,
    pub remaining_ticks: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColliderState {
    pub width: f32,
    pub height: f32,
    pub passable: bool,
    pub is_trigger: bool,
}

/// Variant-specific entity data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntityKind {
    Character(CharacterState),
    Consumable(ConsumableState),
    Effect(EffectState),
    Collider(ColliderState),
    Generic,
}

/// Simulation entity (common fields plus variant data)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    /// Owning client identifier
    pub owner_id: String,
    pub is_alive: bool,
    pub is_input_driven: bool,
    pub collider: Option<Extent>,
    pub kind: EntityKind,
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self.kind {
            EntityKind::Character(_) => EntityType::Character,
            EntityKind::Consumable(_) => EntityType::Consumable,
            EntityKind::Effect(_) => EntityType::Effect,
            EntityKind::Collider(_) => EntityType::Collider,
            EntityKind::Generic => EntityType::Generic,
        }
    }

    pub fn as_character(&self) -> Option<&CharacterState> {
        match &self.kind {
            EntityKind::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut CharacterState> {
        match &mut self.kind {
            EntityKind::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_consumable(&self) -> Option<&ConsumableState> {
        match &self.kind {
            EntityKind::Consumable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_consumable_mut(&mut self) -> Option<&mut ConsumableState> {
        match &mut self.kind {
            EntityKind::Consumable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_effect(&self) -> Option<&EffectState> {
        match &self.kind {
            EntityKind::Effect(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_effect_mut(&mut self) -> Option<&mut EffectState> {
        match &mut self.kind {
            EntityKind::Effect(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_collider(&self) -> Option<&ColliderState> {
        match &self.kind {
            EntityKind::Collider(c) => Some(c),
            _ => None,
        }
    }

    /// Hit points, for characters
    pub fn hp(&self) -> Option<i32> {
        self.as_character().map(|c| c.hp)
    }

    /// Collider entities never move
    pub fn is_static(&self) -> bool {
        matches!(self.kind, EntityKind::Collider(_))
    }

    pub fn is_trigger(&self) -> bool {
        self.as_collider().map_or(false, |c| c.is_trigger)
    }

    pub fn is_passable(&self) -> bool {
        self.as_collider().map_or(false, |c| c.passable)
    }

    /// AI profile of a character that is not driven by client input
    pub fn ai_profile(&self) -> Option<AiProfile> {
        if self.is_input_driven {
            return None;
        }
        self.as_character().and_then(|c| c.ai_profile)
    }
}
