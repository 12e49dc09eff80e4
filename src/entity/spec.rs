use super::{
    AiProfile, AttackDef, CharacterState, ColliderState, ConsumableState, EffectKind,
    EffectState, Entity, EntityId, EntityKind, EntityType, Extent, SpellDef, Stats,
};
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spawn request for an entity.
///
/// Every field is optional on the wire; which ones are required depends on
/// the requested `type` and is checked by [`build_entity`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    #[serde(rename = "type")]
    pub entity_type: Option<EntityType>,
    pub pos: Option<Vec2>,
    pub vel: Option<Vec2>,
    pub rotation: Option<f32>,
    pub owner_id: Option<String>,
    pub is_alive: Option<bool>,
    pub is_input_driven: Option<bool>,
    pub collider_width: Option<f32>,
    pub collider_height: Option<f32>,

    // Character fields
    pub max_hp: Option<i32>,
    pub hp: Option<i32>,
    pub level: Option<u32>,
    pub stats: Option<Stats>,
    pub attack_defs: Option<Vec<AttackDef>>,
    pub spell_book: Option<Vec<SpellDef>>,
    pub ai_profile: Option<String>,

    // Consumable fields
    pub effect_id: Option<String>,
    pub duration_ticks: Option<u64>,
    pub stackable: Option<bool>,
    pub charges: Option<u32>,
    pub use_range: Option<f32>,
    pub consumable_type: Option<String>,
    pub quantity: Option<u32>,
    pub effect_value: Option<f32>,

    // Effect fields
    pub effect_type: Option<String>,
    pub intensity: Option<f32>,
    pub target_id: Option<EntityId>,
    pub caster_id: Option<EntityId>,
    pub duration: Option<u64>,

    // Collider fields
    pub passable: Option<bool>,
    pub is_trigger: Option<bool>,
}

impl EntitySpec {
    fn base(entity_type: EntityType, pos: Vec2, owner_id: &str) -> Self {
        Self {
            entity_type: Some(entity_type),
            pos: Some(pos),
            owner_id: Some(owner_id.to_string()),
            ..Default::default()
        }
    }

    pub fn generic(pos: Vec2, owner_id: &str) -> Self {
        Self::base(EntityType::Generic, pos, owner_id)
    }

    pub fn character(pos: Vec2, owner_id: &str, max_hp: i32, stats: Stats) -> Self {
        Self {
            max_hp: Some(max_hp),
            stats: Some(stats),
            ..Self::base(EntityType::Character, pos, owner_id)
        }
    }

    pub fn collider(pos: Vec2, owner_id: &str, width: f32, height: f32) -> Self {
        Self {
            collider_width: Some(width),
            collider_height: Some(height),
            ..Self::base(EntityType::Collider, pos, owner_id)
        }
    }

    pub fn consumable(pos: Vec2, owner_id: &str, effect: EffectKind, consumable_type: &str) -> Self {
        Self {
            effect_id: Some(effect.as_str().to_string()),
            consumable_type: Some(consumable_type.to_string()),
            ..Self::base(EntityType::Consumable, pos, owner_id)
        }
    }

    pub fn effect(
        pos: Vec2,
        owner_id: &str,
        effect: EffectKind,
        target: EntityId,
        duration: u64,
    ) -> Self {
        Self {
            effect_type: Some(effect.as_str().to_string()),
            target_id: Some(target),
            duration: Some(duration),
            ..Self::base(EntityType::Effect, pos, owner_id)
        }
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = Some(vel);
        self
    }

    pub fn with_extent(mut self, width: f32, height: f32) -> Self {
        self.collider_width = Some(width);
        self.collider_height = Some(height);
        self
    }

    pub fn input_driven(mut self) -> Self {
        self.is_input_driven = Some(true);
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn with_ai(mut self, profile: AiProfile) -> Self {
        self.ai_profile = Some(profile.as_str().to_string());
        self
    }

    pub fn with_attacks(mut self, attacks: Vec<AttackDef>) -> Self {
        self.attack_defs = Some(attacks);
        self
    }

    pub fn with_spells(mut self, spells: Vec<SpellDef>) -> Self {
        self.spell_book = Some(spells);
        self
    }
}

/// Spawn validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SpecError {
    SpecError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Builds an entity from a spawn request.
///
/// Validation rules:
/// - All variants: `pos` and a non-empty `ownerId`, finite numbers, `isAlive` not false
/// - Collider extent: both dimensions or neither, each positive
/// - Character: `maxHp > 0` and `stats`; `hp` within `1..=maxHp`
/// - Consumable: `effectId` and `consumableType`; `quantity > 1` only when stackable
/// - Effect: `effectType`, `targetId` and a positive `duration`
/// - Collider: collider extent
pub fn build_entity(spec: &EntitySpec, id: EntityId) -> Result<Entity, SpecError> {
    let pos = spec.pos.ok_or(SpecError::MissingField("pos"))?;
    require_finite_vec("pos", pos)?;

    let vel = spec.vel.unwrap_or(Vec2::ZERO);
    require_finite_vec("vel", vel)?;

    let rotation = spec.rotation.unwrap_or(0.0);
    require_finite("rotation", rotation)?;

    let owner_id = match spec.owner_id.as_deref() {
        Some("") => return Err(invalid("ownerId", "must not be empty")),
        Some(owner) => owner.to_string(),
        None => return Err(SpecError::MissingField("ownerId")),
    };

    if spec.is_alive == Some(false) {
        return Err(invalid("isAlive", "entities must spawn alive"));
    }

    let collider = extent(spec)?;
    let kind = match spec.entity_type.unwrap_or(EntityType::Generic) {
        EntityType::Character => EntityKind::Character(character(spec)?),
        EntityType::Consumable => EntityKind::Consumable(consumable(spec)?),
        EntityType::Effect => EntityKind::Effect(effect(spec)?),
        EntityType::Collider => {
            let extent = collider.ok_or(SpecError::MissingField("colliderWidth"))?;
            EntityKind::Collider(ColliderState {
                width: extent.width,
                height: extent.height,
                passable: spec.passable.unwrap_or(false),
                is_trigger: spec.is_trigger.unwrap_or(false),
            })
        }
        EntityType::Generic => EntityKind::Generic,
    };

    Ok(Entity {
        id,
        pos,
        vel,
        rotation,
        owner_id,
        is_alive: true,
        is_input_driven: spec.is_input_driven.unwrap_or(false),
        collider,
        kind,
    })
}

fn require_finite(field: &'static str, value: f32) -> Result<(), SpecError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite number"))
    }
}

fn require_finite_vec(field: &'static str, value: Vec2) -> Result<(), SpecError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must have finite components"))
    }
}

fn require_non_negative(field: &'static str, value: f32) -> Result<(), SpecError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(field, "must not be negative"));
    }
    Ok(())
}

fn extent(spec: &EntitySpec) -> Result<Option<Extent>, SpecError> {
    match (spec.collider_width, spec.collider_height) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(SpecError::MissingField("colliderHeight")),
        (None, Some(_)) => Err(SpecError::MissingField("colliderWidth")),
        (Some(width), Some(height)) => {
            for (field, value) in [("colliderWidth", width), ("colliderHeight", height)] {
                require_finite(field, value)?;
                if value <= 0.0 {
                    return Err(invalid(field, "must be positive"));
                }
            }
            Ok(Some(Extent { width, height }))
        }
    }
}

fn character(spec: &EntitySpec) -> Result<CharacterState, SpecError> {
    let max_hp = spec.max_hp.ok_or(SpecError::MissingField("maxHp"))?;
    if max_hp <= 0 {
        return Err(invalid("maxHp", "must be positive"));
    }

    let hp = spec.hp.unwrap_or(max_hp);
    if hp <= 0 || hp > max_hp {
        return Err(invalid("hp", format!("must be within 1..={}", max_hp)));
    }

    let level = spec.level.unwrap_or(1);
    if level == 0 {
        return Err(invalid("level", "must be at least 1"));
    }

    let stats = spec.stats.ok_or(SpecError::MissingField("stats"))?;
    require_non_negative("stats.speed", stats.speed)?;
    require_finite("stats.castSpeed", stats.cast_speed)?;
    if stats.cast_speed <= 0.0 {
        return Err(invalid("stats.castSpeed", "must be positive"));
    }

    let attacks = spec.attack_defs.clone().unwrap_or_default();
    for attack in &attacks {
        require_non_negative("attackDefs.range", attack.range)?;
        require_finite("attackDefs.critChance", attack.crit_chance)?;
        if !(0.0..=1.0).contains(&attack.crit_chance) {
            return Err(invalid("attackDefs.critChance", "must be within 0..=1"));
        }
        if attack.damage < 0 {
            return Err(invalid("attackDefs.damage", "must not be negative"));
        }
    }

    let spells = spec.spell_book.clone().unwrap_or_default();
    for spell in &spells {
        require_non_negative("spellBook.range", spell.range)?;
        require_finite("spellBook.intensity", spell.intensity)?;
        if spell.duration_ticks == 0 {
            return Err(invalid("spellBook.durationTicks", "must be positive"));
        }
    }

    let ai_profile = spec
        .ai_profile
        .as_deref()
        .map(|p| p.parse::<AiProfile>())
        .transpose()
        .map_err(|reason| invalid("aiProfile", reason))?;

    Ok(CharacterState {
        hp,
        max_hp,
        level,
        stats,
        attacks,
        spells,
        ai_profile,
        last_attacker: None,
    })
}

fn consumable(spec: &EntitySpec) -> Result<ConsumableState, SpecError> {
    let effect_id = spec
        .effect_id
        .as_deref()
        .ok_or(SpecError::MissingField("effectId"))?
        .parse::<EffectKind>()
        .map_err(|reason| invalid("effectId", reason))?;

    let consumable_type = match spec.consumable_type.as_deref() {
        Some("") => return Err(invalid("consumableType", "must not be empty")),
        Some(t) => t.to_string(),
        None => return Err(SpecError::MissingField("consumableType")),
    };

    let charges = spec.charges.unwrap_or(1);
    if charges == 0 {
        return Err(invalid("charges", "must be positive"));
    }

    let quantity = spec.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(invalid("quantity", "must be positive"));
    }

    let stackable = spec.stackable.unwrap_or(false);
    if quantity > 1 && !stackable {
        return Err(invalid("quantity", "only stackable consumables may exceed 1"));
    }

    let use_range = spec.use_range.unwrap_or(0.0);
    require_non_negative("useRange", use_range)?;

    let effect_value = spec.effect_value.unwrap_or(0.0);
    require_finite("effectValue", effect_value)?;

    Ok(ConsumableState {
        effect_id,
        consumable_type,
        duration_ticks: spec.duration_ticks.unwrap_or(0),
        stackable,
        charges,
        max_charges: charges,
        use_range,
        quantity,
        effect_value,
    })
}

fn effect(spec: &EntitySpec) -> Result<EffectState, SpecError> {
    let effect_type = spec
        .effect_type
        .as_deref()
        .ok_or(SpecError::MissingField("effectType"))?
        .parse::<EffectKind>()
        .map_err(|reason| invalid("effectType", reason))?;

    let target_id = spec.target_id.ok_or(SpecError::MissingField("targetId"))?;

    let duration = spec.duration.ok_or(SpecError::MissingField("duration"))?;
    if duration == 0 {
        return Err(invalid("duration", "must be positive"));
    }

    let intensity = spec.intensity.unwrap_or(1.0);
    require_finite("intensity", intensity)?;

    Ok(EffectState {
        effect_type,
        intensity,
        target_id,
        caster_id: spec.caster_id,
        remaining_ticks: duration,
    })
}
