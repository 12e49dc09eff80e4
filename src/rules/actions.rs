use super::damage::{apply_damage, apply_heal};
use super::rng::{salt, tick_rng};
use super::{Intent, Statuses, TickContext};
use crate::entity::{EffectKind, Entity, EntityId, EntitySpec};
use crate::event::{ActionIntentEvent, ActionOutcome, ActionResolvedEvent, ActionType, RejectReason};
use crate::input::InputAction;
use crate::state::EntityRegistry;
use rand::Rng;
use tracing::debug;

/// Resolve intents in order, emitting `action:intent` then `action:resolved`
/// for each.
pub fn resolve(
    registry: &mut EntityRegistry,
    intents: &[Intent],
    statuses: &Statuses,
    ctx: &mut TickContext<'_>,
) {
    for (ordinal, intent) in intents.iter().enumerate() {
        let (action_type, target) = describe(&intent.action);
        ctx.emit(ActionIntentEvent {
            tick: ctx.tick,
            actor_id: intent.actor,
            action_type,
            target,
        });

        let result = match resolve_one(registry, intent, statuses, ordinal as u64, ctx) {
            Ok(outcome) => outcome,
            Err(reason) => {
                debug!(
                    tick = ctx.tick,
                    actor_id = %intent.actor,
                    action = ?action_type,
                    reason = ?reason,
                    "Action rejected"
                );
                ActionOutcome::Rejected { reason }
            }
        };

        ctx.emit(ActionResolvedEvent {
            tick: ctx.tick,
            actor_id: intent.actor,
            action_type,
            result,
        });
    }
}

fn describe(action: &InputAction) -> (ActionType, Option<EntityId>) {
    match action {
        InputAction::Attack { target, .. } => (ActionType::Attack, Some(*target)),
        InputAction::Cast { target, .. } => (ActionType::Cast, *target),
        InputAction::Use { item } => (ActionType::Use, Some(*item)),
    }
}

fn resolve_one(
    registry: &mut EntityRegistry,
    intent: &Intent,
    statuses: &Statuses,
    ordinal: u64,
    ctx: &mut TickContext<'_>,
) -> Result<ActionOutcome, RejectReason> {
    let actor = registry
        .get(intent.actor)
        .ok()
        .filter(|e| e.is_alive && e.as_character().is_some())
        .ok_or(RejectReason::ActorUnavailable)?;

    if statuses.is_stunned(intent.actor) {
        return Err(RejectReason::Stunned);
    }

    match intent.action {
        InputAction::Attack { attack, target } => {
            let actor = actor.clone();
            attack_action(registry, &actor, attack, target, ordinal, ctx)
        }
        InputAction::Cast { spell, target } => {
            let actor = actor.clone();
            cast_action(registry, &actor, spell, target.unwrap_or(actor.id), ctx)
        }
        InputAction::Use { item } => {
            let actor = actor.clone();
            use_action(registry, &actor, item, ctx)
        }
    }
}

fn living_character(registry: &EntityRegistry, id: EntityId) -> Result<&Entity, RejectReason> {
    registry
        .get(id)
        .ok()
        .filter(|e| e.is_alive && e.as_character().is_some())
        .ok_or(RejectReason::TargetUnavailable)
}

fn attack_action(
    registry: &mut EntityRegistry,
    actor: &Entity,
    index: usize,
    target_id: EntityId,
    ordinal: u64,
    ctx: &mut TickContext<'_>,
) -> Result<ActionOutcome, RejectReason> {
    let character = actor.as_character().ok_or(RejectReason::ActorUnavailable)?;
    let attack = character
        .attacks
        .get(index)
        .ok_or(RejectReason::UnknownAction)?;
    if ctx.tick < attack.ready_at {
        return Err(RejectReason::OnCooldown);
    }

    if target_id == actor.id {
        return Err(RejectReason::TargetUnavailable);
    }
    let target = living_character(registry, target_id)?;
    if actor.pos.distance(target.pos) > attack.range {
        return Err(RejectReason::OutOfRange);
    }

    let armor = target.as_character().map_or(0, |c| c.stats.armor);
    let mut damage = attack
        .damage
        .saturating_add(character.stats.power)
        .saturating_sub(armor)
        .max(1);

    let mut rng = tick_rng(
        ctx.config.rng_seed,
        ctx.tick,
        actor.id,
        salt::CRIT.wrapping_add(ordinal),
    );
    let critical = attack.crit_chance > 0.0 && rng.gen::<f32>() < attack.crit_chance;
    if critical {
        damage = damage.saturating_mul(2);
    }

    let ready_at = ctx.tick.saturating_add(attack.cooldown_ticks);
    if let Some(attack) = registry
        .get_mut(actor.id)
        .ok()
        .and_then(|e| e.as_character_mut())
        .and_then(|c| c.attacks.get_mut(index))
    {
        attack.ready_at = ready_at;
    }

    let dealt = apply_damage(registry, target_id, damage, Some(actor.id), ctx).unwrap_or(0);
    Ok(ActionOutcome::Hit {
        damage: dealt,
        critical,
    })
}

fn cast_action(
    registry: &mut EntityRegistry,
    actor: &Entity,
    index: usize,
    target_id: EntityId,
    ctx: &mut TickContext<'_>,
) -> Result<ActionOutcome, RejectReason> {
    let character = actor.as_character().ok_or(RejectReason::ActorUnavailable)?;
    let spell = character
        .spells
        .get(index)
        .ok_or(RejectReason::UnknownAction)?;
    if ctx.tick < spell.ready_at {
        return Err(RejectReason::OnCooldown);
    }

    let target = living_character(registry, target_id)?;
    if actor.pos.distance(target.pos) > spell.range {
        return Err(RejectReason::OutOfRange);
    }

    let mut spec = EntitySpec::effect(
        target.pos,
        &actor.owner_id,
        spell.effect,
        target_id,
        spell.duration_ticks,
    );
    spec.intensity = Some(spell.intensity);
    spec.caster_id = Some(actor.id);

    let effect = spawn_effect(registry, &spec, ctx)?;

    let cooldown = (spell.cooldown_ticks as f32 / character.stats.cast_speed).ceil() as u64;
    let ready_at = ctx.tick.saturating_add(cooldown);
    if let Some(spell) = registry
        .get_mut(actor.id)
        .ok()
        .and_then(|e| e.as_character_mut())
        .and_then(|c| c.spells.get_mut(index))
    {
        spell.ready_at = ready_at;
    }

    Ok(ActionOutcome::EffectApplied { effect })
}

fn use_action(
    registry: &mut EntityRegistry,
    actor: &Entity,
    item_id: EntityId,
    ctx: &mut TickContext<'_>,
) -> Result<ActionOutcome, RejectReason> {
    let item = registry
        .get(item_id)
        .ok()
        .filter(|e| e.is_alive)
        .ok_or(RejectReason::TargetUnavailable)?;
    let consumable = item
        .as_consumable()
        .ok_or(RejectReason::TargetUnavailable)?
        .clone();

    if consumable.use_range > 0.0 && actor.pos.distance(item.pos) > consumable.use_range {
        return Err(RejectReason::OutOfRange);
    }
    if consumable.charges == 0 {
        return Err(RejectReason::NoCharges);
    }

    let exhausted = match registry.get_mut(item_id).ok().and_then(|e| e.as_consumable_mut()) {
        Some(state) => {
            state.charges -= 1;
            if state.charges == 0 && state.quantity > 1 {
                state.quantity -= 1;
                state.charges = state.max_charges;
            }
            state.charges == 0
        }
        None => false,
    };
    if exhausted {
        debug!(item_id = %item_id, "Consumable used up");
        let _ = registry.despawn(item_id);
    }

    if consumable.duration_ticks > 0 {
        let mut spec = EntitySpec::effect(
            actor.pos,
            &actor.owner_id,
            consumable.effect_id,
            actor.id,
            consumable.duration_ticks,
        );
        spec.intensity = Some(consumable.effect_value);
        spec.caster_id = Some(actor.id);

        let effect = spawn_effect(registry, &spec, ctx)?;
        return Ok(ActionOutcome::EffectApplied { effect });
    }

    let value = consumable.effect_value.round() as i32;
    let amount = match consumable.effect_id {
        EffectKind::Heal if value > 0 => {
            apply_heal(registry, actor.id, value, Some(item_id), ctx).unwrap_or(0)
        }
        EffectKind::Damage if value > 0 => {
            -apply_damage(registry, actor.id, value, None, ctx).unwrap_or(0)
        }
        _ => 0,
    };

    Ok(ActionOutcome::Consumed { amount })
}

fn spawn_effect(
    registry: &mut EntityRegistry,
    spec: &EntitySpec,
    ctx: &mut TickContext<'_>,
) -> Result<EntityId, RejectReason> {
    let id = registry
        .spawn(spec)
        .map_err(|_| RejectReason::TargetUnavailable)?;
    if let Ok(entity) = registry.get(id) {
        ctx.emit_spawn(entity);
    }
    Ok(id)
}
