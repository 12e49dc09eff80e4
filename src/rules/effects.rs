use super::damage::{apply_damage, apply_heal};
use super::TickContext;
use crate::entity::{EffectKind, EntityId};
use crate::state::EntityRegistry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Status modifiers derived from active effect entities at tick start
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statuses {
    stunned: BTreeSet<EntityId>,
    slow: BTreeMap<EntityId, f32>,
}

impl Statuses {
    pub fn collect(registry: &EntityRegistry) -> Self {
        let mut statuses = Statuses::default();

        for entity in registry.iter_live().filter(|e| e.is_alive) {
            let Some(effect) = entity.as_effect() else { continue };
            match effect.effect_type {
                EffectKind::Stun => {
                    statuses.stunned.insert(effect.target_id);
                }
                EffectKind::Slow => {
                    let factor = (1.0 - effect.intensity).clamp(0.0, 1.0);
                    *statuses.slow.entry(effect.target_id).or_insert(1.0) *= factor;
                }
                EffectKind::Damage | EffectKind::Heal => {}
            }
        }

        statuses
    }

    pub fn is_stunned(&self, id: EntityId) -> bool {
        self.stunned.contains(&id)
    }

    /// Movement multiplier from slows (1.0 when unaffected)
    pub fn speed_factor(&self, id: EntityId) -> f32 {
        self.slow.get(&id).copied().unwrap_or(1.0)
    }
}

/// Apply per-tick effect payloads and expire finished effects.
///
/// An effect whose target is gone is removed without applying.
pub fn tick_effects(registry: &mut EntityRegistry, ctx: &mut TickContext<'_>) {
    let effect_ids: Vec<EntityId> = registry
        .iter_live()
        .filter(|e| e.is_alive && e.as_effect().is_some())
        .map(|e| e.id)
        .collect();

    for id in effect_ids {
        let Some(effect) = registry.get(id).ok().and_then(|e| e.as_effect()).cloned() else {
            continue;
        };

        let target_alive = registry.get(effect.target_id).map_or(false, |t| t.is_alive);
        if !target_alive {
            debug!(effect_id = %id, target_id = %effect.target_id, "Effect target gone");
            let _ = registry.despawn(id);
            continue;
        }

        let amount = effect.intensity.round() as i32;
        match effect.effect_type {
            EffectKind::Damage if amount > 0 => {
                apply_damage(registry, effect.target_id, amount, effect.caster_id, ctx);
            }
            EffectKind::Heal if amount > 0 => {
                apply_heal(registry, effect.target_id, amount, effect.caster_id, ctx);
            }
            _ => {}
        }

        let expired = match registry.get_mut(id).ok().and_then(|e| e.as_effect_mut()) {
            Some(state) => {
                state.remaining_ticks = state.remaining_ticks.saturating_sub(1);
                state.remaining_ticks == 0
            }
            None => false,
        };

        if expired {
            debug!(effect_id = %id, "Effect expired");
            let _ = registry.despawn(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntitySpec, Stats};
    use crate::math::Vec2;

    #[test]
    fn test_statuses_from_effects() {
        let mut registry = EntityRegistry::new();
        let hero = registry
            .spawn(&EntitySpec::character(Vec2::ZERO, "p1", 50, Stats::new(1, 1, 1.0, 1.0)))
            .unwrap();
        let other = registry
            .spawn(&EntitySpec::character(Vec2::ZERO, "p2", 50, Stats::new(1, 1, 1.0, 1.0)))
            .unwrap();

        let mut slow = EntitySpec::effect(Vec2::ZERO, "p2", EffectKind::Slow, hero, 3);
        slow.intensity = Some(0.5);
        registry.spawn(&slow).unwrap();
        registry.spawn(&slow).unwrap();
        registry
            .spawn(&EntitySpec::effect(Vec2::ZERO, "p1", EffectKind::Stun, other, 2))
            .unwrap();

        let statuses = Statuses::collect(&registry);
        assert!((statuses.speed_factor(hero) - 0.25).abs() < 1e-6);
        assert!(!statuses.is_stunned(hero));
        assert!(statuses.is_stunned(other));
        assert_eq!(statuses.speed_factor(other), 1.0);
    }
}
