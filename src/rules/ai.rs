use super::movement::{heading, move_speed, nearest};
use super::rng::{salt, tick_rng};
use super::{Intent, Statuses, TickContext};
use crate::entity::{AiProfile, EntityId};
use crate::input::InputAction;
use crate::math::Vec2;
use crate::state::EntityRegistry;
use rand::Rng;
use std::f32::consts::TAU;

/// Chance a wandering character rests instead of picking a new heading
const WANDER_REST_CHANCE: f32 = 0.25;

/// Chasers stop this close to their target when they have no attack
const CHASE_STOP_DISTANCE: f32 = 1.0;

/// Run AI for every AI-driven character.
///
/// Sets velocities (emitting `entity:move` when one changes) and returns the
/// attack intents of aggressive characters.
pub fn update(
    registry: &mut EntityRegistry,
    statuses: &Statuses,
    ctx: &mut TickContext<'_>,
) -> Vec<Intent> {
    let mut intents = Vec::new();

    for id in registry.active_ids() {
        let Ok(entity) = registry.get(id) else { continue };
        let Some(profile) = entity.ai_profile() else { continue };
        let Some(character) = entity.as_character() else { continue };

        let pos = entity.pos;
        let speed = move_speed(entity, statuses);
        let ready_attack = character
            .attacks
            .iter()
            .position(|attack| ctx.tick >= attack.ready_at);
        let first_range = character.attacks.first().map(|a| a.range);

        let vel = match profile {
            AiProfile::Idle => Vec2::ZERO,
            AiProfile::Wander => {
                let mut rng = tick_rng(ctx.config.rng_seed, ctx.tick, id, salt::WANDER);
                if rng.gen::<f32>() < WANDER_REST_CHANCE {
                    Vec2::ZERO
                } else {
                    Vec2::from_angle(rng.gen_range(0.0..TAU)) * (speed * 0.5)
                }
            }
            AiProfile::Chase | AiProfile::Aggressive => {
                match quarry(registry, id) {
                    Some((target, target_pos)) => {
                        let distance = pos.distance(target_pos);
                        let stop = first_range.unwrap_or(CHASE_STOP_DISTANCE);

                        if profile == AiProfile::Aggressive {
                            if let Some(index) = ready_attack {
                                let in_range = character.attacks[index].range >= distance;
                                if in_range && !statuses.is_stunned(id) {
                                    intents.push(Intent {
                                        actor: id,
                                        action: InputAction::Attack {
                                            attack: index,
                                            target,
                                        },
                                    });
                                }
                            }
                        }

                        if distance > stop {
                            heading(pos, target_pos) * speed
                        } else {
                            Vec2::ZERO
                        }
                    }
                    None => Vec2::ZERO,
                }
            }
        };

        let Ok(entity) = registry.get_mut(id) else { continue };
        if entity.vel != vel {
            entity.vel = vel;
            ctx.emit_move(entity);
        }
    }

    intents
}

/// Nearest alive character owned by someone else
fn quarry(registry: &EntityRegistry, hunter: EntityId) -> Option<(EntityId, Vec2)> {
    let owner = &registry.get(hunter).ok()?.owner_id;
    let candidates = registry
        .iter_live()
        .filter(|e| e.is_alive && e.id != hunter && &e.owner_id != owner)
        .filter(|e| e.as_character().is_some())
        .map(|e| (e.id, e.pos));

    let origin = registry.get(hunter).ok()?.pos;
    let target = nearest(origin, candidates)?;
    registry.get(target).ok().map(|e| (target, e.pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, EngineMode};
    use crate::entity::{AttackDef, EntitySpec, Stats};
    use crate::event::EventBus;

    fn config() -> EngineConfig {
        EngineConfig {
            mode: EngineMode::Server,
            tick_rate: 20,
            unit_pixels: 32.0,
            ai_update_interval: 1,
            snapshot_buffer_size: 16,
            rng_seed: 99,
            snapshot_emission_interval: 1,
        }
    }

    fn npc(pos: Vec2, profile: AiProfile) -> EntitySpec {
        EntitySpec::character(pos, "server", 50, Stats::new(5, 0, 1.0, 1.0))
            .with_ai(profile)
            .with_attacks(vec![AttackDef::new("bite", 6, 20.0, 10)])
    }

    fn hero(pos: Vec2) -> EntitySpec {
        EntitySpec::character(pos, "player1", 100, Stats::new(1, 1, 1.0, 1.0)).input_driven()
    }

    #[test]
    fn test_chase_moves_towards_nearest_enemy() {
        let mut registry = EntityRegistry::new();
        let chaser = registry.spawn(&npc(Vec2::ZERO, AiProfile::Chase)).unwrap();
        registry.spawn(&hero(Vec2::new(100.0, 0.0))).unwrap();
        registry.spawn(&hero(Vec2::new(0.0, -300.0))).unwrap();

        let config = config();
        let mut bus = EventBus::new();
        let mut ctx = TickContext { tick: 1, dt: 0.05, config: &config, bus: &mut bus };
        let intents = update(&mut registry, &Statuses::default(), &mut ctx);

        assert!(intents.is_empty());
        assert_eq!(registry.get(chaser).unwrap().vel, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_aggressive_attacks_in_range() {
        let mut registry = EntityRegistry::new();
        let brute = registry.spawn(&npc(Vec2::ZERO, AiProfile::Aggressive)).unwrap();
        let target = registry.spawn(&hero(Vec2::new(10.0, 0.0))).unwrap();

        let config = config();
        let mut bus = EventBus::new();
        let mut ctx = TickContext { tick: 1, dt: 0.05, config: &config, bus: &mut bus };
        let intents = update(&mut registry, &Statuses::default(), &mut ctx);

        assert_eq!(
            intents,
            vec![Intent {
                actor: brute,
                action: InputAction::Attack { attack: 0, target }
            }]
        );
        // Within reach: no need to close in
        assert!(registry.get(brute).unwrap().vel.is_zero());
    }

    #[test]
    fn test_wander_is_deterministic() {
        let run = || {
            let mut registry = EntityRegistry::new();
            let id = registry.spawn(&npc(Vec2::ZERO, AiProfile::Wander)).unwrap();
            let config = config();
            let mut bus = EventBus::new();
            let mut velocities = Vec::new();
            for tick in 1..=10 {
                let mut ctx = TickContext { tick, dt: 0.05, config: &config, bus: &mut bus };
                update(&mut registry, &Statuses::default(), &mut ctx);
                velocities.push(registry.get(id).unwrap().vel);
            }
            velocities
        };

        let first = run();
        assert_eq!(first, run());
        for vel in first {
            assert!(vel.length() <= 50.0 + 1e-3);
        }
    }

    #[test]
    fn test_input_driven_characters_skip_ai() {
        let mut registry = EntityRegistry::new();
        let mut spec = npc(Vec2::ZERO, AiProfile::Wander);
        spec.is_input_driven = Some(true);
        let id = registry.spawn(&spec).unwrap();

        let config = config();
        let mut bus = EventBus::new();
        for tick in 1..=10 {
            let mut ctx = TickContext { tick, dt: 0.05, config: &config, bus: &mut bus };
            update(&mut registry, &Statuses::default(), &mut ctx);
        }
        assert!(registry.get(id).unwrap().vel.is_zero());
    }
}
