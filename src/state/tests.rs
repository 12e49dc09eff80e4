use super::*;
use crate::entity::{EffectKind, EntityId, EntitySpec, SpecError, Stats};
use crate::error::EngineError;
use crate::math::Vec2;
use crate::snapshot::GameStateMemento;
use crate::config::EngineMode;

fn character(x: f32) -> EntitySpec {
    EntitySpec::character(Vec2::new(x, 0.0), "player1", 100, Stats::new(10, 5, 1.0, 1.0))
}

#[test]
fn test_ids_allocated_monotonically() {
    let mut registry = EntityRegistry::new();

    let a = registry.spawn(&character(0.0)).unwrap();
    let b = registry.spawn(&character(1.0)).unwrap();
    let c = registry.spawn(&EntitySpec::generic(Vec2::ZERO, "server")).unwrap();

    assert_eq!(a, EntityId(1));
    assert_eq!(b, EntityId(2));
    assert_eq!(c, EntityId(3));
    assert_eq!(registry.live_count(), 3);
    assert_eq!(registry.next_id(), 4);
}

#[test]
fn test_failed_spawn_consumes_no_id() {
    let mut registry = EntityRegistry::new();

    let mut bad = character(0.0);
    bad.max_hp = None;
    let err = registry.spawn(&bad).unwrap_err();
    assert_eq!(err, EngineError::InvalidEntitySpec(SpecError::MissingField("maxHp")));
    assert_eq!(registry.live_count(), 0);

    let id = registry.spawn(&character(0.0)).unwrap();
    assert_eq!(id, EntityId(1));
}

#[test]
fn test_get_unknown_id_fails() {
    let registry = EntityRegistry::new();
    assert_eq!(
        registry.get(EntityId(42)).unwrap_err(),
        EngineError::InvalidEntityId(EntityId(42))
    );
}

#[test]
fn test_despawn_tombstones_until_boundary() {
    let mut registry = EntityRegistry::new();
    let a = registry.spawn(&character(0.0)).unwrap();
    let b = registry.spawn(&character(1.0)).unwrap();

    registry.despawn(a).unwrap();

    // Tombstoned: lookups fail immediately
    assert!(registry.get(a).is_err());
    assert!(registry.is_tombstoned(a));
    assert!(!registry.is_live(a));
    assert_eq!(registry.live_count(), 1);

    // Still part of this tick's iteration set
    let mut visited = Vec::new();
    registry.for_each_alive(|e| visited.push(e.id));
    assert_eq!(visited, vec![a, b]);

    // Gone after the boundary
    assert_eq!(registry.flush_tombstones(), 1);
    let mut visited = Vec::new();
    registry.for_each_alive(|e| visited.push(e.id));
    assert_eq!(visited, vec![b]);
    assert!(!registry.is_tombstoned(a));
    assert!(registry.get(a).is_err());
}

#[test]
fn test_double_despawn_fails() {
    let mut registry = EntityRegistry::new();
    let a = registry.spawn(&character(0.0)).unwrap();

    registry.despawn(a).unwrap();
    assert_eq!(registry.despawn(a).unwrap_err(), EngineError::InvalidEntityId(a));

    registry.flush_tombstones();
    assert_eq!(registry.despawn(a).unwrap_err(), EngineError::InvalidEntityId(a));
}

#[test]
fn test_despawned_id_not_reused() {
    let mut registry = EntityRegistry::new();
    let a = registry.spawn(&character(0.0)).unwrap();
    registry.despawn(a).unwrap();
    registry.flush_tombstones();

    let b = registry.spawn(&character(0.0)).unwrap();
    assert_ne!(a, b);
    assert_eq!(b, EntityId(2));
}

#[test]
fn test_for_each_alive_skips_dead_flag() {
    let mut registry = EntityRegistry::new();
    let a = registry.spawn(&character(0.0)).unwrap();
    let b = registry.spawn(&character(1.0)).unwrap();

    registry.get_mut(a).unwrap().is_alive = false;

    let mut visited = Vec::new();
    registry.for_each_alive(|e| visited.push(e.id));
    assert_eq!(visited, vec![b]);
}

#[test]
fn test_effect_requires_live_target() {
    let mut registry = EntityRegistry::new();
    let hero = registry.spawn(&character(0.0)).unwrap();

    let missing = EntitySpec::effect(Vec2::ZERO, "server", EffectKind::Heal, EntityId(99), 3);
    assert!(matches!(
        registry.spawn(&missing),
        Err(EngineError::InvalidEntitySpec(SpecError::InvalidField { field: "targetId", .. }))
    ));

    let ok = EntitySpec::effect(Vec2::ZERO, "server", EffectKind::Heal, hero, 3);
    assert!(registry.spawn(&ok).is_ok());
}

#[test]
fn test_from_memento_restores_allocator() {
    let mut registry = EntityRegistry::new();
    registry.spawn(&character(0.0)).unwrap();
    let b = registry.spawn(&character(5.0)).unwrap();
    registry.despawn(b).unwrap();
    registry.flush_tombstones();

    let memento = GameStateMemento::capture(&registry, 7, EngineMode::Server);
    let mut restored = EntityRegistry::from_memento(&memento);

    assert_eq!(restored.live_count(), 1);
    assert_eq!(restored.next_id(), 3);
    assert_eq!(restored.spawn(&character(0.0)).unwrap(), EntityId(3));
}
