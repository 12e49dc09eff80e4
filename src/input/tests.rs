use super::*;
use crate::entity::EntityId;
use crate::math::Vec2;
use serde_json::json;

fn input(client: &str, sequence: u64, tick: u64) -> InputMessage {
    InputMessage::new(client, sequence, tick, Vec2::new(1.0, 0.0))
}

#[test]
fn test_queue_future_input() {
    let mut queue = InputQueue::new();
    assert_eq!(queue.queue(input("player1", 1, 5), 0), Some(5));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.next_due(), Some(5));

    assert!(queue.drain(4).is_empty());
    assert_eq!(queue.drain(5).len(), 1);
    assert!(queue.is_empty());
}

#[test]
fn test_stale_input_lands_on_next_tick() {
    let mut queue = InputQueue::new();

    // Tick 10 already completed
    assert_eq!(queue.queue(input("player1", 1, 3), 10), Some(11));
    // Present tick counts as stale too
    assert_eq!(queue.queue(input("player1", 2, 10), 10), Some(11));

    let drained = queue.drain(11);
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].intended_server_tick, 3);
}

#[test]
fn test_drain_orders_by_sequence_then_client() {
    let mut queue = InputQueue::new();
    queue.queue(input("bravo", 7, 2), 0);
    queue.queue(input("alpha", 9, 2), 0);
    queue.queue(input("alpha", 7, 2), 0);
    queue.queue(input("bravo", 3, 2), 0);

    let order: Vec<(String, u64)> = queue
        .drain(2)
        .into_iter()
        .map(|m| (m.client_id, m.sequence))
        .collect();

    assert_eq!(
        order,
        vec![
            ("bravo".to_string(), 3),
            ("alpha".to_string(), 7),
            ("bravo".to_string(), 7),
            ("alpha".to_string(), 9),
        ]
    );
}

#[test]
fn test_drain_is_destructive() {
    let mut queue = InputQueue::new();
    queue.queue(input("player1", 1, 1), 0);

    assert_eq!(queue.drain(1).len(), 1);
    assert!(queue.drain(1).is_empty());
}

#[test]
fn test_duplicate_pending_input_ignored() {
    let mut queue = InputQueue::new();
    assert_eq!(queue.queue(input("player1", 1, 4), 0), Some(4));
    assert_eq!(queue.queue(input("player1", 1, 6), 0), None);
    assert_eq!(queue.len(), 1);

    // Same sequence from another client is distinct
    assert_eq!(queue.queue(input("player2", 1, 4), 0), Some(4));

    // Once drained, a re-sent input is rejected
    queue.drain(4);
    assert_eq!(queue.queue(input("player1", 1, 4), 4), None);
    assert!(queue.is_empty());
}

#[test]
fn test_older_sequence_after_newer_is_rejected() {
    let mut queue = InputQueue::new();
    queue.queue(input("player1", 2, 1), 0);
    assert_eq!(queue.drain(1).len(), 1);
    assert_eq!(queue.last_consumed("player1"), Some(2));

    // Arrives late, after seq 2 was applied
    assert_eq!(queue.queue(input("player1", 1, 1), 1), None);
    assert_eq!(queue.queue(input("player1", 2, 1), 1), None);
    assert_eq!(queue.queue(input("player1", 3, 1), 1), Some(2));

    // Other clients are tracked separately
    assert_eq!(queue.queue(input("player2", 1, 1), 1), Some(2));
}

#[test]
fn test_drain_skips_sequences_consumed_on_earlier_ticks() {
    let mut queue = InputQueue::new();
    queue.queue(input("player1", 5, 3), 0);
    queue.queue(input("player1", 4, 4), 0);
    queue.queue(input("player1", 6, 4), 0);

    assert_eq!(queue.drain(3).len(), 1);
    let drained: Vec<u64> = queue.drain(4).into_iter().map(|m| m.sequence).collect();
    assert_eq!(drained, vec![6]);
    assert_eq!(queue.last_consumed("player1"), Some(6));
}

#[test]
fn test_restore_sequences() {
    let mut queue = InputQueue::new();
    queue.queue(input("player1", 9, 1), 0);
    queue.drain(1);

    let mut restored = std::collections::BTreeMap::new();
    restored.insert("player1".to_string(), 3);
    queue.restore_sequences(restored);

    assert_eq!(queue.queue(input("player1", 4, 2), 1), Some(2));
    assert_eq!(queue.consumed_sequences().get("player1"), Some(&3));
}

#[test]
fn test_non_finite_movement_sanitized() {
    let mut queue = InputQueue::new();
    let mut bad = input("player1", 1, 1);
    bad.movement = Vec2::new(f32::NAN, 1.0);
    queue.queue(bad, 0);

    let drained = queue.drain(1);
    assert_eq!(drained[0].movement, Vec2::ZERO);
}

#[test]
fn test_input_message_wire_shape() {
    let message: InputMessage = serde_json::from_value(json!({
        "clientId": "player1",
        "sequence": 12,
        "clientTick": 40,
        "intendedServerTick": 42,
        "movement": {"x": 0.0, "y": -1.0},
        "actions": [
            {"type": "attack", "attack": 0, "target": 7},
            {"type": "cast", "spell": 1},
            {"type": "use", "item": 9}
        ],
        "timestamp": 1700000000000i64
    }))
    .unwrap();

    assert_eq!(message.intended_server_tick, 42);
    assert_eq!(
        message.actions,
        vec![
            InputAction::Attack { attack: 0, target: EntityId(7) },
            InputAction::Cast { spell: 1, target: None },
            InputAction::Use { item: EntityId(9) },
        ]
    );
}
