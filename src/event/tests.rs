use super::*;
use crate::entity::EntityId;
use crate::math::Vec2;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn move_event(tick: u64) -> GameEvent {
    GameEvent::EntityMove(EntityMoveEvent {
        tick,
        entity_id: EntityId(1),
        pos: Vec2::new(105.0, 100.0),
        vel: Vec2::new(100.0, 0.0),
        rotation: 0.0,
    })
}

#[test]
fn test_topic_names_round_trip() {
    for topic in Topic::ALL {
        assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
    }
    assert!(matches!(
        "entity:teleport".parse::<Topic>(),
        Err(EventError::UnknownTopic(_))
    ));
}

#[test]
fn test_typed_subscribers_in_subscription_order() {
    let mut bus = EventBus::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let first = Rc::clone(&log);
    bus.subscribe(move |e: &EntityMoveEvent| first.borrow_mut().push(("first", e.tick)));
    let second = Rc::clone(&log);
    bus.subscribe(move |e: &EntityMoveEvent| second.borrow_mut().push(("second", e.tick)));

    assert_eq!(bus.emit(&move_event(3)), 2);
    assert_eq!(*log.borrow(), vec![("first", 3), ("second", 3)]);
}

#[test]
fn test_emit_only_reaches_topic_subscribers() {
    let mut bus = EventBus::new();
    let ticks = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&ticks);
    bus.subscribe(move |_: &TickCompleteEvent| *counter.borrow_mut() += 1);

    assert_eq!(bus.emit(&move_event(1)), 0);
    assert_eq!(bus.emit(&GameEvent::TickComplete(TickCompleteEvent { tick: 1 })), 1);
    assert_eq!(*ticks.borrow(), 1);
}

#[test]
fn test_dynamic_subscriber_receives_camel_case_json() {
    let mut bus = EventBus::new();
    let payloads = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&payloads);
    bus.subscribe_dynamic(Topic::EntityMove, move |payload: &serde_json::Value| {
        sink.borrow_mut().push(payload.clone())
    });

    bus.emit(&move_event(7));

    let payloads = payloads.borrow();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["tick"], json!(7));
    assert_eq!(payloads[0]["entityId"], json!(1));
    assert_eq!(payloads[0]["vel"]["x"], json!(100.0));
}

fn exploding_handler(_: &EntityMoveEvent) {
    panic!("handler exploded")
}

#[test]
fn test_failing_handler_is_isolated() {
    let mut bus = EventBus::new();
    let reached = Rc::new(RefCell::new(Vec::new()));

    bus.subscribe(|_: &EntityMoveEvent| -> Result<(), String> { Err("boom".to_string()) });
    bus.subscribe(exploding_handler);
    let sink = Rc::clone(&reached);
    bus.subscribe(move |e: &EntityMoveEvent| sink.borrow_mut().push(e.tick));

    assert_eq!(bus.emit(&move_event(4)), 1);
    assert_eq!(*reached.borrow(), vec![4]);
    assert_eq!(bus.failure_count(), 2);

    // The bus stays usable after a panic
    assert_eq!(bus.emit(&move_event(5)), 1);
    assert_eq!(bus.failure_count(), 4);
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let mut bus = EventBus::new();
    let count = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&count);
    let token = bus.subscribe(move |_: &EntityMoveEvent| *counter.borrow_mut() += 1);
    assert_eq!(bus.subscriber_count(Topic::EntityMove), 1);

    assert!(bus.unsubscribe(token));
    assert!(!bus.unsubscribe(token));
    assert_eq!(bus.subscriber_count(Topic::EntityMove), 0);

    bus.emit(&move_event(1));
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_tokens_never_reused() {
    let mut bus = EventBus::new();
    let a = bus.subscribe(|_: &TickCompleteEvent| ());
    bus.unsubscribe(a);
    let b = bus.subscribe(|_: &TickCompleteEvent| ());
    assert_ne!(a, b);
}

#[test]
fn test_suppressed_bus_dispatches_nothing() {
    let mut bus = EventBus::new();
    let count = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&count);
    bus.subscribe(move |_: &EntityMoveEvent| *counter.borrow_mut() += 1);

    assert!(!bus.set_suppressed(true));
    assert_eq!(bus.emit(&move_event(1)), 0);
    assert!(bus.set_suppressed(false));
    assert_eq!(bus.emit(&move_event(2)), 1);
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_emit_json_checks_shape() {
    let mut bus = EventBus::new();
    let deaths = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deaths);
    bus.subscribe(move |e: &EntityDeathEvent| sink.borrow_mut().push(e.clone()));

    let delivered = bus
        .emit_json("entity:death", json!({"tick": 9, "entityId": 3, "killerId": null}))
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(deaths.borrow()[0].entity_id, EntityId(3));

    let err = bus
        .emit_json("entity:death", json!({"tick": 9, "entity": 3}))
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidPayload { topic: Topic::EntityDeath, .. }));

    assert!(matches!(
        bus.emit_json("chat:message", json!({})),
        Err(EventError::UnknownTopic(_))
    ));
}

#[test]
fn test_action_resolved_wire_shape() {
    let event = GameEvent::ActionResolved(ActionResolvedEvent {
        tick: 2,
        actor_id: EntityId(1),
        action_type: ActionType::Attack,
        result: ActionOutcome::Rejected {
            reason: RejectReason::OutOfRange,
        },
    });

    let value = event.payload_json().unwrap();
    assert_eq!(value["actionType"], json!("attack"));
    assert_eq!(value["result"], json!({"outcome": "rejected", "reason": "outOfRange"}));
    assert_eq!(event.topic(), Topic::ActionResolved);
    assert_eq!(event.tick(), 2);
}

#[test]
fn test_collision_payload_field_names() {
    let event = GameEvent::EntityCollision(EntityCollisionEvent {
        tick: 1,
        entity_id_a: EntityId(1),
        entity_id_b: EntityId(2),
        contact_point: Vec2::ZERO,
        normal: Vec2::new(1.0, 0.0),
    });
    let value = event.payload_json().unwrap();
    assert_eq!(value["entityIdA"], json!(1));
    assert_eq!(value["entityIdB"], json!(2));
    assert!(value.get("contactPoint").is_some());
}
