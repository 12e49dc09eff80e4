use super::TickContext;
use crate::entity::{Entity, EntityId, Extent};
use crate::event::{ColliderTriggerEvent, EntityCollisionEvent, PhysicsContactEvent};
use crate::math::Vec2;
use crate::state::EntityRegistry;

#[derive(Clone, Copy, Debug)]
struct Body {
    id: EntityId,
    extent: Extent,
    is_static: bool,
    is_trigger: bool,
}

impl Body {
    fn of(entity: &Entity) -> Option<Self> {
        let extent = entity.collider?;
        if entity.is_passable() || entity.as_effect().is_some() {
            return None;
        }
        Some(Self {
            id: entity.id,
            extent,
            is_static: entity.is_static(),
            is_trigger: entity.is_trigger(),
        })
    }
}

/// Overlap between two centered boxes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from A towards B
    pub normal: Vec2,
    /// Penetration along the normal
    pub depth: f32,
    pub point: Vec2,
}

/// Minimum-axis overlap of two centered AABBs, if they intersect
pub fn overlap(a_pos: Vec2, a: Extent, b_pos: Vec2, b: Extent) -> Option<Contact> {
    let delta = b_pos - a_pos;
    let reach = a.half() + b.half();
    let px = reach.x - delta.x.abs();
    let py = reach.y - delta.y.abs();
    if px <= 0.0 || py <= 0.0 {
        return None;
    }

    let (normal, depth) = if px < py {
        (Vec2::new(if delta.x < 0.0 { -1.0 } else { 1.0 }, 0.0), px)
    } else {
        (Vec2::new(0.0, if delta.y < 0.0 { -1.0 } else { 1.0 }), py)
    };

    Some(Contact {
        normal,
        depth,
        point: a_pos + delta * 0.5,
    })
}

/// Detect and resolve overlaps over all body pairs in id order.
///
/// Solid contacts push bodies apart (static bodies never move, dynamic pairs
/// split the separation) and emit `physics:contact` plus `entity:collision`.
/// Trigger overlaps emit `collider:trigger` without resolution. Returns the
/// number of solid contacts.
pub fn resolve(registry: &mut EntityRegistry, ctx: &mut TickContext<'_>) -> usize {
    let bodies: Vec<Body> = registry
        .iter_live()
        .filter(|e| e.is_alive)
        .filter_map(Body::of)
        .collect();

    let mut contacts = 0;

    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            if a.is_static && b.is_static {
                continue;
            }

            let (Ok(a_pos), Ok(b_pos)) = (
                registry.get(a.id).map(|e| e.pos),
                registry.get(b.id).map(|e| e.pos),
            ) else {
                continue;
            };

            let Some(contact) = overlap(a_pos, a.extent, b_pos, b.extent) else {
                continue;
            };

            match (a.is_trigger, b.is_trigger) {
                (true, true) => continue,
                (true, false) => {
                    ctx.emit(ColliderTriggerEvent {
                        tick: ctx.tick,
                        entity_id: b.id,
                        collider_id: a.id,
                        trigger_pos: b_pos,
                    });
                    continue;
                }
                (false, true) => {
                    ctx.emit(ColliderTriggerEvent {
                        tick: ctx.tick,
                        entity_id: a.id,
                        collider_id: b.id,
                        trigger_pos: a_pos,
                    });
                    continue;
                }
                (false, false) => {}
            }

            let push = contact.normal * contact.depth;
            let (a_shift, b_shift) = match (a.is_static, b.is_static) {
                (true, _) => (Vec2::ZERO, push),
                (_, true) => (-push, Vec2::ZERO),
                _ => (-(push * 0.5), push * 0.5),
            };
            if let Ok(entity) = registry.get_mut(a.id) {
                entity.pos += a_shift;
            }
            if let Ok(entity) = registry.get_mut(b.id) {
                entity.pos += b_shift;
            }

            ctx.emit(PhysicsContactEvent {
                tick: ctx.tick,
                entity_id_a: a.id,
                entity_id_b: b.id,
                contact_point: contact.point,
                normal: contact.normal,
                impulse: contact.depth,
            });
            ctx.emit(EntityCollisionEvent {
                tick: ctx.tick,
                entity_id_a: a.id,
                entity_id_b: b.id,
                contact_point: contact.point,
                normal: contact.normal,
            });
            contacts += 1;
        }
    }

    contacts
}
