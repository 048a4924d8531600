use std::collections::HashMap;

use crate::api::types::{ContactEvent, EntityId};
use crate::core::convert::point_to_vec3;
use crate::core::registry::{unpack_user_data, EntityRegistry};
use crate::core::world::Simulation;
use crate::input::commands::CommandQueue;

/// Callback run for each contact of its trigger entity.
///
/// The world is busy while handlers run, so they queue their mutations instead.
pub type ContactHandler = Box<dyn FnMut(&ContactEvent, &mut CommandQueue)>;

/// Scan the current contact pairs for trigger contacts.
///
/// A pair counts when exactly one side is a trigger and at least one contact point
/// penetrates. At most one event is produced per pair, at the first penetrating point.
pub(crate) fn collect_trigger_contacts(
    sim: &Simulation,
    registry: &EntityRegistry,
    out: &mut Vec<ContactEvent>,
) {
    for pair in sim.narrow_phase.contact_pairs() {
        let (Some(co1), Some(co2)) = (
            sim.colliders.get(pair.collider1),
            sim.colliders.get(pair.collider2),
        ) else {
            continue;
        };
        let (e1, i1) = unpack_user_data(co1.user_data);
        let (e2, i2) = unpack_user_data(co2.user_data);

        let (trigger, trigger_index, other, other_index) =
            match (registry.is_trigger(e1), registry.is_trigger(e2)) {
                (true, false) => (e1, i1, e2, i2),
                (false, true) => (e2, i2, e1, i1),
                _ => continue,
            };

        // Manifold points are computed even for pairs the solver ignores.
        let point = pair.manifolds.iter().find_map(|manifold| {
            manifold.points.iter().find(|c| c.dist < 0.0).map(|c| {
                let local = manifold
                    .subshape_pos1
                    .map_or(c.local_p1, |pos| pos * c.local_p1);
                co1.position() * local
            })
        });

        if let Some(point) = point {
            out.push(ContactEvent {
                trigger,
                trigger_index,
                other,
                other_index,
                point: point_to_vec3(&point),
            });
        }
    }
}

/// Run the handler of each event's trigger entity. Triggers without a handler are skipped.
pub(crate) fn dispatch(
    events: &[ContactEvent],
    handlers: &mut HashMap<EntityId, ContactHandler>,
    commands: &mut CommandQueue,
) {
    for event in events {
        if let Some(handler) = handlers.get_mut(&event.trigger) {
            handler(event, commands);
        }
    }
}
