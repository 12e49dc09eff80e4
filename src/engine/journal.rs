use crate::entity::{EntityId, EntitySpec};
use crate::state::EntityRegistry;
use crate::Tick;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Host command issued between ticks
#[derive(Clone, Debug, PartialEq)]
pub enum HostCommand {
    /// Spawn that was handed `id`; replay reinserts it under the same id
    Spawn { id: EntityId, spec: EntitySpec },
    Despawn(EntityId),
}

/// Host commands keyed by the completed tick they were issued after.
///
/// A memento tagged `T` never includes commands keyed `T`, so replaying from
/// `T` applies them again at the same boundary.
#[derive(Clone, Debug, Default)]
pub struct CommandJournal {
    entries: BTreeMap<Tick, Vec<HostCommand>>,
}

impl CommandJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, boundary: Tick, command: HostCommand) {
        self.entries.entry(boundary).or_default().push(command);
    }

    /// Commands issued after tick `boundary`, in issue order
    pub fn commands_at(&self, boundary: Tick) -> &[HostCommand] {
        self.entries.get(&boundary).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids handed out by host spawns issued at or after `boundary`
    pub fn spawned_ids_from(&self, boundary: Tick) -> impl Iterator<Item = EntityId> + '_ {
        self.entries
            .range(boundary..)
            .flat_map(|(_, commands)| commands)
            .filter_map(|command| match command {
                HostCommand::Spawn { id, .. } => Some(*id),
                HostCommand::Despawn(_) => None,
            })
    }

    /// Forget commands issued before `tick` (no longer reachable by rollback)
    pub fn prune_before(&mut self, tick: Tick) {
        self.entries = self.entries.split_off(&tick);
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Re-apply journaled commands to a replaying registry.
///
/// Commands that no longer apply are skipped.
pub fn apply(registry: &mut EntityRegistry, commands: &[HostCommand]) {
    for command in commands {
        match command {
            HostCommand::Spawn { id, spec } => {
                if let Err(e) = registry.spawn_with_id(*id, spec) {
                    warn!(entity_id = %id, error = %e, "Journaled spawn no longer valid during replay");
                }
            }
            HostCommand::Despawn(id) => {
                if let Err(e) = registry.despawn(*id) {
                    debug!(entity_id = %id, error = %e, "Journaled despawn skipped during replay");
                }
            }
        }
    }
}
