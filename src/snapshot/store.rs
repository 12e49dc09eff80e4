use super::GameStateMemento;
use crate::error::EngineError;
use crate::Tick;
use std::collections::VecDeque;
use tracing::debug;

/// Bounded ring buffer of mementos, oldest evicted first.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    capacity: usize,
    mementos: VecDeque<GameStateMemento>,
}

impl SnapshotStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            mementos: VecDeque::with_capacity(capacity),
        }
    }

    /// Store a memento, keeping ticks strictly increasing.
    ///
    /// Stored mementos at or after the new tick are discarded first; the
    /// oldest memento is evicted when the buffer is full.
    pub fn push(&mut self, memento: GameStateMemento) {
        self.truncate_from(memento.tick);

        if self.mementos.len() >= self.capacity {
            if let Some(evicted) = self.mementos.pop_front() {
                debug!(tick = evicted.tick, "Evicted oldest snapshot");
            }
        }

        self.mementos.push_back(memento);
    }

    /// Memento for an exact stored tick
    pub fn restore(&self, tick: Tick) -> Result<&GameStateMemento, EngineError> {
        self.get(tick).ok_or(EngineError::RollbackOutOfRange {
            anchor: tick,
            oldest: self.oldest_tick(),
            newest: self.newest_tick(),
        })
    }

    pub fn get(&self, tick: Tick) -> Option<&GameStateMemento> {
        self.mementos
            .binary_search_by_key(&tick, |m| m.tick)
            .ok()
            .and_then(|index| self.mementos.get(index))
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.get(tick).is_some()
    }

    /// Drop mementos newer than `tick`
    pub fn truncate_after(&mut self, tick: Tick) -> usize {
        let keep = self.mementos.partition_point(|m| m.tick <= tick);
        let dropped = self.mementos.len() - keep;
        self.mementos.truncate(keep);
        dropped
    }

    fn truncate_from(&mut self, tick: Tick) {
        let keep = self.mementos.partition_point(|m| m.tick < tick);
        self.mementos.truncate(keep);
    }

    pub fn latest(&self) -> Option<&GameStateMemento> {
        self.mementos.back()
    }

    pub fn oldest_tick(&self) -> Option<Tick> {
        self.mementos.front().map(|m| m.tick)
    }

    pub fn newest_tick(&self) -> Option<Tick> {
        self.mementos.back().map(|m| m.tick)
    }

    /// Stored ticks, oldest first
    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.mementos.iter().map(|m| m.tick)
    }

    pub fn len(&self) -> usize {
        self.mementos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mementos.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.mementos.clear();
    }
}
