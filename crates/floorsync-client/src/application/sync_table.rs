//! Synchronization tables: server id → local entity handle.
//!
//! The server names players and objectives by small integers.  The client
//! names them by [`EntityId`].  A [`SyncTable`] is the bridge: a fixed array
//! indexed by server id where each slot is either unassigned or holds the
//! handle of a live local entity.
//!
//! Two rules keep the mapping sound:
//!
//! - A server id maps to at most one entity.  [`SyncTable::bind`] hands back
//!   whatever the slot held before so the caller can tear it down.
//! - An entity is held by at most one slot.  Binding a handle that another
//!   slot already holds is a bug and panics in debug builds.
//!
//! Indexing past the table's capacity is also a bug and always panics, with
//! the table's name in the message.

use std::ops::Range;

use floorsync_core::protocol::{Team, MAX_OBJECTIVES, OBJECTIVES_PER_FLOOR};

use super::world::EntityId;

/// A value that refers to a local entity.
pub trait Bound: Copy {
    fn entity(&self) -> EntityId;
}

impl Bound for EntityId {
    fn entity(&self) -> EntityId {
        *self
    }
}

/// What the player table remembers about a remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerBinding {
    pub entity: EntityId,
    pub team: Team,
}

impl Bound for PlayerBinding {
    fn entity(&self) -> EntityId {
        self.entity
    }
}

/// Fixed-capacity map from server id to a bound entity.
#[derive(Debug, Clone)]
pub struct SyncTable<T> {
    name: &'static str,
    slots: Vec<Option<T>>,
}

impl<T: Bound> SyncTable<T> {
    /// Creates a table with every slot unassigned.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Value bound at `id`, if any.
    ///
    /// # Panics
    ///
    /// If `id` is not below [`SyncTable::capacity`].
    pub fn get(&self, id: usize) -> Option<T> {
        self.check(id);
        self.slots[id]
    }

    /// Binds `value` at `id` and returns the value it replaced.
    ///
    /// # Panics
    ///
    /// If `id` is out of range, or (debug builds) if another slot already
    /// holds the same entity.
    pub fn bind(&mut self, id: usize, value: T) -> Option<T> {
        self.check(id);
        debug_assert!(
            self.find(value.entity()).map_or(true, |other| other == id),
            "{} table: entity {:?} is already bound",
            self.name,
            value.entity()
        );
        self.slots[id].replace(value)
    }

    /// Resets `id` to unassigned and returns what it held.
    ///
    /// # Panics
    ///
    /// If `id` is out of range.
    pub fn unbind(&mut self, id: usize) -> Option<T> {
        self.check(id);
        self.slots[id].take()
    }

    /// Server id currently bound to `entity`.
    pub fn find(&self, entity: EntityId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.map(|v| v.entity()) == Some(entity))
    }

    /// Resets every slot to unassigned.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Bound slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.map(|v| (id, v)))
    }

    fn check(&self, id: usize) {
        assert!(
            id < self.slots.len(),
            "{} table index {id} out of range (capacity {})",
            self.name,
            self.slots.len()
        );
    }
}

// ── Objective table ───────────────────────────────────────────────────────────

/// Objective ids that belong to `floor`, clamped to the table.
///
/// Floors are numbered from 1: floor 1 owns ids `0..OBJECTIVES_PER_FLOOR`.
/// Floor 0 means "not on a floor yet" and owns nothing.
pub fn floor_objective_range(floor: u32) -> Range<usize> {
    if floor == 0 {
        return 0..0;
    }
    let start = (floor as usize - 1)
        .saturating_mul(OBJECTIVES_PER_FLOOR)
        .min(MAX_OBJECTIVES);
    let end = start.saturating_add(OBJECTIVES_PER_FLOOR).min(MAX_OBJECTIVES);
    start..end
}

/// Objective entities of the current floor plus the last status the server
/// reported for every objective.
#[derive(Debug, Clone)]
pub struct ObjectiveTable {
    entities: SyncTable<EntityId>,
    statuses: [u8; MAX_OBJECTIVES],
}

impl Default for ObjectiveTable {
    fn default() -> Self {
        Self {
            entities: SyncTable::new("objective", MAX_OBJECTIVES),
            statuses: [0; MAX_OBJECTIVES],
        }
    }
}

impl ObjectiveTable {
    /// Objective id to world entity bindings.
    pub fn entities(&self) -> &SyncTable<EntityId> {
        &self.entities
    }

    /// Cached status of objective `id`; `0` means nothing reported yet.
    ///
    /// # Panics
    ///
    /// If `id` is not below `MAX_OBJECTIVES`.
    pub fn status(&self, id: usize) -> u8 {
        assert!(
            id < MAX_OBJECTIVES,
            "objective table index {id} out of range (capacity {MAX_OBJECTIVES})"
        );
        self.statuses[id]
    }

    /// Copies reported statuses up to the first zero entry.
    ///
    /// Returns how many were cached.  Entries after the first zero keep
    /// their previous value.
    pub fn cache_statuses(&mut self, reported: &[u8; MAX_OBJECTIVES]) -> usize {
        let count = reported.iter().take_while(|&&s| s != 0).count();
        self.statuses[..count].copy_from_slice(&reported[..count]);
        count
    }

    /// Unbinds every objective and binds `entities` to the slots of `floor`.
    ///
    /// Entities beyond the floor's slot range are ignored.
    pub fn rebind_floor(&mut self, floor: u32, entities: &[EntityId]) -> usize {
        self.entities.reset();
        let mut bound = 0;
        for (id, &entity) in floor_objective_range(floor).zip(entities) {
            self.entities.bind(id, entity);
            bound += 1;
        }
        bound
    }

    /// Bound objectives of `floor` paired with their cached, nonzero status.
    pub fn statuses_for_floor(&self, floor: u32) -> Vec<(EntityId, u8)> {
        floor_objective_range(floor)
            .filter_map(|id| {
                let entity = self.entities.get(id)?;
                let status = self.statuses[id];
                (status != 0).then_some((entity, status))
            })
            .collect()
    }

    /// Unbinds everything and forgets every cached status.
    pub fn reset(&mut self) {
        self.entities.reset();
        self.statuses = [0; MAX_OBJECTIVES];
    }
}
