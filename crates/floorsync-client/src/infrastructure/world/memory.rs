//! In-memory entity store implementing [`World`].
//!
//! # Why an in-memory world?
//!
//! The real client renders sprites and runs collision.  None of that matters
//! to the network layer, which only needs somewhere to spawn, move, and tear
//! down entities.  `InMemoryWorld` keeps one [`EntityRecord`] per live entity
//! in a `HashMap`, so the headless binary has a world to drive and tests can
//! inspect exactly what the update system did to it.
//!
//! A floor rebuild despawns the previous floor's objectives and spawns
//! `objectives_per_floor` fresh ones.

use std::collections::HashMap;

use crate::application::world::{Appearance, Direction, EntityId, Role, World};

/// What kind of thing an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Controllable,
    RemotePlayer,
    Objective,
}

/// Everything the world knows about one live entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub appearance: Option<Appearance>,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub floor: u32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Direction,
    pub active: bool,
    pub objective_status: u8,
}

impl EntityRecord {
    fn new(kind: EntityKind, appearance: Option<Appearance>, role: Role, floor: u32) -> Self {
        Self {
            kind,
            appearance,
            role,
            x: 0.0,
            y: 0.0,
            floor,
            vx: 0.0,
            vy: 0.0,
            facing: Direction::Down,
            active: true,
            objective_status: 0,
        }
    }
}

/// Headless [`World`] backed by a `HashMap`.
#[derive(Debug)]
pub struct InMemoryWorld {
    entities: HashMap<EntityId, EntityRecord>,
    next_id: u32,
    controllable: EntityId,
    objectives_per_floor: usize,
    floor_objectives: Vec<EntityId>,
    current_floor: u32,
    chat: Vec<(u32, String)>,
    rebuilds: Vec<u32>,
}

impl Default for InMemoryWorld {
    fn default() -> Self {
        Self::new(0)
    }
}

impl InMemoryWorld {
    /// A world holding only the controllable player.
    pub fn new(objectives_per_floor: usize) -> Self {
        let controllable = EntityId(1);
        let mut entities = HashMap::new();
        entities.insert(
            controllable,
            EntityRecord::new(EntityKind::Controllable, None, Role::Spectator, 0),
        );
        Self {
            entities,
            next_id: 2,
            controllable,
            objectives_per_floor,
            floor_objectives: Vec::new(),
            current_floor: 0,
            chat: Vec::new(),
            rebuilds: Vec::new(),
        }
    }

    /// Record for `entity`, if it is alive.
    pub fn entity(&self, entity: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&entity)
    }

    /// Number of live entities, the controllable player included.
    pub fn live_count(&self) -> usize {
        self.entities.len()
    }

    /// Live remote players.
    pub fn remote_players(&self) -> impl Iterator<Item = (EntityId, &EntityRecord)> {
        self.entities
            .iter()
            .filter(|(_, r)| r.kind == EntityKind::RemotePlayer)
            .map(|(id, r)| (*id, r))
    }

    /// Chat lines shown so far as `(sender, text)`, oldest first.
    pub fn chat_log(&self) -> &[(u32, String)] {
        &self.chat
    }

    /// Floors rebuilt so far, oldest first.
    pub fn rebuilds(&self) -> &[u32] {
        &self.rebuilds
    }

    fn allocate(&mut self, record: EntityRecord) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(2);
        self.entities.insert(id, record);
        id
    }
}

impl World for InMemoryWorld {
    fn controllable_player(&self) -> EntityId {
        self.controllable
    }

    fn spawn_player(&mut self, appearance: Appearance, role: Role) -> EntityId {
        let record = EntityRecord::new(
            EntityKind::RemotePlayer,
            Some(appearance),
            role,
            self.current_floor,
        );
        self.allocate(record)
    }

    fn despawn(&mut self, entity: EntityId) {
        if entity == self.controllable {
            return;
        }
        self.entities.remove(&entity);
        self.floor_objectives.retain(|&e| e != entity);
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn set_role(&mut self, entity: EntityId, role: Role) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.role = role;
        }
    }

    fn load_appearance(&mut self, entity: EntityId, appearance: Appearance) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.appearance = Some(appearance);
        }
    }

    fn place(&mut self, entity: EntityId, x: f32, y: f32, floor: u32) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.x = x;
            record.y = y;
            record.floor = floor;
        }
    }

    fn set_velocity(&mut self, entity: EntityId, vx: f32, vy: f32, facing: Option<Direction>) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.vx = vx;
            record.vy = vy;
            if let Some(facing) = facing {
                record.facing = facing;
            }
        }
    }

    fn set_active(&mut self, entity: EntityId, active: bool) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.active = active;
        }
    }

    fn request_floor_rebuild(&mut self, floor: u32) {
        for entity in std::mem::take(&mut self.floor_objectives) {
            self.entities.remove(&entity);
        }
        self.current_floor = floor;
        for _ in 0..self.objectives_per_floor {
            let record = EntityRecord::new(EntityKind::Objective, None, Role::Spectator, floor);
            let id = self.allocate(record);
            self.floor_objectives.push(id);
        }
        self.rebuilds.push(floor);
    }

    fn objective_entities(&self) -> Vec<EntityId> {
        self.floor_objectives.clone()
    }

    fn set_objective_status(&mut self, entity: EntityId, status: u8) {
        if let Some(record) = self.entities.get_mut(&entity) {
            record.objective_status = status;
        }
    }

    fn push_chat(&mut self, sender: u32, text: &str) {
        self.chat.push((sender, text.to_string()));
    }
}
