//! The game world as seen by the update system.
//!
//! The update system never touches rendering, physics, or audio directly.  It
//! drives the world through the [`World`] trait, and the client plugs in
//! whatever entity system it runs.  The infrastructure layer ships an
//! in-memory implementation used by the binary and the tests.

use floorsync_core::protocol::Team;

/// Opaque handle to a live world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Sprite set a player entity is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    /// Fixed look shared by every team A player.
    TeamA,
    /// Look picked by the player's character selector.
    Character(u8),
}

/// Collision behaviour of a player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Team A: catches runners and claims objectives.
    Tagger,
    /// Team B: evades taggers.
    Runner,
    /// No team: does not collide.
    Spectator,
}

/// Facing derived from velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Facing for a velocity, or `None` to keep the previous facing.
    ///
    /// The horizontal axis is looked at first; a nonzero vertical component
    /// then overrides it.  World coordinates: positive `vy` points up.
    pub fn from_velocity(vx: f32, vy: f32) -> Option<Direction> {
        let mut facing = None;
        if vx < 0.0 {
            facing = Some(Direction::Left);
        } else if vx > 0.0 {
            facing = Some(Direction::Right);
        }
        if vy < 0.0 {
            facing = Some(Direction::Down);
        } else if vy > 0.0 {
            facing = Some(Direction::Up);
        }
        facing
    }
}

/// Appearance for a player on `team` with character selector `character`.
pub fn appearance_for(team: Team, character: u8) -> Appearance {
    match team {
        Team::A => Appearance::TeamA,
        Team::B | Team::None => Appearance::Character(character),
    }
}

/// Collision role for a player on `team`.
pub fn role_for(team: Team) -> Role {
    match team {
        Team::A => Role::Tagger,
        Team::B => Role::Runner,
        Team::None => Role::Spectator,
    }
}

/// Everything the update system needs from the client's entity system.
#[cfg_attr(test, mockall::automock)]
pub trait World {
    /// The locally controlled player entity.  Always alive.
    fn controllable_player(&self) -> EntityId;

    /// Creates a remote player entity.
    fn spawn_player(&mut self, appearance: Appearance, role: Role) -> EntityId;

    /// Destroys an entity.  Unknown handles are ignored.
    fn despawn(&mut self, entity: EntityId);

    fn is_alive(&self, entity: EntityId) -> bool;

    fn set_role(&mut self, entity: EntityId, role: Role);

    fn load_appearance(&mut self, entity: EntityId, appearance: Appearance);

    /// Moves an entity to `(x, y)` on `floor`.
    fn place(&mut self, entity: EntityId, x: f32, y: f32, floor: u32);

    /// Sets velocity; `facing` of `None` keeps the current facing.
    fn set_velocity(&mut self, entity: EntityId, vx: f32, vy: f32, facing: Option<Direction>);

    /// Shows or hides an entity and enables or disables its collision.
    fn set_active(&mut self, entity: EntityId, active: bool);

    /// Tears down the current floor and builds `floor`.
    fn request_floor_rebuild(&mut self, floor: u32);

    /// Objective entities present on the current floor, in slot order.
    fn objective_entities(&self) -> Vec<EntityId>;

    fn set_objective_status(&mut self, entity: EntityId, status: u8);

    /// Appends a line to the chat log.
    fn push_chat(&mut self, sender: u32, text: &str);
}
