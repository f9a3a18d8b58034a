//! Network session state owned by the gameplay thread.
//!
//! Everything the update system reconciles lives here: both synchronization
//! tables and the handful of flags that gate how packets are applied.  Only
//! the gameplay thread touches it, so nothing here is locked.

use floorsync_core::protocol::{GameState, Team, MAX_PLAYERS};

use super::sync_table::{ObjectiveTable, PlayerBinding, SyncTable};

#[derive(Debug, Clone)]
pub struct SessionState {
    /// Server player id → remote (or controllable) player entity.
    pub players: SyncTable<PlayerBinding>,
    pub objectives: ObjectiveTable,
    /// Reads from the network are allowed.
    pub ready: bool,
    /// A floor move was requested; only floor-move packets apply until it lands.
    pub floor_change_pending: bool,
    /// Id the server assigned to this client, once accepted.
    pub my_player_id: Option<usize>,
    pub my_team: Team,
    /// Team this client plays for in the current round.  Cleared when a round ends.
    pub active_team: Option<Team>,
    pub game_state: GameState,
    /// Floor the controllable player is on.
    pub current_floor: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            players: SyncTable::new("player", MAX_PLAYERS),
            objectives: ObjectiveTable::default(),
            ready: false,
            floor_change_pending: false,
            my_player_id: None,
            my_team: Team::None,
            active_team: None,
            game_state: GameState::Lobby,
            current_floor: 0,
        }
    }
}

impl SessionState {
    /// Forgets every binding and marks the session not ready.
    ///
    /// The controllable player's own floor and id are kept so the gameplay
    /// layer can still render where it was.
    pub fn reset(&mut self) {
        self.players.reset();
        self.objectives.reset();
        self.ready = false;
        self.floor_change_pending = false;
        self.active_team = None;
    }

    /// True when this id belongs to the local player.
    pub fn is_me(&self, id: usize) -> bool {
        self.my_player_id == Some(id)
    }
}
