//! Typed payloads for every packet in the catalogue.
//!
//! The codec turns the fixed-size byte payloads into these structs (and back).
//! Nothing here touches bytes directly; see [`crate::protocol::codec`].

use serde::{Deserialize, Serialize};

use crate::protocol::types::{PacketType, MAX_OBJECTIVES, MAX_PLAYERS};

// ── Enumerated fields ─────────────────────────────────────────────────────────

/// Team assignment of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Team {
    #[default]
    None = 0,
    A = 1,
    B = 2,
}

impl TryFrom<u32> for Team {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(Team::None),
            1 => Ok(Team::A),
            2 => Ok(Team::B),
            _ => Err(()),
        }
    }
}

/// Outcome carried by a `ConnectAccept` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ConnectCode {
    /// Sent by the client when it asks to join.
    Requested = 0,
    /// The server admitted the client.
    Accepted = 1,
    /// The server refused the client.
    Denied = 2,
}

impl TryFrom<u32> for ConnectCode {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(ConnectCode::Requested),
            1 => Ok(ConnectCode::Accepted),
            2 => Ok(ConnectCode::Denied),
            _ => Err(()),
        }
    }
}

/// Overall game phase reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum GameState {
    #[default]
    Lobby = 0,
    Running = 1,
    TeamAWon = 2,
    TeamBWon = 3,
}

impl GameState {
    /// Either team has won; the round is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::TeamAWon | GameState::TeamBWon)
    }
}

impl TryFrom<u32> for GameState {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, ()> {
        match value {
            0 => Ok(GameState::Lobby),
            1 => Ok(GameState::Running),
            2 => Ok(GameState::TeamAWon),
            3 => Ok(GameState::TeamBWon),
            _ => Err(()),
        }
    }
}

// ── Per-packet payloads ───────────────────────────────────────────────────────

/// CONNECT_ACCEPT (1): join request from the client, verdict from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectAcceptMessage {
    pub connect_code: ConnectCode,
    /// Server player id assigned to this client (ignored in requests).
    pub player_id: u32,
    pub team: Team,
    /// Display name, at most [`crate::protocol::types::NAME_LEN`] bytes of UTF-8.
    pub name: String,
}

/// Status of one server player slot inside [`GameStatusMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub valid: bool,
    pub team: Team,
    /// Character selector; picks the appearance set for non-team-A players.
    pub character: u8,
    pub ready: bool,
}

/// GAME_STATUS (2): validity and team of every player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatusMessage {
    pub game_state: GameState,
    pub players: [PlayerStatus; MAX_PLAYERS],
}

/// CHAT_SEND (3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: u32,
    pub text: String,
}

/// CLIENT_LOBBY (4): the client's lobby selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLobbyMessage {
    pub player_id: u32,
    pub team: Team,
    pub character: u32,
    pub ready: bool,
}

/// OBJECTIVE_LOCATION (5): initial objective layout, one status byte per slot.
///
/// A zero byte marks the end of the densely packed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveLocationMessage {
    pub statuses: [u8; MAX_OBJECTIVES],
}

/// OBJECTIVE_STATUS (6): objective statuses plus the game phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveStatusMessage {
    pub game_state: GameState,
    pub statuses: [u8; MAX_OBJECTIVES],
}

/// POSITION_UPDATE_REQUEST (7): the client's own motion, sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdateRequestMessage {
    pub player_id: u32,
    pub floor: u32,
    pub motion: PlayerMotion,
}

/// Position and velocity of one player.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerMotion {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// ALL_POSITION_UPDATE (8): every player's motion on one floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllPositionUpdateMessage {
    /// The floor this update describes.
    pub floor: u32,
    /// Bit `i` set means server player `i` is on `floor`.
    pub on_floor_mask: u32,
    pub players: [PlayerMotion; MAX_PLAYERS],
}

impl AllPositionUpdateMessage {
    /// Whether `player_id` is listed as present on this update's floor.
    pub fn is_on_floor(&self, player_id: usize) -> bool {
        player_id < MAX_PLAYERS && self.on_floor_mask & (1 << player_id) != 0
    }
}

/// FLOOR_MOVE_REQUEST (9): the client asks to change floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorMoveRequestMessage {
    pub player_id: u32,
    pub current_floor: u32,
    pub target_floor: u32,
}

/// FLOOR_MOVE (10): the server moves the client to a new floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorMoveMessage {
    pub new_floor: u32,
    pub x: f32,
    pub y: f32,
}

/// TAGGING (11): a player tags an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingMessage {
    pub tagger_id: u32,
    pub objective_id: u32,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// A decoded packet payload, tagged by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    ConnectAccept(ConnectAcceptMessage),
    GameStatus(GameStatusMessage),
    Chat(ChatMessage),
    ClientLobby(ClientLobbyMessage),
    ObjectiveLocation(ObjectiveLocationMessage),
    ObjectiveStatus(ObjectiveStatusMessage),
    PositionUpdateRequest(PositionUpdateRequestMessage),
    AllPositionUpdate(AllPositionUpdateMessage),
    FloorMoveRequest(FloorMoveRequestMessage),
    FloorMove(FloorMoveMessage),
    Tagging(TaggingMessage),
    KeepAlive,
}

impl Message {
    /// The packet type this message is sent as.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Message::ConnectAccept(_) => PacketType::ConnectAccept,
            Message::GameStatus(_) => PacketType::GameStatus,
            Message::Chat(_) => PacketType::ChatSend,
            Message::ClientLobby(_) => PacketType::ClientLobby,
            Message::ObjectiveLocation(_) => PacketType::ObjectiveLocation,
            Message::ObjectiveStatus(_) => PacketType::ObjectiveStatus,
            Message::PositionUpdateRequest(_) => PacketType::PositionUpdateRequest,
            Message::AllPositionUpdate(_) => PacketType::AllPositionUpdate,
            Message::FloorMoveRequest(_) => PacketType::FloorMoveRequest,
            Message::FloorMove(_) => PacketType::FloorMove,
            Message::Tagging(_) => PacketType::Tagging,
            Message::KeepAlive => PacketType::KeepAlive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_win_states_are_terminal() {
        assert!(!GameState::Lobby.is_terminal());
        assert!(!GameState::Running.is_terminal());
        assert!(GameState::TeamAWon.is_terminal());
        assert!(GameState::TeamBWon.is_terminal());
    }

    #[test]
    fn test_is_on_floor_reads_mask_bits() {
        let msg = AllPositionUpdateMessage {
            floor: 0,
            on_floor_mask: 0b1010,
            players: [PlayerMotion::default(); MAX_PLAYERS],
        };
        assert!(!msg.is_on_floor(0));
        assert!(msg.is_on_floor(1));
        assert!(msg.is_on_floor(3));
        assert!(!msg.is_on_floor(MAX_PLAYERS));
    }

    #[test]
    fn test_team_rejects_unknown_values() {
        assert_eq!(Team::try_from(2), Ok(Team::B));
        assert_eq!(Team::try_from(3), Err(()));
    }
}
