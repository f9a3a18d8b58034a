//! Packet type catalogue, payload size table, and transport classification.
//!
//! Both ends of the connection agree on this file statically.  Nothing on the
//! wire says how long a payload is: the receiver reads the 4-byte type word,
//! validates it, and then looks the payload length up in [`PAYLOAD_SIZES`].
//!
//! # Why a size table instead of a length field? (for beginners)
//!
//! Every packet type has a *fixed* payload layout (no strings of variable
//! length, no optional sections).  Sending a length field would duplicate
//! information both sides already know.  Worse, it would give a
//! corrupted or malicious packet a way to make the receiver allocate or read
//! an arbitrary number of bytes.  With a table lookup the only untrusted
//! value is the type word, and it is range-checked before it is ever used as
//! an index.

use serde::{Deserialize, Serialize};

// ── Fixed limits ──────────────────────────────────────────────────────────────

/// Number of server player slots.  Server player ids are `0..MAX_PLAYERS`.
pub const MAX_PLAYERS: usize = 16;

/// Number of objective slots across all floors.
pub const MAX_OBJECTIVES: usize = 32;

/// Objectives are laid out densely, this many per floor.
pub const OBJECTIVES_PER_FLOOR: usize = 8;

/// Length of the NUL-padded player name carried by `ConnectAccept`.
pub const NAME_LEN: usize = 16;

/// Length of the NUL-padded text carried by `ChatSend`.
pub const CHAT_LEN: usize = 128;

/// Highest valid packet type value.  Valid types are `1..=NUM_TYPES`.
pub const NUM_TYPES: u32 = 12;

/// Size of the type word that prefixes every frame.
pub const TYPE_WORD_SIZE: usize = 4;

/// Size of the timestamp trailer on unreliable-transport datagrams.
pub const TIMESTAMP_SIZE: usize = 8;

/// Packet-count value on the gameplay pipe meaning "no packets follow; an
/// error message follows instead".
pub const SHUTDOWN_SENTINEL: u32 = u32::MAX;

// ── Packet types ──────────────────────────────────────────────────────────────

/// Every packet type in the protocol.
///
/// Value `0` is reserved ("undefined") and is never produced by a
/// well-behaved peer; receiving it is treated as corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PacketType {
    ConnectAccept = 1,
    GameStatus = 2,
    ChatSend = 3,
    ClientLobby = 4,
    ObjectiveLocation = 5,
    ObjectiveStatus = 6,
    PositionUpdateRequest = 7,
    AllPositionUpdate = 8,
    FloorMoveRequest = 9,
    FloorMove = 10,
    Tagging = 11,
    KeepAlive = 12,
}

impl PacketType {
    /// All defined types in wire order.
    pub const ALL: [PacketType; NUM_TYPES as usize] = [
        PacketType::ConnectAccept,
        PacketType::GameStatus,
        PacketType::ChatSend,
        PacketType::ClientLobby,
        PacketType::ObjectiveLocation,
        PacketType::ObjectiveStatus,
        PacketType::PositionUpdateRequest,
        PacketType::AllPositionUpdate,
        PacketType::FloorMoveRequest,
        PacketType::FloorMove,
        PacketType::Tagging,
        PacketType::KeepAlive,
    ];

    /// Fixed payload length for this type.
    pub fn payload_size(self) -> usize {
        PAYLOAD_SIZES[self.table_index()]
    }

    /// Which transport carries this type.
    pub fn transport(self) -> Transport {
        match self {
            PacketType::ConnectAccept
            | PacketType::GameStatus
            | PacketType::ChatSend
            | PacketType::ClientLobby
            | PacketType::ObjectiveLocation
            | PacketType::ObjectiveStatus
            | PacketType::KeepAlive => Transport::Reliable,
            PacketType::PositionUpdateRequest
            | PacketType::AllPositionUpdate
            | PacketType::FloorMoveRequest
            | PacketType::FloorMove
            | PacketType::Tagging => Transport::Unreliable,
        }
    }

    /// Wire value of this type.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    fn table_index(self) -> usize {
        // Discriminants are 1..=NUM_TYPES, so this never underflows.
        self as usize - 1
    }
}

impl TryFrom<u32> for PacketType {
    type Error = u32;

    /// Validates `1 <= value <= NUM_TYPES`.  The rejected value is handed back
    /// so callers can report it.
    fn try_from(value: u32) -> Result<Self, u32> {
        if value == 0 || value > NUM_TYPES {
            return Err(value);
        }
        Ok(PacketType::ALL[(value - 1) as usize])
    }
}

/// Payload sizes indexed by `type - 1`.
pub const PAYLOAD_SIZES: [usize; NUM_TYPES as usize] = [
    12 + NAME_LEN,          // ConnectAccept: code, player_id, team, name
    4 + 4 * MAX_PLAYERS,    // GameStatus: game_state + per-player status
    4 + CHAT_LEN,           // ChatSend: sender + text
    16,                     // ClientLobby: player_id, team, character, ready
    MAX_OBJECTIVES,         // ObjectiveLocation: status per slot
    4 + MAX_OBJECTIVES,     // ObjectiveStatus: game_state + status per slot
    24,                     // PositionUpdateRequest: id, floor, x, y, vx, vy
    8 + 16 * MAX_PLAYERS,   // AllPositionUpdate: floor, mask, x/y/vx/vy per player
    12,                     // FloorMoveRequest: id, current, target
    12,                     // FloorMove: floor, x, y
    8,                      // Tagging: tagger, objective
    0,                      // KeepAlive
];

/// Largest payload in the catalogue; sizes receive buffers.
pub const MAX_PAYLOAD_SIZE: usize = 8 + 16 * MAX_PLAYERS;

/// Largest datagram a well-formed peer can send.
pub const MAX_DATAGRAM_SIZE: usize = TYPE_WORD_SIZE + MAX_PAYLOAD_SIZE + TIMESTAMP_SIZE;

// ── Transport classification ──────────────────────────────────────────────────

/// The two transports a packet may travel on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// Ordered byte stream (TCP).  Frames are `[type][payload]`.
    Reliable,
    /// Best-effort datagrams (UDP).  Frames are `[type][payload][timestamp]`.
    Unreliable,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
