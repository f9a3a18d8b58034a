//! Binary framing and payload codec for the floorsync protocol.
//!
//! Wire formats (all integers big-endian):
//! ```text
//! reliable (TCP stream):    [type:4][payload:PAYLOAD_SIZES[type-1]]
//! unreliable (UDP dgram):   [type:4][payload:PAYLOAD_SIZES[type-1]][timestamp_us:8]
//! ```
//! There is no length field.  The type word is validated against
//! `1..=NUM_TYPES` before it is used to look up the payload length, so a
//! corrupted type can never index past the size table.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{
    ChatMessage, ClientLobbyMessage, ConnectAcceptMessage, ConnectCode, FloorMoveMessage,
    FloorMoveRequestMessage, GameState, GameStatusMessage, Message, ObjectiveLocationMessage,
    ObjectiveStatusMessage, PlayerMotion, PlayerStatus, PositionUpdateRequestMessage,
    AllPositionUpdateMessage, TaggingMessage, Team,
};
use crate::protocol::types::{
    PacketType, Transport, CHAT_LEN, MAX_OBJECTIVES, MAX_PLAYERS, NAME_LEN, NUM_TYPES,
    TIMESTAMP_SIZE, TYPE_WORD_SIZE,
};

/// Errors produced while framing or decoding packets.
///
/// Everything except [`ProtocolError::OutOfMemory`] means the bytes were
/// corrupt; see [`ProtocolError::is_corruption`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The type word is outside `1..=NUM_TYPES`.
    #[error("corrupted packet: type {0} outside 1..={NUM_TYPES}")]
    InvalidType(u32),

    /// Fewer bytes than the type's fixed payload requires.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// A datagram whose length is not exactly `type + payload + timestamp`.
    #[error("corrupted datagram: expected {expected} bytes, got {actual}")]
    DatagramLength { expected: usize, actual: usize },

    /// A payload field holds a value outside its enumeration, or bad UTF-8.
    #[error("corrupted payload: {0}")]
    MalformedPayload(String),

    /// The payload buffer could not be allocated.
    #[error("out of memory allocating a {0}-byte payload")]
    OutOfMemory(usize),
}

impl ProtocolError {
    /// True for every variant that means "these bytes are garbage".
    pub fn is_corruption(&self) -> bool {
        !matches!(self, ProtocolError::OutOfMemory(_))
    }
}

// ── Framing ───────────────────────────────────────────────────────────────────

/// Validates a raw type word.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidType`] for `0` and anything above
/// [`NUM_TYPES`].
pub fn decode_type(word: u32) -> Result<PacketType, ProtocolError> {
    PacketType::try_from(word).map_err(ProtocolError::InvalidType)
}

/// Decodes `[type:4][payload]` from the start of `raw`.
///
/// Returns `Ok(None)` for keep-alives, which carry nothing for the consumer.
/// Reads exactly `4 + payload_size` bytes; anything after that is ignored.
///
/// # Errors
///
/// [`ProtocolError::InvalidType`] when the type word is out of range,
/// [`ProtocolError::InsufficientData`] when `raw` is shorter than the frame,
/// [`ProtocolError::OutOfMemory`] when the payload cannot be allocated.
///
/// # Examples
///
/// ```rust
/// use floorsync_core::protocol::codec::{decode_type_and_payload, frame_for_transport};
/// use floorsync_core::protocol::types::PacketType;
///
/// let frame = frame_for_transport(PacketType::Tagging, &[0, 0, 0, 1, 0, 0, 0, 2], 0).unwrap();
/// let (t, payload) = decode_type_and_payload(&frame).unwrap().unwrap();
/// assert_eq!(t, PacketType::Tagging);
/// assert_eq!(payload, vec![0, 0, 0, 1, 0, 0, 0, 2]);
/// ```
pub fn decode_type_and_payload(raw: &[u8]) -> Result<Option<(PacketType, Vec<u8>)>, ProtocolError> {
    let word = read_u32(raw, 0)?;
    let packet_type = decode_type(word)?;
    let size = packet_type.payload_size();
    let end = TYPE_WORD_SIZE + size;
    if raw.len() < end {
        return Err(ProtocolError::InsufficientData {
            needed: end,
            available: raw.len(),
        });
    }
    if packet_type == PacketType::KeepAlive {
        trace!("keep-alive dropped");
        return Ok(None);
    }
    let payload = copy_payload(&raw[TYPE_WORD_SIZE..end])?;
    Ok(Some((packet_type, payload)))
}

/// Length of the complete reliable-transport frame at the start of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed.  Used by the stream reader
/// to carve frames out of its accumulation buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidType`] as soon as a bad type word is
/// visible, without waiting for a payload that can never be sized.
pub fn stream_frame_len(buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
    if buf.len() < TYPE_WORD_SIZE {
        return Ok(None);
    }
    let packet_type = decode_type(read_u32(buf, 0)?)?;
    let len = TYPE_WORD_SIZE + packet_type.payload_size();
    Ok((buf.len() >= len).then_some(len))
}

/// Frames `payload` for the transport `packet_type` travels on.
///
/// Reliable frames are `[type][payload]`; `timestamp_us` is not sent.
/// Unreliable frames append `timestamp_us` so the whole datagram is
/// `[type][payload][timestamp]`.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] if `payload` is not exactly the
/// type's fixed size (shorter) or [`ProtocolError::MalformedPayload`] (longer).
pub fn frame_for_transport(
    packet_type: PacketType,
    payload: &[u8],
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let size = packet_type.payload_size();
    if payload.len() < size {
        return Err(ProtocolError::InsufficientData {
            needed: size,
            available: payload.len(),
        });
    }
    if payload.len() > size {
        return Err(ProtocolError::MalformedPayload(format!(
            "{packet_type:?} payload is {} bytes, table says {size}",
            payload.len()
        )));
    }

    let transport = packet_type.transport();
    let mut buf = Vec::with_capacity(TYPE_WORD_SIZE + size + TIMESTAMP_SIZE);
    buf.extend_from_slice(&packet_type.as_u32().to_be_bytes());
    buf.extend_from_slice(payload);
    if transport == Transport::Unreliable {
        buf.extend_from_slice(&timestamp_us.to_be_bytes());
    }
    Ok(buf)
}

/// [`frame_for_transport`] stamped with the current wall clock.
///
/// # Errors
///
/// Same as [`frame_for_transport`].
pub fn frame_for_transport_now(
    packet_type: PacketType,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    frame_for_transport(packet_type, payload, now_us())
}

/// Decodes one unreliable-transport datagram.
///
/// The datagram must be exactly `4 + payload_size + 8` bytes.  Returns the
/// type, the payload, and the sender's trailing timestamp, or `Ok(None)` for a
/// keep-alive.
///
/// # Errors
///
/// [`ProtocolError::InvalidType`] for a bad type word and
/// [`ProtocolError::DatagramLength`] when the timestamp trailer is missing or
/// the datagram carries extra bytes.
pub fn decode_datagram(
    datagram: &[u8],
) -> Result<Option<(PacketType, Vec<u8>, u64)>, ProtocolError> {
    let packet_type = decode_type(read_u32(datagram, 0)?)?;
    let expected = TYPE_WORD_SIZE + packet_type.payload_size() + TIMESTAMP_SIZE;
    if datagram.len() != expected {
        return Err(ProtocolError::DatagramLength {
            expected,
            actual: datagram.len(),
        });
    }
    let timestamp = read_u64(datagram, expected - TIMESTAMP_SIZE)?;
    Ok(decode_type_and_payload(datagram)?.map(|(t, payload)| (t, payload, timestamp)))
}

/// Encodes and frames a whole [`Message`].
///
/// # Errors
///
/// Never fails for messages built from this module's types; the `Result`
/// mirrors [`frame_for_transport`].
pub fn encode_message(msg: &Message, timestamp_us: u64) -> Result<Vec<u8>, ProtocolError> {
    frame_for_transport(msg.packet_type(), &encode_payload(msg), timestamp_us)
}

/// Microseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ── Payload encoding ──────────────────────────────────────────────────────────

/// Encodes the fixed-size payload of `msg` (no type word).
pub fn encode_payload(msg: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(msg.packet_type().payload_size());
    match msg {
        Message::ConnectAccept(m) => {
            put_u32(&mut buf, m.connect_code as u32);
            put_u32(&mut buf, m.player_id);
            put_u32(&mut buf, m.team as u32);
            put_fixed_str(&mut buf, &m.name, NAME_LEN);
        }
        Message::GameStatus(m) => {
            put_u32(&mut buf, m.game_state as u32);
            for p in &m.players {
                buf.push(p.valid as u8);
                buf.push(p.team as u8);
                buf.push(p.character);
                buf.push(p.ready as u8);
            }
        }
        Message::Chat(m) => {
            put_u32(&mut buf, m.sender);
            put_fixed_str(&mut buf, &m.text, CHAT_LEN);
        }
        Message::ClientLobby(m) => {
            put_u32(&mut buf, m.player_id);
            put_u32(&mut buf, m.team as u32);
            put_u32(&mut buf, m.character);
            put_u32(&mut buf, m.ready as u32);
        }
        Message::ObjectiveLocation(m) => buf.extend_from_slice(&m.statuses),
        Message::ObjectiveStatus(m) => {
            put_u32(&mut buf, m.game_state as u32);
            buf.extend_from_slice(&m.statuses);
        }
        Message::PositionUpdateRequest(m) => {
            put_u32(&mut buf, m.player_id);
            put_u32(&mut buf, m.floor);
            put_motion(&mut buf, &m.motion);
        }
        Message::AllPositionUpdate(m) => {
            put_u32(&mut buf, m.floor);
            put_u32(&mut buf, m.on_floor_mask);
            for motion in &m.players {
                put_motion(&mut buf, motion);
            }
        }
        Message::FloorMoveRequest(m) => {
            put_u32(&mut buf, m.player_id);
            put_u32(&mut buf, m.current_floor);
            put_u32(&mut buf, m.target_floor);
        }
        Message::FloorMove(m) => {
            put_u32(&mut buf, m.new_floor);
            put_f32(&mut buf, m.x);
            put_f32(&mut buf, m.y);
        }
        Message::Tagging(m) => {
            put_u32(&mut buf, m.tagger_id);
            put_u32(&mut buf, m.objective_id);
        }
        Message::KeepAlive => {}
    }
    buf
}

// ── Payload decoding ──────────────────────────────────────────────────────────

/// Decodes a fixed-size payload into its typed [`Message`].
///
/// # Errors
///
/// [`ProtocolError::InsufficientData`] if `payload` is shorter than the
/// type's size; [`ProtocolError::MalformedPayload`] if an enumerated field
/// is out of range or a string is not UTF-8.
pub fn decode_payload(packet_type: PacketType, payload: &[u8]) -> Result<Message, ProtocolError> {
    require_len(payload, packet_type.payload_size())?;
    let p = payload;
    let msg = match packet_type {
        PacketType::ConnectAccept => Message::ConnectAccept(ConnectAcceptMessage {
            connect_code: enum_field(read_u32(p, 0)?, "connect code", ConnectCode::try_from)?,
            player_id: read_u32(p, 4)?,
            team: enum_field(read_u32(p, 8)?, "team", Team::try_from)?,
            name: read_fixed_str(&p[12..12 + NAME_LEN])?,
        }),
        PacketType::GameStatus => {
            let mut players = [PlayerStatus::default(); MAX_PLAYERS];
            for (i, slot) in players.iter_mut().enumerate() {
                let at = 4 + 4 * i;
                *slot = PlayerStatus {
                    valid: p[at] != 0,
                    team: enum_field(u32::from(p[at + 1]), "team", Team::try_from)?,
                    character: p[at + 2],
                    ready: p[at + 3] != 0,
                };
            }
            Message::GameStatus(GameStatusMessage {
                game_state: enum_field(read_u32(p, 0)?, "game state", GameState::try_from)?,
                players,
            })
        }
        PacketType::ChatSend => Message::Chat(ChatMessage {
            sender: read_u32(p, 0)?,
            text: read_fixed_str(&p[4..4 + CHAT_LEN])?,
        }),
        PacketType::ClientLobby => Message::ClientLobby(ClientLobbyMessage {
            player_id: read_u32(p, 0)?,
            team: enum_field(read_u32(p, 4)?, "team", Team::try_from)?,
            character: read_u32(p, 8)?,
            ready: read_u32(p, 12)? != 0,
        }),
        PacketType::ObjectiveLocation => Message::ObjectiveLocation(ObjectiveLocationMessage {
            statuses: read_statuses(&p[..MAX_OBJECTIVES]),
        }),
        PacketType::ObjectiveStatus => Message::ObjectiveStatus(ObjectiveStatusMessage {
            game_state: enum_field(read_u32(p, 0)?, "game state", GameState::try_from)?,
            statuses: read_statuses(&p[4..4 + MAX_OBJECTIVES]),
        }),
        PacketType::PositionUpdateRequest => {
            Message::PositionUpdateRequest(PositionUpdateRequestMessage {
                player_id: read_u32(p, 0)?,
                floor: read_u32(p, 4)?,
                motion: read_motion(p, 8)?,
            })
        }
        PacketType::AllPositionUpdate => {
            let mut players = [PlayerMotion::default(); MAX_PLAYERS];
            for (i, motion) in players.iter_mut().enumerate() {
                *motion = read_motion(p, 8 + 16 * i)?;
            }
            Message::AllPositionUpdate(AllPositionUpdateMessage {
                floor: read_u32(p, 0)?,
                on_floor_mask: read_u32(p, 4)?,
                players,
            })
        }
        PacketType::FloorMoveRequest => Message::FloorMoveRequest(FloorMoveRequestMessage {
            player_id: read_u32(p, 0)?,
            current_floor: read_u32(p, 4)?,
            target_floor: read_u32(p, 8)?,
        }),
        PacketType::FloorMove => Message::FloorMove(FloorMoveMessage {
            new_floor: read_u32(p, 0)?,
            x: read_f32(p, 4)?,
            y: read_f32(p, 8)?,
        }),
        PacketType::Tagging => Message::Tagging(TaggingMessage {
            tagger_id: read_u32(p, 0)?,
            objective_id: read_u32(p, 4)?,
        }),
        PacketType::KeepAlive => Message::KeepAlive,
    };
    Ok(msg)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn copy_payload(bytes: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut payload = Vec::new();
    payload
        .try_reserve_exact(bytes.len())
        .map_err(|_| ProtocolError::OutOfMemory(bytes.len()))?;
    payload.extend_from_slice(bytes);
    Ok(payload)
}

fn require_len(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn enum_field<T>(
    value: u32,
    what: &str,
    convert: impl FnOnce(u32) -> Result<T, ()>,
) -> Result<T, ProtocolError> {
    convert(value).map_err(|_| ProtocolError::MalformedPayload(format!("unknown {what}: {value}")))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    require_len(buf, offset + 4)?;
    Ok(u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    require_len(buf, offset + 8)?;
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_be_bytes(word))
}

fn read_f32(buf: &[u8], offset: usize) -> Result<f32, ProtocolError> {
    read_u32(buf, offset).map(f32::from_bits)
}

fn read_motion(buf: &[u8], offset: usize) -> Result<PlayerMotion, ProtocolError> {
    Ok(PlayerMotion {
        x: read_f32(buf, offset)?,
        y: read_f32(buf, offset + 4)?,
        vx: read_f32(buf, offset + 8)?,
        vy: read_f32(buf, offset + 12)?,
    })
}

fn read_statuses(buf: &[u8]) -> [u8; MAX_OBJECTIVES] {
    let mut statuses = [0u8; MAX_OBJECTIVES];
    statuses.copy_from_slice(buf);
    statuses
}

/// Reads a NUL-padded UTF-8 field.
fn read_fixed_str(field: &[u8]) -> Result<String, ProtocolError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_string)
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn put_f32(buf: &mut Vec<u8>, value: f32) {
    put_u32(buf, value.to_bits());
}

fn put_motion(buf: &mut Vec<u8>, m: &PlayerMotion) {
    put_f32(buf, m.x);
    put_f32(buf, m.y);
    put_f32(buf, m.vx);
    put_f32(buf, m.vy);
}

/// Writes `s` truncated to `len` bytes on a char boundary, NUL-padded.
fn put_fixed_str(buf: &mut Vec<u8>, s: &str, len: usize) {
    let mut cut = s.len().min(len);
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    buf.extend_from_slice(&s.as_bytes()[..cut]);
    buf.resize(buf.len() + (len - cut), 0);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{MAX_DATAGRAM_SIZE, PAYLOAD_SIZES};

    fn round_trip(msg: &Message) -> Message {
        let payload = encode_payload(msg);
        assert_eq!(payload.len(), msg.packet_type().payload_size());
        decode_payload(msg.packet_type(), &payload).expect("decode failed")
    }

    #[test]
    fn test_connect_accept_round_trip_keeps_name() {
        let msg = Message::ConnectAccept(ConnectAcceptMessage {
            connect_code: ConnectCode::Accepted,
            player_id: 5,
            team: Team::B,
            name: "runner".to_string(),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_long_name_is_truncated_on_char_boundary() {
        // 15 ASCII bytes + a 2-byte char straddling the 16-byte limit.
        let name = format!("{}é", "a".repeat(15));
        let msg = Message::ConnectAccept(ConnectAcceptMessage {
            connect_code: ConnectCode::Requested,
            player_id: 0,
            team: Team::None,
            name,
        });
        let Message::ConnectAccept(decoded) = round_trip(&msg) else {
            panic!("wrong variant");
        };
        assert_eq!(decoded.name, "a".repeat(15));
    }

    #[test]
    fn test_game_status_round_trip() {
        let mut players = [PlayerStatus::default(); MAX_PLAYERS];
        players[3] = PlayerStatus {
            valid: true,
            team: Team::A,
            character: 2,
            ready: true,
        };
        let msg = Message::GameStatus(GameStatusMessage {
            game_state: GameState::Running,
            players,
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_all_position_update_round_trip_preserves_floats() {
        let mut players = [PlayerMotion::default(); MAX_PLAYERS];
        players[1] = PlayerMotion {
            x: -12.5,
            y: 300.25,
            vx: 1.0,
            vy: -0.5,
        };
        let msg = Message::AllPositionUpdate(AllPositionUpdateMessage {
            floor: 2,
            on_floor_mask: 0b10,
            players,
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_unknown_team_in_payload_is_corruption() {
        let mut payload = vec![0u8; PacketType::ClientLobby.payload_size()];
        payload[7] = 9; // team field low byte
        let err = decode_payload(PacketType::ClientLobby, &payload).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload(_)));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_decode_rejects_type_zero() {
        let raw = [0u8; 8];
        assert_eq!(decode_type_and_payload(&raw), Err(ProtocolError::InvalidType(0)));
    }

    #[test]
    fn test_decode_rejects_type_above_range() {
        let raw = (NUM_TYPES + 1).to_be_bytes();
        assert_eq!(
            decode_type_and_payload(&raw),
            Err(ProtocolError::InvalidType(NUM_TYPES + 1))
        );
    }

    #[test]
    fn test_keep_alive_is_dropped_silently() {
        let frame = frame_for_transport(PacketType::KeepAlive, &[], 0).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(decode_type_and_payload(&frame), Ok(None));
    }

    #[test]
    fn test_decode_ignores_bytes_past_the_payload() {
        // Arrange – a Tagging frame followed by trailing junk
        let mut raw = frame_for_transport(PacketType::Tagging, &[1; 8], 0).unwrap();
        raw.extend_from_slice(&[0xEE; 20]);

        // Act
        let (_, payload) = decode_type_and_payload(&raw).unwrap().unwrap();

        // Assert
        assert_eq!(payload, vec![1; 8]);
    }

    #[test]
    fn test_truncated_frame_reports_insufficient_data() {
        let raw = frame_for_transport(PacketType::ChatSend, &[0; 132], 0).unwrap();
        let err = decode_type_and_payload(&raw[..50]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InsufficientData {
                needed: 136,
                available: 50
            }
        );
    }

    #[test]
    fn test_reliable_frame_has_no_timestamp() {
        let frame = frame_for_transport(PacketType::ObjectiveLocation, &[1; 32], 99).unwrap();
        assert_eq!(frame.len(), 4 + 32);
    }

    #[test]
    fn test_unreliable_frame_carries_timestamp_trailer() {
        let frame = frame_for_transport(PacketType::FloorMove, &[0; 12], 0xABCD).unwrap();
        assert_eq!(frame.len(), 4 + 12 + 8);
        let (t, payload, ts) = decode_datagram(&frame).unwrap().unwrap();
        assert_eq!(t, PacketType::FloorMove);
        assert_eq!(payload, vec![0; 12]);
        assert_eq!(ts, 0xABCD);
    }

    #[test]
    fn test_datagram_without_trailer_is_rejected() {
        let frame = frame_for_transport(PacketType::FloorMove, &[0; 12], 1).unwrap();
        let err = decode_datagram(&frame[..16]).unwrap_err();
        assert_eq!(err, ProtocolError::DatagramLength { expected: 24, actual: 16 });
    }

    #[test]
    fn test_frame_rejects_wrong_payload_length() {
        assert!(frame_for_transport(PacketType::Tagging, &[0; 7], 0).is_err());
        assert!(frame_for_transport(PacketType::Tagging, &[0; 9], 0).is_err());
    }

    #[test]
    fn test_stream_frame_len_waits_for_complete_frame() {
        let frame = frame_for_transport(PacketType::ClientLobby, &[0; 16], 0).unwrap();
        assert_eq!(stream_frame_len(&frame[..3]), Ok(None));
        assert_eq!(stream_frame_len(&frame[..10]), Ok(None));
        assert_eq!(stream_frame_len(&frame), Ok(Some(20)));
    }

    #[test]
    fn test_stream_frame_len_flags_bad_type_immediately() {
        let raw = 77u32.to_be_bytes();
        assert_eq!(stream_frame_len(&raw), Err(ProtocolError::InvalidType(77)));
    }

    #[test]
    fn test_max_datagram_covers_every_unreliable_type() {
        for t in PacketType::ALL {
            let size = PAYLOAD_SIZES[t.as_u32() as usize - 1];
            assert!(TYPE_WORD_SIZE + size + TIMESTAMP_SIZE <= MAX_DATAGRAM_SIZE);
        }
    }

    #[test]
    fn test_now_us_is_positive() {
        assert!(now_us() > 0);
    }
}
