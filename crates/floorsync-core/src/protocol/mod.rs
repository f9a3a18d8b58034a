//! Protocol module: packet catalogue, typed payloads, codec, and arrival stamps.

pub mod codec;
pub mod messages;
pub mod sequence;
pub mod types;

pub use codec::{
    decode_datagram, decode_payload, decode_type, decode_type_and_payload, encode_message,
    encode_payload, frame_for_transport, frame_for_transport_now, stream_frame_len,
    ProtocolError,
};
pub use messages::*;
pub use sequence::{Arrival, SequenceCounter};
pub use types::*;
