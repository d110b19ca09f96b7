//! Pluggable wire codecs.
//!
//! The client only ever sees `ServerMessage`s; how they are laid out on the
//! wire is decided by the `Codec` in use.

use crate::{ProtocolError, ServerMessage};

/// Encodes and decodes server messages for one wire format.
pub trait Codec {
    /// Decode a single received frame.
    fn decode(&self, frame: &[u8]) -> Result<ServerMessage, ProtocolError>;

    /// Encode a message into a frame.
    fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>, ProtocolError>;
}

/// JSON objects tagged with a `_type` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, frame: &[u8]) -> Result<ServerMessage, ProtocolError> {
        if frame.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::EmptyFrame);
        }
        Ok(serde_json::from_slice(frame)?)
    }

    fn encode(&self, message: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(message)?)
    }
}
