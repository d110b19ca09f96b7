//! Client -> Server messages.

use crate::ProtocolError;

/// Number of characters a face must have.
pub const FACE_LEN: usize = 5;

/// The player's face, sent verbatim as the first frame of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face(String);

impl Face {
    /// Validate a face. Length is counted in characters, not bytes.
    pub fn new(face: impl Into<String>) -> Result<Self, ProtocolError> {
        let face = face.into();
        let actual = face.chars().count();
        if actual != FACE_LEN {
            return Err(ProtocolError::InvalidFace {
                expected: FACE_LEN,
                actual,
            });
        }
        Ok(Self(face))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Handshake frame payload (UTF-8 text).
    pub fn to_frame(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
