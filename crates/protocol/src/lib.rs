//! Shared protocol crate for Chatter.
//!
//! This crate contains:
//! - Server -> client world messages and the client handshake
//! - The `Codec` trait and its JSON implementation
//! - Shared wire types (entity ids, raw diffs)

mod codec;
mod error;
pub mod packets;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use packets::{EntityRecord, Face, ServerMessage};

/// Server-assigned entity identifier.
pub type EntityId = String;

/// Raw partial entity state: field name -> wire value.
///
/// Never required to contain every field of the entity's schema.
pub type Diff = serde_json::Map<String, serde_json::Value>;

/// Key carrying the wire type of an entity inside a record or a creating diff.
pub const TYPE_KEY: &str = "type";
