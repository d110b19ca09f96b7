//! Server -> Client messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Diff, EntityId};

/// Full state of one entity inside `S_OpenWorld`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Wire type identifier (`"ant"`, `"box"`, ...).
    #[serde(rename = "type")]
    pub type_id: String,
    /// Every other key of the record.
    #[serde(flatten)]
    pub fields: Diff,
}

/// Parsed server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum ServerMessage {
    /// Full world state. Replaces every entity the client currently holds.
    #[serde(rename = "S_OpenWorld")]
    OpenWorld {
        /// Entity the client views the world from, if it has one.
        #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
        self_id: Option<EntityId>,
        entities: BTreeMap<EntityId, EntityRecord>,
    },

    /// Incremental update.
    ///
    /// `Some(diff)` changes an entity (or creates it when the diff carries a
    /// `type`), `None` keeps it unchanged, and an id missing from the map
    /// removes the entity.
    #[serde(rename = "S_UpdateWorld")]
    UpdateWorld {
        entities: BTreeMap<EntityId, Option<Diff>>,
    },

    /// The world is being torn down.
    #[serde(rename = "S_CloseWorld")]
    CloseWorld,
}

impl ServerMessage {
    /// Wire name of this message.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::OpenWorld { .. } => super::names::OPEN_WORLD,
            ServerMessage::UpdateWorld { .. } => super::names::UPDATE_WORLD,
            ServerMessage::CloseWorld => super::names::CLOSE_WORLD,
        }
    }
}
