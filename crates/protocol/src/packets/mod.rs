//! Message definitions for the Chatter protocol.
//!
//! This module contains both client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Wire names of the JSON message types, carried in the `_type` key.
pub mod names {
    pub const OPEN_WORLD: &str = "S_OpenWorld";
    pub const UPDATE_WORLD: &str = "S_UpdateWorld";
    pub const CLOSE_WORLD: &str = "S_CloseWorld";
}
