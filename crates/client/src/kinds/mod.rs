//! Entity kinds of the chatter world.

mod ant;
mod props;

pub use ant::{ANT_SCHEMA, AntBehavior, LOCAL_ANT, REMOTE_ANT};
pub use props::{BOX, PLANT, PROP_SCHEMA, TERRBLOCK, TERRBLOCK_SCHEMA, WORD};

use tracing::warn;

use crate::registry::{EntityKind, KindRegistry};

/// Kinds the server may send, by wire type id. Variants reached through
/// selection (the local ant) are not listed.
pub static DEFAULT_KINDS: [&EntityKind; 5] = [&REMOTE_ANT, &BOX, &PLANT, &WORD, &TERRBLOCK];

pub fn register_defaults(registry: &mut KindRegistry) {
    for kind in DEFAULT_KINDS.iter().copied() {
        if let Err(e) = registry.register(kind) {
            warn!("Skipping kind '{}': {}", kind.type_id, e);
        }
    }
}
