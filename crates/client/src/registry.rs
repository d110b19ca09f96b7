//! Entity kinds and the wire-type registry.

use std::collections::HashMap;

use protocol::{Diff, EntityId};
use tracing::debug;

use crate::config::PlaybackConfig;
use crate::entity::{Behavior, Entity, EntityState};
use crate::error::EngineError;
use crate::field::Schema;

/// What the registry knows when resolving a kind to a variant.
#[derive(Debug, Clone, Copy)]
pub struct SelectContext<'a> {
    /// Id of the entity representing this client, if the server named one.
    pub local_id: Option<&'a str>,
    pub id: &'a str,
    pub data: &'a Diff,
}

/// Static description of one entity kind.
pub struct EntityKind {
    /// Wire type id.
    pub type_id: &'static str,
    pub schema: &'static Schema,
    /// Whether this variant interpolates its lerp-tracked fields.
    pub interpolate: bool,
    pub behavior: fn() -> Box<dyn Behavior>,
    /// Picks the variant to construct, e.g. local vs remote.
    pub select: Option<fn(&SelectContext<'_>) -> &'static EntityKind>,
}

impl EntityKind {
    /// Interpolation runs only when the schema has lerp fields and the
    /// variant allows it.
    pub fn interpolates(&self) -> bool {
        self.interpolate && self.schema.has_lerps()
    }
}

impl std::fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityKind")
            .field("type_id", &self.type_id)
            .field("interpolate", &self.interpolate)
            .finish_non_exhaustive()
    }
}

/// Maps wire type ids to kinds.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: HashMap<&'static str, &'static EntityKind>,
    local_id: Option<EntityId>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kind of the world.
    pub fn with_default_kinds() -> Self {
        let mut registry = Self::new();
        crate::kinds::register_defaults(&mut registry);
        registry
    }

    pub fn register(&mut self, kind: &'static EntityKind) -> Result<&mut Self, EngineError> {
        if kind.type_id.is_empty() {
            return Err(EngineError::EmptyTypeId);
        }
        if self.kinds.contains_key(kind.type_id) {
            return Err(EngineError::DuplicateType(kind.type_id));
        }
        self.kinds.insert(kind.type_id, kind);
        Ok(self)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.kinds.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn set_local_id(&mut self, id: Option<EntityId>) {
        self.local_id = id;
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Kind to construct for `type_id`, after variant selection.
    pub fn resolve(&self, type_id: &str, id: &str, data: &Diff) -> Result<&'static EntityKind, EngineError> {
        let kind = *self
            .kinds
            .get(type_id)
            .ok_or_else(|| EngineError::UnknownType(type_id.to_string()))?;

        Ok(match kind.select {
            Some(select) => select(&SelectContext {
                local_id: self.local_id(),
                id,
                data,
            }),
            None => kind,
        })
    }

    pub fn create(
        &self,
        type_id: &str,
        id: EntityId,
        data: &Diff,
        arrival: f64,
        tuning: PlaybackConfig,
    ) -> Result<Entity, EngineError> {
        let kind = self.resolve(type_id, &id, data)?;
        let state = EntityState::new(id, kind, data, arrival, tuning)?;
        debug!(
            "Created entity {} as '{}' (interpolated: {})",
            state.id(),
            kind.type_id,
            kind.interpolates()
        );
        Ok(Entity::new(state, (kind.behavior)()))
    }
}
