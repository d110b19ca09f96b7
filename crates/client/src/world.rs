//! The client-side world: routes server messages to entities and runs the
//! per-frame lifecycle.
//!
//! Messages are queued with their arrival time and applied at the start of
//! the next frame. A frame then runs, in order: start for new entities, tick,
//! draw, and die for entities the server removed.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use protocol::{Diff, EntityId, EntityRecord, ServerMessage};
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::config::EngineConfig;
use crate::entity::{Entity, Lifecycle};
use crate::registry::KindRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    /// No world opened yet.
    Waiting,
    Open,
    Closed,
    /// Transport gone; entities hold their last displayed state.
    Disconnected,
}

/// What one message did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub rejected: usize,
}

impl UpdateSummary {
    fn absorb(&mut self, other: UpdateSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.removed += other.removed;
        self.rejected += other.rejected;
    }
}

/// What one frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub messages: UpdateSummary,
    pub started: usize,
    pub ticked: usize,
    pub drawn: usize,
    /// Entities dropped after die dispatch or teardown.
    pub dropped: usize,
}

pub struct World {
    registry: KindRegistry,
    config: EngineConfig,
    entities: HashMap<EntityId, Entity>,
    /// Creation order; drives tick and draw order.
    order: Vec<EntityId>,
    /// Removed by the server, waiting for die or tearing down.
    departed: Vec<Entity>,
    inbox: VecDeque<(ServerMessage, f64)>,
    state: WorldState,
    frames: u64,
    /// Collapse buffers once the next frame has drained the inbox.
    resync: bool,
}

impl World {
    pub fn new(registry: KindRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            entities: HashMap::new(),
            order: Vec::new(),
            departed: Vec::new(),
            inbox: VecDeque::new(),
            state: WorldState::Waiting,
            frames: 0,
            resync: false,
        }
    }

    #[inline]
    pub fn state(&self) -> WorldState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn local_id(&self) -> Option<&str> {
        self.registry.local_id()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entity ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Entities removed by the server but not dropped yet.
    pub fn departed(&self) -> &[Entity] {
        &self.departed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pending_messages(&self) -> usize {
        self.inbox.len()
    }

    /// Queue a message for the next frame.
    pub fn enqueue(&mut self, message: ServerMessage, arrival: f64) {
        self.inbox.push_back((message, arrival));
    }

    /// Apply a message right away.
    pub fn receive(&mut self, message: ServerMessage, arrival: f64) -> UpdateSummary {
        match message {
            ServerMessage::OpenWorld { self_id, entities } => self.open(self_id, entities, arrival),
            ServerMessage::UpdateWorld { entities } => {
                if self.state != WorldState::Open {
                    warn!("Ignoring world update while {:?}", self.state);
                    return UpdateSummary::default();
                }
                self.update(entities, arrival)
            }
            ServerMessage::CloseWorld => {
                let removed = self.kill_all();
                self.registry.set_local_id(None);
                self.state = WorldState::Closed;
                info!("World closed, {} entities removed", removed);
                UpdateSummary {
                    removed,
                    ..Default::default()
                }
            }
        }
    }

    fn open(
        &mut self,
        self_id: Option<EntityId>,
        records: BTreeMap<EntityId, EntityRecord>,
        arrival: f64,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary {
            removed: self.kill_all(),
            ..Default::default()
        };
        self.registry.set_local_id(self_id);
        self.state = WorldState::Open;

        for (id, record) in records {
            let mut data = record.fields;
            data.insert(protocol::TYPE_KEY.to_string(), record.type_id.clone().into());
            if self.spawn(&record.type_id, id, &data, arrival) {
                summary.created += 1;
            } else {
                summary.rejected += 1;
            }
        }

        info!(
            "World opened at {:.0}ms with {} entities (local: {:?})",
            arrival,
            summary.created,
            self.registry.local_id()
        );
        summary
    }

    fn update(
        &mut self,
        entries: BTreeMap<EntityId, Option<Diff>>,
        arrival: f64,
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        let gone: Vec<EntityId> = self
            .order
            .iter()
            .filter(|id| !entries.contains_key(id.as_str()))
            .cloned()
            .collect();
        summary.removed = self.remove(&gone);

        for (id, entry) in entries {
            let Some(diff) = entry else {
                if !self.entities.contains_key(&id) {
                    warn!("Unchanged marker for unknown entity {}", id);
                    summary.rejected += 1;
                }
                continue;
            };

            if let Some(entity) = self.entities.get_mut(&id) {
                match entity.apply_diff(&diff, arrival) {
                    Ok(()) => summary.updated += 1,
                    Err(e) => {
                        warn!("Rejected diff for {}: {}", id, e);
                        summary.rejected += 1;
                    }
                }
                continue;
            }

            let Some(type_id) = diff.get(protocol::TYPE_KEY).and_then(|v| v.as_str()) else {
                warn!("Diff for unknown entity {} has no type", id);
                summary.rejected += 1;
                continue;
            };
            let type_id = type_id.to_string();
            if self.spawn(&type_id, id, &diff, arrival) {
                summary.created += 1;
            } else {
                summary.rejected += 1;
            }
        }

        summary
    }

    fn spawn(&mut self, type_id: &str, id: EntityId, data: &Diff, arrival: f64) -> bool {
        match self
            .registry
            .create(type_id, id.clone(), data, arrival, self.config.playback)
        {
            Ok(entity) => {
                self.order.push(id.clone());
                self.entities.insert(id, entity);
                true
            }
            Err(e) => {
                warn!("Failed to create entity {}: {}", id, e);
                false
            }
        }
    }

    fn remove(&mut self, ids: &[EntityId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.order.retain(|id| !doomed.contains(id.as_str()));

        let mut removed = 0;
        for id in ids {
            if let Some(mut entity) = self.entities.remove(id) {
                debug!("Removing entity {} ({})", id, entity.state().type_id());
                entity.doom();
                self.departed.push(entity);
                removed += 1;
            }
        }
        removed
    }

    fn kill_all(&mut self) -> usize {
        let ids = std::mem::take(&mut self.order);
        let removed = ids.len();
        for id in ids {
            if let Some(mut entity) = self.entities.remove(&id) {
                entity.doom();
                self.departed.push(entity);
            }
        }
        removed
    }

    /// Run one frame.
    ///
    /// `dt` is the elapsed wall-clock time in seconds, `now` the current
    /// arrival time in ms.
    pub fn frame(&mut self, dt: f64, now: f64, canvas: &mut dyn Canvas) -> FrameSummary {
        let dt = dt.max(0.0);
        let mut summary = FrameSummary::default();
        self.frames += 1;

        while let Some((message, arrival)) = self.inbox.pop_front() {
            let applied = self.receive(message, arrival);
            summary.messages.absorb(applied);
        }
        if std::mem::take(&mut self.resync) {
            self.skip_interpolation();
        }

        for id in &self.order {
            if let Some(entity) = self.entities.get_mut(id) {
                if entity.state().lifecycle() == Lifecycle::Pending {
                    entity.start();
                    summary.started += 1;
                }
            }
        }

        for id in &self.order {
            if let Some(entity) = self.entities.get_mut(id) {
                summary.ticked += usize::from(entity.tick(dt, now));
            }
        }
        for entity in &mut self.departed {
            summary.ticked += usize::from(entity.tick(dt, now));
        }

        for id in &self.order {
            if let Some(entity) = self.entities.get(id) {
                summary.drawn += usize::from(entity.draw(canvas));
            }
        }
        for entity in &self.departed {
            summary.drawn += usize::from(entity.draw(canvas));
        }

        let lifecycle = self.config.lifecycle;
        let before = self.departed.len();
        self.departed.retain_mut(|entity| !entity.settle(now, &lifecycle));
        summary.dropped = before - self.departed.len();

        summary
    }

    /// Skip interpolation on the next frame, after its queued messages are
    /// applied. Used after a render stall.
    pub fn request_resync(&mut self) {
        self.resync = true;
    }

    /// Collapse every entity's buffer to its newest snapshot.
    pub fn skip_interpolation(&mut self) {
        for entity in self.entities.values_mut() {
            entity.state_mut().skip_interpolation();
        }
    }

    /// The transport closed. Entities stay at their last displayed state.
    pub fn transport_lost(&mut self) {
        if self.state != WorldState::Disconnected {
            warn!("Connection lost, freezing {} entities", self.entities.len());
            self.state = WorldState::Disconnected;
        }
    }
}
