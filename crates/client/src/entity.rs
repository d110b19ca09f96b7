//! Networked entities.
//!
//! An [`Entity`] pairs the engine-owned [`EntityState`] (fields, snapshot
//! buffer, playback clock, lifecycle) with a kind-specific [`Behavior`] that
//! reacts to start, tick, draw and die.

use glam::Vec2;
use protocol::{Diff, EntityId};
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::clock::{ClockState, PlaybackClock};
use crate::config::{LifecycleConfig, PlaybackConfig};
use crate::diff;
use crate::error::EngineError;
use crate::field::{FieldValue, Fields};
use crate::registry::EntityKind;
use crate::snapshot::SnapshotBuffer;

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    /// Created, start not yet dispatched.
    Pending,
    Alive,
    /// Removed by the server; die not yet dispatched.
    Doomed,
    /// Die was vetoed; playing a teardown since `since_ms`.
    Dying { since_ms: f64 },
    /// Ready to be dropped.
    Dead,
}

/// Snapshot buffer and playback clock of an interpolating entity.
#[derive(Debug)]
pub struct Interpolation {
    pub buffer: SnapshotBuffer,
    pub clock: PlaybackClock,
}

/// Engine-owned state of one entity.
#[derive(Debug)]
pub struct EntityState {
    id: EntityId,
    kind: &'static EntityKind,
    fields: Fields,
    interpolation: Option<Interpolation>,
    lifecycle: Lifecycle,
    disabled: bool,
}

impl EntityState {
    /// Build from the entity's full initial data, which arrived at
    /// `arrival` (ms).
    ///
    /// Interpolating kinds seed their buffer from `data`, which must hold
    /// every lerp-tracked field. Other kinds apply `data` directly.
    pub fn new(
        id: EntityId,
        kind: &'static EntityKind,
        data: &Diff,
        arrival: f64,
        tuning: PlaybackConfig,
    ) -> Result<Self, EngineError> {
        let decoded = diff::decode(kind.schema, kind.type_id, data)?;
        let mut fields = Fields::new();

        let interpolation = if kind.interpolates() {
            let buffer = SnapshotBuffer::seed(kind.schema, kind.type_id, decoded, arrival, &mut fields)?;
            Some(Interpolation {
                buffer,
                clock: PlaybackClock::new(tuning),
            })
        } else {
            diff::apply_direct(&mut fields, decoded);
            None
        };

        Ok(Self {
            id,
            kind,
            fields,
            interpolation,
            lifecycle: Lifecycle::Pending,
            disabled: false,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> &'static EntityKind {
        self.kind
    }

    #[inline]
    pub fn type_id(&self) -> &'static str {
        self.kind.type_id
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// A disabled entity is neither ticked nor drawn but still takes diffs.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn interpolation(&self) -> Option<&Interpolation> {
        self.interpolation.as_ref()
    }

    /// Directly applied fields. Lerp-tracked fields of interpolating
    /// entities live in the buffer instead; read them through [`value`].
    ///
    /// [`value`]: EntityState::value
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Current value of a field.
    ///
    /// Lerp-tracked fields of interpolating entities return the value at the
    /// current playback fraction; everything else the last applied value.
    pub fn value(&self, name: &str) -> Result<FieldValue, EngineError> {
        let spec = self
            .kind
            .schema
            .get(name)
            .ok_or_else(|| EngineError::UnknownField(name.to_string()))?;

        match &self.interpolation {
            Some(interp) if spec.is_lerped() => {
                return interp.buffer.value_at(spec.name, interp.clock.fraction());
            }
            _ => {}
        }

        self.fields
            .get(spec.name)
            .cloned()
            .ok_or(EngineError::UnsetField(spec.name))
    }

    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        self.value(name).ok()?.as_vec2()
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.value(name).ok()?.as_f32()
    }

    /// Text of an immediate field, borrowed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.as_text()
    }

    /// Merge a raw partial update that arrived at `arrival` (ms).
    pub fn apply_diff(&mut self, raw: &Diff, arrival: f64) -> Result<(), EngineError> {
        let decoded = diff::decode(self.kind.schema, self.kind.type_id, raw)?;
        match &mut self.interpolation {
            Some(interp) => interp.buffer.append(decoded, arrival, &mut self.fields),
            None => diff::apply_direct(&mut self.fields, decoded),
        }
        Ok(())
    }

    pub fn clock_state(&self) -> Option<ClockState> {
        self.interpolation
            .as_ref()
            .map(|interp| interp.clock.state(&interp.buffer))
    }

    pub fn displayed_time(&self) -> Option<f64> {
        self.interpolation.as_ref()?.clock.displayed_time()
    }

    pub fn fraction(&self) -> f32 {
        self.interpolation.as_ref().map_or(0.0, |interp| interp.clock.fraction())
    }

    pub fn buffered_snapshots(&self) -> usize {
        self.interpolation.as_ref().map_or(0, |interp| interp.buffer.len())
    }

    /// Collapse the buffer to its newest snapshot.
    pub fn skip_interpolation(&mut self) {
        if let Some(Interpolation { buffer, clock }) = &mut self.interpolation {
            let newest = buffer.skip_to_newest(&mut self.fields);
            clock.jump_to(newest);
        }
    }

    /// Returns true when this call moved the entity out of `Pending`.
    fn start(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Pending {
            return false;
        }
        if let Some(Interpolation { buffer, clock }) = &mut self.interpolation {
            clock.start(buffer);
        }
        self.lifecycle = Lifecycle::Alive;
        true
    }

    fn advance_clock(&mut self, dt: f64, now: f64) {
        if let Some(Interpolation { buffer, clock }) = &mut self.interpolation {
            clock.tick(buffer, &mut self.fields, dt, now);
        }
    }
}

/// Kind-specific reactions to lifecycle events. Every hook is optional.
pub trait Behavior: Send {
    fn on_start(&mut self, _state: &EntityState) {}

    /// Called after the entity's clock advanced. `dt` in seconds.
    fn on_tick(&mut self, _state: &EntityState, _dt: f64) {}

    fn on_draw(&self, _state: &EntityState, _canvas: &mut dyn Canvas) {}

    /// Called once when the entity is removed. Returning true vetoes the
    /// removal so a teardown can play; the entity is kept until
    /// [`teardown_finished`](Behavior::teardown_finished) or the grace
    /// period runs out.
    fn on_die(&mut self, _state: &EntityState) -> bool {
        false
    }

    fn teardown_finished(&self, _state: &EntityState) -> bool {
        true
    }
}

/// Behavior with no reactions.
#[derive(Debug, Default)]
pub struct Inert;

impl Behavior for Inert {}

pub struct Entity {
    state: EntityState,
    behavior: Box<dyn Behavior>,
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity").field("state", &self.state).finish_non_exhaustive()
    }
}

impl Entity {
    pub fn new(state: EntityState, behavior: Box<dyn Behavior>) -> Self {
        Self { state, behavior }
    }

    #[inline]
    pub fn id(&self) -> &str {
        self.state.id()
    }

    #[inline]
    pub fn state(&self) -> &EntityState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut EntityState {
        &mut self.state
    }

    pub fn apply_diff(&mut self, raw: &Diff, arrival: f64) -> Result<(), EngineError> {
        self.state.apply_diff(raw, arrival)
    }

    /// Dispatch start if it has not run yet.
    pub fn start(&mut self) {
        if self.state.start() {
            self.behavior.on_start(&self.state);
        }
    }

    /// Advance playback and run the tick hook. Returns whether it ran.
    pub fn tick(&mut self, dt: f64, now: f64) -> bool {
        let ticking = matches!(
            self.state.lifecycle,
            Lifecycle::Alive | Lifecycle::Dying { .. }
        );
        if self.state.disabled || !ticking {
            return false;
        }
        self.state.advance_clock(dt, now);
        self.behavior.on_tick(&self.state, dt);
        true
    }

    /// Run the draw hook. Returns whether it ran.
    pub fn draw(&self, canvas: &mut dyn Canvas) -> bool {
        let visible = matches!(
            self.state.lifecycle,
            Lifecycle::Alive | Lifecycle::Dying { .. }
        );
        if self.state.disabled || !visible {
            return false;
        }
        self.behavior.on_draw(&self.state, canvas);
        true
    }

    /// Mark as removed by the server. Die runs on the next lifecycle pass.
    pub fn doom(&mut self) {
        if matches!(self.state.lifecycle, Lifecycle::Pending | Lifecycle::Alive) {
            self.state.lifecycle = Lifecycle::Doomed;
        }
    }

    /// Run die dispatch and teardown bookkeeping for a removed entity.
    ///
    /// Returns true once the entity can be dropped.
    pub fn settle(&mut self, now: f64, lifecycle: &LifecycleConfig) -> bool {
        match self.state.lifecycle {
            Lifecycle::Doomed => {
                if self.behavior.on_die(&self.state) {
                    debug!("Entity {} ({}) vetoed removal", self.state.id, self.state.type_id());
                    self.state.lifecycle = Lifecycle::Dying { since_ms: now };
                    false
                } else {
                    self.state.lifecycle = Lifecycle::Dead;
                    true
                }
            }
            Lifecycle::Dying { since_ms } => {
                if self.behavior.teardown_finished(&self.state) {
                    self.state.lifecycle = Lifecycle::Dead;
                    true
                } else if now - since_ms >= lifecycle.die_grace_ms {
                    warn!(
                        "Entity {} ({}) still tearing down after {:.0}ms, removing",
                        self.state.id,
                        self.state.type_id(),
                        now - since_ms
                    );
                    self.state.lifecycle = Lifecycle::Dead;
                    true
                } else {
                    false
                }
            }
            Lifecycle::Dead => true,
            Lifecycle::Pending | Lifecycle::Alive => false,
        }
    }
}
