//! Chatter client engine.
//!
//! Turns the server's irregular stream of partial entity updates into a
//! smooth, consistent view:
//! - per-kind field schemas decide what interpolates and what applies at once
//! - every interpolating entity buffers timestamped snapshots
//! - a per-entity playback clock trails the newest data by about a frame
//! - the world routes messages and runs start/tick/draw/die each frame

// Module structure
pub mod canvas;   // Narrow drawing surface for entity kinds
pub mod clock;    // Adaptive playback cursor
pub mod config;   // Engine tunables
pub mod diff;     // Decoding and merging partial updates
pub mod entity;   // Entity state and behavior hooks
pub mod error;    // Engine error type
pub mod field;    // Field schemas, normalizers, blends, appliers
pub mod geometry; // Vector and angle helpers
pub mod kinds;    // Entity kinds of the chatter world
pub mod registry; // Wire type -> kind
pub mod snapshot; // Per-entity snapshot buffer
pub mod world;    // Message routing and frame dispatch

pub use canvas::{Canvas, DrawCommand, RecordingCanvas, TextAlign};
pub use clock::{ClockState, PlaybackClock};
pub use config::{EngineConfig, LifecycleConfig, PlaybackConfig};
pub use entity::{Behavior, Entity, EntityState, Lifecycle};
pub use error::EngineError;
pub use field::{FieldSpec, FieldValue, Fields, Schema};
pub use registry::{EntityKind, KindRegistry, SelectContext};
pub use snapshot::{Snapshot, SnapshotBuffer};
pub use world::{FrameSummary, UpdateSummary, World, WorldState};
